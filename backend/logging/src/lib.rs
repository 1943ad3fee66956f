//! Telemetry and structured logging components for docgate.
//!
//! Handles log redaction, console/JSON output, file rotation, and pipeline
//! event logging.

pub mod event_logger;
pub mod logger;
pub mod redact;

pub use event_logger::{EventLogEntry, EventLogger, PipelineEvent};
pub use logger::init_logger;
pub use redact::{log_excerpt, redact_sensitive_data};
