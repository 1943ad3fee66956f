//! Pipeline Event Logger
//!
//! Structured events (artifact writes, orchestration steps) emitted on the
//! `docgate_events` tracing target, so they can be filtered into their own
//! stream with `RUST_LOG=docgate_events=info`.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::redact::log_excerpt;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    ArtifactStored {
        key: String,
        content_type: String,
        bytes: usize,
    },
    ArtifactSkipped {
        key: String,
        reason: String,
    },
    StepCompleted {
        step: String,
        detail: String,
    },
    StepFailed {
        step: String,
        error: String,
    },
}

impl PipelineEvent {
    fn is_failure(&self) -> bool {
        matches!(
            self,
            PipelineEvent::ArtifactSkipped { .. } | PipelineEvent::StepFailed { .. }
        )
    }
}

#[derive(Debug, Serialize)]
pub struct EventLogEntry {
    /// Source object key the event belongs to.
    pub source: String,
    pub timestamp: DateTime<Utc>,
    pub event: PipelineEvent,
}

pub struct EventLogger;

impl EventLogger {
    /// Emit one pipeline event. Free-text fields are redacted and truncated.
    pub fn log_event(source: &str, mut event: PipelineEvent) {
        match &mut event {
            PipelineEvent::ArtifactSkipped { reason: text, .. }
            | PipelineEvent::StepFailed { error: text, .. }
            | PipelineEvent::StepCompleted { detail: text, .. } => {
                *text = log_excerpt(text);
            }
            PipelineEvent::ArtifactStored { .. } => {}
        }

        let failed = event.is_failure();
        let entry = EventLogEntry {
            source: source.into(),
            timestamp: Utc::now(),
            event,
        };
        let json = serde_json::to_string(&entry).unwrap_or_default();

        if failed {
            warn!(target: "docgate_events", event = %json, "Pipeline event");
        } else {
            info!(target: "docgate_events", event = %json, "Pipeline event");
        }
    }
}
