//! docgate gateway HTTP API server.
//!
//! Object upload/download, OCR with artifact fan-out, PDF extraction, and the
//! RAG search proxy, plus the browser chat widget.

pub mod autorag;
pub mod error;
pub mod extract;
pub mod health_api;
pub mod home;
pub mod objects;
pub mod ocr;
pub mod server;

pub use error::ApiError;
pub use server::{build_router, start_server, GatewayState};
