use serde::Serialize;
use thiserror::Error;

/// A failed call to an external provider, with enough context to diagnose it
/// without retrying.
#[derive(Debug, Clone, Serialize)]
pub struct UpstreamFailure {
    /// Provider name, e.g. `mistral-ocr` or `autorag`.
    pub service: String,
    /// HTTP status returned by the provider, when a response was received.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    /// Raw response body, or the transport error text.
    pub body: String,
}

impl UpstreamFailure {
    pub fn new(service: impl Into<String>, status: Option<u16>, body: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            status,
            body: body.into(),
        }
    }

    /// A transport-level failure where no HTTP response was received.
    pub fn transport(service: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::new(service, None, err.to_string())
    }
}

impl std::fmt::Display for UpstreamFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.status {
            Some(status) => write!(f, "{} returned {}: {}", self.service, status, self.body),
            None => write!(f, "{} unreachable: {}", self.service, self.body),
        }
    }
}

/// Top-level error type for the docgate service.
#[derive(Debug, Error)]
pub enum DocgateError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("upstream error: {0}")]
    Upstream(UpstreamFailure),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("timed out after {attempts} attempts")]
    Timeout {
        attempts: u32,
        last: Option<serde_json::Value>,
    },

    #[error("storage error: {0}")]
    Storage(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<UpstreamFailure> for DocgateError {
    fn from(failure: UpstreamFailure) -> Self {
        DocgateError::Upstream(failure)
    }
}

impl From<std::io::Error> for DocgateError {
    fn from(e: std::io::Error) -> Self {
        DocgateError::Storage(e.to_string())
    }
}

pub type Result<T, E = DocgateError> = std::result::Result<T, E>;
