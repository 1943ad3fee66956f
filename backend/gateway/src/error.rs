//! HTTP error mapping for gateway handlers.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use tracing::{error, warn};

use docgate_core::DocgateError;
use docgate_logging::log_excerpt;
use docgate_understanding::{ExtractError, ExtractFailure};

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    /// A provider section is missing from the config.
    NotConfigured(&'static str),
    /// Provider failure surfaced as 502.
    Upstream(Value),
    /// Provider failure forwarded with the provider's own status.
    Forwarded { status: StatusCode, error: Value },
    Extract(ExtractFailure),
    Internal(String),
}

impl From<DocgateError> for ApiError {
    fn from(e: DocgateError) -> Self {
        match e {
            DocgateError::NotFound(key) => ApiError::NotFound(format!("File not found: {key}")),
            DocgateError::BadRequest(msg) => ApiError::BadRequest(msg),
            DocgateError::Upstream(failure) => ApiError::Upstream(json!({
                "error": failure.to_string(),
                "service": failure.service,
                "status": failure.status,
            })),
            DocgateError::Decode(msg) => ApiError::Upstream(json!({ "error": msg })),
            DocgateError::Timeout { attempts, last } => ApiError::Upstream(json!({
                "error": format!("timed out after {attempts} attempts"),
                "last": last,
            })),
            DocgateError::Storage(msg) | DocgateError::Config(msg) => ApiError::Internal(msg),
            DocgateError::Other(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<ExtractFailure> for ApiError {
    fn from(failure: ExtractFailure) -> Self {
        ApiError::Extract(failure)
    }
}

/// Forward a provider failure with its own status code and `{error}` body.
/// Transport failures and non-error statuses fall back to 502.
pub fn forward_upstream(e: DocgateError) -> ApiError {
    match e {
        DocgateError::Upstream(failure) => {
            let status = failure
                .status
                .and_then(|s| StatusCode::from_u16(s).ok())
                .filter(|s| s.is_client_error() || s.is_server_error());
            let error = serde_json::from_str::<Value>(&failure.body)
                .unwrap_or_else(|_| Value::String(failure.body.clone()));
            match status {
                Some(status) => ApiError::Forwarded { status, error },
                None => ApiError::Upstream(json!({ "error": failure.to_string() })),
            }
        }
        other => other.into(),
    }
}

fn taxonomy_status(error: &DocgateError) -> StatusCode {
    match error {
        DocgateError::NotFound(_) => StatusCode::NOT_FOUND,
        DocgateError::BadRequest(_) => StatusCode::BAD_REQUEST,
        DocgateError::Upstream(_) | DocgateError::Decode(_) | DocgateError::Timeout { .. } => {
            StatusCode::BAD_GATEWAY
        }
        DocgateError::Storage(_) | DocgateError::Config(_) | DocgateError::Other(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn extract_status(error: &ExtractError) -> StatusCode {
    taxonomy_status(&error.classify())
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg).into_response(),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
            ApiError::NotConfigured(section) => {
                error!(section, "Provider not configured");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("{section} provider is not configured"),
                )
                    .into_response()
            }
            ApiError::Upstream(body) => {
                warn!(body = %log_excerpt(&body.to_string()), "Upstream failure");
                (StatusCode::BAD_GATEWAY, Json(body)).into_response()
            }
            ApiError::Forwarded { status, error } => {
                warn!(status = status.as_u16(), "Forwarding upstream error");
                (status, Json(json!({ "error": error }))).into_response()
            }
            ApiError::Extract(failure) => {
                let status = extract_status(&failure.error);
                warn!(
                    step = %failure.step,
                    error = %log_excerpt(&failure.error.to_string()),
                    "Extract failed"
                );
                (status, Json(failure.report())).into_response()
            }
            ApiError::Internal(msg) => {
                error!(error = %msg, "Internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": msg }))).into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docgate_core::UpstreamFailure;

    #[test]
    fn taxonomy_maps_to_status_codes() {
        let cases = [
            (DocgateError::NotFound("k".into()), StatusCode::NOT_FOUND),
            (DocgateError::BadRequest("q".into()), StatusCode::BAD_REQUEST),
            (
                UpstreamFailure::new("mistral-ocr", Some(401), "no").into(),
                StatusCode::BAD_GATEWAY,
            ),
            (DocgateError::Decode("bad".into()), StatusCode::BAD_GATEWAY),
            (DocgateError::Timeout { attempts: 20, last: None }, StatusCode::BAD_GATEWAY),
            (DocgateError::Storage("disk".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (DocgateError::Config("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, expected) in cases {
            let resp = ApiError::from(err).into_response();
            assert_eq!(resp.status(), expected);
        }
    }

    #[test]
    fn forwarded_keeps_provider_status() {
        let err = forward_upstream(UpstreamFailure::new("autorag", Some(403), "\"denied\"").into());
        match err {
            ApiError::Forwarded { status, error } => {
                assert_eq!(status, StatusCode::FORBIDDEN);
                assert_eq!(error, Value::String("denied".into()));
            }
            other => panic!("unexpected {other:?}"),
        }

        let refused = UpstreamFailure::transport("autorag", "connection refused");
        let err = forward_upstream(refused.into());
        assert_eq!(err.into_response().status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn extract_failures_follow_the_taxonomy() {
        let cases = [
            (ExtractError::SourceMissing("doc.pdf".into()), StatusCode::NOT_FOUND),
            (
                ExtractError::SourceUnreadable(DocgateError::BadRequest("a//b.pdf".into())),
                StatusCode::BAD_REQUEST,
            ),
            (
                ExtractError::SourceUnreadable(DocgateError::Storage("disk".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                ExtractError::Persist(DocgateError::Storage("full".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                ExtractError::PollTimeout { attempts: 20, last: None },
                StatusCode::BAD_GATEWAY,
            ),
            (
                ExtractError::Auth { status: 401, body: "invalid_client".into() },
                StatusCode::BAD_GATEWAY,
            ),
        ];
        for (error, expected) in cases {
            assert_eq!(extract_status(&error), expected, "{error}");
        }
    }
}
