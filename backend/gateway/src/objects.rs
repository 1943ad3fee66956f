//! Raw object upload and download.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header::CONTENT_TYPE, HeaderMap},
    response::{IntoResponse, Response},
};
use tracing::{info, instrument};

use docgate_core::{detect_content_type, DocgateError};

use crate::error::ApiError;
use crate::server::GatewayState;

/// Handler for `POST /upload/*key`. The request `Content-Type`, when given,
/// is stored with the object.
#[instrument(skip(state, headers, body), fields(size = body.len()))]
pub async fn upload(
    State(state): State<GatewayState>,
    Path(key): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<String, ApiError> {
    let content_type = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok());
    state.store.put(&key, body, content_type).await?;
    info!(key = %key, "Object uploaded");
    Ok(format!("File uploaded as {key}"))
}

/// Handler for `GET /download/*key`.
#[instrument(skip(state))]
pub async fn download(
    State(state): State<GatewayState>,
    Path(key): Path<String>,
) -> Result<Response, ApiError> {
    let object = state
        .store
        .get(&key)
        .await?
        .ok_or_else(|| DocgateError::NotFound(key.clone()))?;

    let content_type = object
        .content_type
        .unwrap_or_else(|| detect_content_type(&key).to_string());
    Ok(([(CONTENT_TYPE, content_type)], object.data).into_response())
}
