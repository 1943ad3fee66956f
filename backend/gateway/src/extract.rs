//! PDF structure extraction route.

use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::{json, Value};
use tracing::instrument;

use crate::error::ApiError;
use crate::server::GatewayState;

/// Handler for `POST /adobe-extract/*key`.
#[instrument(skip(state))]
pub async fn adobe_extract(
    State(state): State<GatewayState>,
    Path(key): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let extractor = state.extractor.clone().ok_or(ApiError::NotConfigured("extract"))?;
    let outcome = extractor.run(&key).await?;
    Ok(Json(json!({
        "message": "Extract complete",
        "key": outcome.key,
        "size": outcome.size,
    })))
}
