//! OCR routes: run the OCR provider over a document and fan the result out
//! into per-page artifacts.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use tracing::{debug, instrument};
use uuid::Uuid;

use docgate_core::DocgateError;
use docgate_understanding::{store_ocr_artifacts, MistralOcrClient, OcrDocument, OcrResponse};

use crate::error::ApiError;
use crate::server::GatewayState;

#[derive(Debug, Deserialize)]
pub struct OcrParams {
    /// Key to store the posted document under.
    pub name: Option<String>,
}

fn ocr_client(state: &GatewayState) -> Result<Arc<MistralOcrClient>, ApiError> {
    state.ocr.clone().ok_or(ApiError::NotConfigured("ocr"))
}

/// Handler for `POST /ocr/*key`.
#[instrument(skip(state))]
pub async fn ocr_stored(
    State(state): State<GatewayState>,
    Path(key): Path<String>,
) -> Result<Json<OcrResponse>, ApiError> {
    let client = ocr_client(&state)?;
    let object = state
        .store
        .get(&key)
        .await?
        .ok_or_else(|| DocgateError::NotFound(key.clone()))?;
    process(&state, &client, &key, object.data).await
}

/// Handler for `POST /ocr` with the PDF as the request body. The body is
/// stored first so derived artifacts sit next to their source.
#[instrument(skip(state, body), fields(size = body.len()))]
pub async fn ocr_body(
    State(state): State<GatewayState>,
    Query(params): Query<OcrParams>,
    body: Bytes,
) -> Result<Json<OcrResponse>, ApiError> {
    let client = ocr_client(&state)?;
    if body.is_empty() {
        return Err(ApiError::BadRequest("Missing document body".into()));
    }
    let key = params
        .name
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| format!("upload-{}.pdf", Uuid::new_v4()));

    state.store.put(&key, body.clone(), Some("application/pdf")).await?;
    process(&state, &client, &key, body).await
}

async fn process(
    state: &GatewayState,
    client: &MistralOcrClient,
    key: &str,
    data: Bytes,
) -> Result<Json<OcrResponse>, ApiError> {
    let document = match &state.public_base_url {
        Some(base) => OcrDocument::public(base, key)?,
        None => OcrDocument::inline(data.to_vec(), key),
    };

    let response = client.ocr(&document).await?;
    let report = store_ocr_artifacts(state.store.as_ref(), key, &response, &state.fanout).await;
    debug!(stored = report.stored_keys.len(), skipped = report.images_skipped, "OCR fan-out finished");

    Ok(Json(response))
}
