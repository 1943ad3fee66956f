//! RAG search proxy with an optional streamed answer.
//!
//! Streaming runs as a producer task feeding a bounded channel that backs the
//! SSE response. When the client goes away the receiver is dropped, the next
//! send fails, and the producer stops reading from the provider.

use std::convert::Infallible;

use axum::{
    body::Bytes,
    extract::State,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    Json,
};
use futures::stream::{BoxStream, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, instrument, warn};

use docgate_core::DocgateError;

use crate::error::{forward_upstream, ApiError};
use crate::server::GatewayState;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SearchMode {
    /// Retrieval results only.
    #[default]
    Search,
    /// Retrieval plus a generated answer.
    AiSearch,
}

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub mode: SearchMode,
    #[serde(default)]
    pub stream: bool,
}

type EventTx = mpsc::Sender<Result<Event, Infallible>>;

/// Handler for `POST /autorag`.
#[instrument(skip(state, body))]
pub async fn query(State(state): State<GatewayState>, body: Bytes) -> Result<Response, ApiError> {
    let request: QueryRequest =
        serde_json::from_slice(&body).map_err(|_| ApiError::BadRequest("Missing query".into()))?;
    let query = request
        .query
        .filter(|q| !q.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("Missing query".into()))?;
    let client = state.search.clone().ok_or(ApiError::NotConfigured("search"))?;

    if request.stream {
        let upstream = client.ai_search_stream(&query).await.map_err(forward_upstream)?;
        let (tx, rx) = mpsc::channel(state.stream_buffer);
        tokio::spawn(pump(upstream, tx));
        debug!(buffer = state.stream_buffer, "Streaming answer");
        return Ok(Sse::new(ReceiverStream::new(rx))
            .keep_alive(KeepAlive::default())
            .into_response());
    }

    let value = match request.mode {
        SearchMode::Search => client.search(&query).await,
        SearchMode::AiSearch => client.ai_search(&query).await,
    }
    .map_err(forward_upstream)?;
    Ok(Json(value).into_response())
}

/// Copy provider chunks into the SSE channel, then send `[DONE]`.
async fn pump(mut upstream: BoxStream<'static, Result<String, DocgateError>>, tx: EventTx) {
    while let Some(item) = upstream.next().await {
        let event = match item {
            // SSE field values cannot carry carriage returns.
            Ok(text) => Event::default().data(text.replace('\r', "")),
            Err(e) => {
                warn!(error = %e, "Answer stream failed");
                let _ = tx
                    .send(Ok(Event::default().event("error").data(e.to_string().replace('\r', ""))))
                    .await;
                return;
            }
        };
        if tx.send(Ok(event)).await.is_err() {
            debug!("Client disconnected; stopping answer stream");
            return;
        }
    }
    let _ = tx.send(Ok(Event::default().data("[DONE]"))).await;
}
