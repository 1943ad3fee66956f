//! Cloudflare AutoRAG client: retrieval search, generated answers, and a
//! streamed answer variant.

use std::collections::VecDeque;

use bytes::Bytes;
use futures::stream::{self, BoxStream, StreamExt};
use reqwest::{Client, Response};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use docgate_config::schema::SearchConfig;
use docgate_core::{DocgateError, Result, UpstreamFailure};
use docgate_logging::log_excerpt;

use crate::sse::{extract_text, SseDecoder, SseFrame};

const SERVICE: &str = "autorag";

#[derive(Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
}

pub struct AutoRagClient {
    http: Client,
    base_url: String,
    account_id: String,
    rag_name: String,
    api_token: String,
}

impl AutoRagClient {
    pub fn from_config(config: &SearchConfig, http: Client) -> Result<Self> {
        let required = |value: &Option<String>, name: &str| {
            value
                .clone()
                .filter(|v| !v.is_empty())
                .ok_or_else(|| DocgateError::Config(format!("search.{name} is not set")))
        };
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            account_id: required(&config.account_id, "accountId")?,
            rag_name: required(&config.rag_name, "ragName")?,
            api_token: required(&config.api_token, "apiToken")?,
        })
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self, action: &str) -> String {
        format!(
            "{}/accounts/{}/autorag/rags/{}/{}",
            self.base_url, self.account_id, self.rag_name, action
        )
    }

    async fn send(&self, action: &str, query: &str, stream: bool) -> Result<Response> {
        debug!(action, stream, "Sending AutoRAG request");
        let resp = self
            .http
            .post(self.endpoint(action))
            .bearer_auth(&self.api_token)
            .json(&SearchRequest { query, stream })
            .send()
            .await
            .map_err(|e| UpstreamFailure::transport(SERVICE, e))?;

        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let text = resp.text().await.unwrap_or_default();
        warn!(action, status = status.as_u16(), body = %log_excerpt(&text), "AutoRAG request rejected");
        Err(UpstreamFailure::new(SERVICE, Some(status.as_u16()), error_body(&text)).into())
    }

    async fn json(&self, action: &str, query: &str) -> Result<Value> {
        let resp = self.send(action, query, false).await?;
        let status = resp.status().as_u16();
        let text = resp
            .text()
            .await
            .map_err(|e| UpstreamFailure::transport(SERVICE, e))?;
        serde_json::from_str(&text).map_err(|e| {
            UpstreamFailure::new(SERVICE, Some(status), format!("unparsable response ({e}): {}", log_excerpt(&text))).into()
        })
    }

    /// Retrieval only: matching chunks with scores.
    pub async fn search(&self, query: &str) -> Result<Value> {
        self.json("search", query).await
    }

    /// Retrieval plus a generated answer.
    pub async fn ai_search(&self, query: &str) -> Result<Value> {
        self.json("ai-search", query).await
    }

    /// Generated answer as a stream of text chunks. The stream ends at the
    /// provider's `[DONE]` marker or when the body closes.
    pub async fn ai_search_stream(&self, query: &str) -> Result<BoxStream<'static, Result<String>>> {
        let resp = self.send("ai-search", query, true).await?;
        let state = StreamState {
            body: resp.bytes_stream().boxed(),
            decoder: SseDecoder::new(),
            pending: VecDeque::new(),
            finished: false,
        };
        Ok(stream::unfold(state, next_chunk).boxed())
    }
}

/// The provider's `error` field when the body is JSON that has one, else the
/// whole body.
fn error_body(text: &str) -> String {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => match map.get("error") {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => text.to_string(),
        },
        _ => text.to_string(),
    }
}

struct StreamState {
    body: BoxStream<'static, reqwest::Result<Bytes>>,
    decoder: SseDecoder,
    pending: VecDeque<String>,
    finished: bool,
}

impl StreamState {
    /// Queue text from decoded frames. Returns true once `[DONE]` is seen.
    fn absorb(&mut self, frames: Vec<SseFrame>) -> bool {
        for frame in frames {
            match frame {
                SseFrame::Data(payload) => {
                    if let Some(text) = extract_text(&payload) {
                        self.pending.push_back(text);
                    }
                }
                SseFrame::Done => return true,
            }
        }
        false
    }
}

async fn next_chunk(mut st: StreamState) -> Option<(Result<String>, StreamState)> {
    loop {
        if let Some(text) = st.pending.pop_front() {
            return Some((Ok(text), st));
        }
        if st.finished {
            return None;
        }
        match st.body.next().await {
            Some(Ok(chunk)) => {
                let frames = st.decoder.push(&chunk);
                st.finished = st.absorb(frames);
            }
            Some(Err(e)) => {
                st.finished = true;
                return Some((Err(UpstreamFailure::transport(SERVICE, e).into()), st));
            }
            None => {
                let tail = st.decoder.finish().into_iter().collect();
                st.absorb(tail);
                st.finished = true;
            }
        }
    }
}
