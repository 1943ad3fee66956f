//! Adobe PDF Services REST client, one method per step of an extract job.
//!
//! Every method maps its own failures to the matching [`ExtractError`]
//! variant so the orchestrator can report which step broke.

use bytes::Bytes;
use reqwest::header::LOCATION;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use docgate_config::schema::ExtractConfig;
use docgate_core::DocgateError;

use crate::extract::{ExtractError, ExtractStep};

/// Pre-signed upload slot returned by `POST /assets`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AssetSlot {
    #[serde(rename = "uploadUri")]
    pub upload_uri: String,
    #[serde(rename = "assetID")]
    pub asset_id: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Extraction options sent with every job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractOptions {
    pub elements_to_extract: Vec<String>,
    pub include_styling: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            elements_to_extract: vec!["text".into(), "tables".into(), "images".into()],
            include_styling: true,
        }
    }
}

/// Job state reported by the status endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    InProgress,
    Done,
    Failed,
    Other(String),
}

impl JobState {
    pub fn parse(s: &str) -> Self {
        match s {
            "in progress" => JobState::InProgress,
            "done" => JobState::Done,
            "failed" => JobState::Failed,
            other => JobState::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            JobState::InProgress => "in progress",
            JobState::Done => "done",
            JobState::Failed => "failed",
            JobState::Other(s) => s,
        }
    }
}

/// One status poll. `raw` keeps the whole payload for error reports.
#[derive(Debug, Clone, PartialEq)]
pub struct JobStatusPayload {
    pub status: JobState,
    pub download_uri: Option<String>,
    pub raw: Value,
}

impl JobStatusPayload {
    pub fn from_value(raw: Value) -> Self {
        let status = JobState::parse(raw.get("status").and_then(Value::as_str).unwrap_or_default());
        let download_uri = raw
            .get("downloadUri")
            .or_else(|| raw.get("resource").and_then(|r| r.get("downloadUri")))
            .and_then(Value::as_str)
            .map(str::to_string);
        Self {
            status,
            download_uri,
            raw,
        }
    }
}

pub struct AdobeExtractClient {
    http: Client,
    base_url: String,
    client_id: String,
    client_secret: String,
    options: ExtractOptions,
}

fn transport(step: ExtractStep, e: reqwest::Error) -> ExtractError {
    ExtractError::Transport {
        step,
        message: e.to_string(),
    }
}

async fn read_body(step: ExtractStep, resp: Response) -> Result<(u16, String), ExtractError> {
    let status = resp.status().as_u16();
    let body = resp.text().await.map_err(|e| transport(step, e))?;
    Ok((status, body))
}

impl AdobeExtractClient {
    pub fn from_config(config: &ExtractConfig, http: Client) -> Result<Self, DocgateError> {
        let required = |value: &Option<String>, name: &str| {
            value
                .clone()
                .filter(|v| !v.is_empty())
                .ok_or_else(|| DocgateError::Config(format!("extract.{name} is not set")))
        };
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client_id: required(&config.client_id, "clientId")?,
            client_secret: required(&config.client_secret, "clientSecret")?,
            options: ExtractOptions::default(),
        })
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Exchange client credentials for an access token.
    pub async fn fetch_token(&self) -> Result<String, ExtractError> {
        let resp = self
            .http
            .post(format!("{}/token", self.base_url))
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
            ])
            .send()
            .await
            .map_err(|e| transport(ExtractStep::Token, e))?;

        let (status, body) = read_body(ExtractStep::Token, resp).await?;
        if !(200..300).contains(&status) {
            return Err(ExtractError::Auth { status, body });
        }
        let token: TokenResponse = match serde_json::from_str(&body) {
            Ok(token) => token,
            Err(_) => return Err(ExtractError::TokenMalformed { status, body }),
        };
        debug!("Adobe access token obtained");
        Ok(token.access_token)
    }

    /// Reserve an upload slot for a PDF.
    pub async fn create_asset(&self, token: &str) -> Result<AssetSlot, ExtractError> {
        let resp = self
            .http
            .post(format!("{}/assets", self.base_url))
            .header("X-API-Key", &self.client_id)
            .bearer_auth(token)
            .json(&json!({ "mediaType": "application/pdf" }))
            .send()
            .await
            .map_err(|e| transport(ExtractStep::Asset, e))?;

        let (status, body) = read_body(ExtractStep::Asset, resp).await?;
        if !(200..300).contains(&status) {
            return Err(ExtractError::AssetRejected { status, body });
        }
        serde_json::from_str(&body).map_err(|_| ExtractError::AssetMalformed { status, body })
    }

    /// PUT the document bytes to the pre-signed upload URI.
    pub async fn upload_asset(&self, upload_uri: &str, data: Bytes) -> Result<(), ExtractError> {
        let resp = self
            .http
            .put(upload_uri)
            .header("Content-Type", "application/pdf")
            .body(data)
            .send()
            .await
            .map_err(|e| transport(ExtractStep::Upload, e))?;

        let (status, body) = read_body(ExtractStep::Upload, resp).await?;
        if !(200..300).contains(&status) {
            return Err(ExtractError::Upload { status, body });
        }
        Ok(())
    }

    /// Submit the extract job. Returns the status URL from `Location`.
    pub async fn submit_job(&self, token: &str, asset_id: &str) -> Result<String, ExtractError> {
        let resp = self
            .http
            .post(format!("{}/operation/extractpdf/jobs", self.base_url))
            .header("X-API-Key", &self.client_id)
            .bearer_auth(token)
            .json(&json!({ "assetID": asset_id, "options": self.options }))
            .send()
            .await
            .map_err(|e| transport(ExtractStep::Job, e))?;

        let location = resp
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let (status, body) = read_body(ExtractStep::Job, resp).await?;
        if !(200..300).contains(&status) {
            return Err(ExtractError::JobRejected { status, body });
        }
        location.ok_or(ExtractError::JobLocationMissing { body })
    }

    /// Fetch the current job status once.
    pub async fn poll_job(&self, token: &str, location: &str) -> Result<JobStatusPayload, ExtractError> {
        let resp = self
            .http
            .get(location)
            .header("X-API-Key", &self.client_id)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| transport(ExtractStep::Poll, e))?;

        let (status, body) = read_body(ExtractStep::Poll, resp).await?;
        if !(200..300).contains(&status) {
            return Err(ExtractError::Poll { status: Some(status), body });
        }
        let raw: Value = serde_json::from_str(&body)
            .map_err(|_| ExtractError::Poll { status: Some(status), body })?;
        Ok(JobStatusPayload::from_value(raw))
    }

    /// Download the finished result archive.
    pub async fn download_result(&self, download_uri: &str) -> Result<Bytes, ExtractError> {
        let resp = self
            .http
            .get(download_uri)
            .send()
            .await
            .map_err(|e| transport(ExtractStep::Download, e))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ExtractError::Download {
                status: status.as_u16(),
                body,
            });
        }
        resp.bytes().await.map_err(|e| transport(ExtractStep::Download, e))
    }
}
