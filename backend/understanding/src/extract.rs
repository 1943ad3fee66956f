//! PDF extract orchestration.
//!
//! Runs token → asset → upload → settle → job → poll → download → persist
//! against the Adobe client. The first failing step ends the run and is
//! reported together with every identifier obtained before it.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::info;

use docgate_config::schema::ExtractConfig;
use docgate_core::{
    extract_archive_key, ArtifactKind, DocgateError, ObjectStore, PollOutcome, PollPolicy, Sleeper,
    TokioSleeper, UpstreamFailure,
};
use docgate_logging::{EventLogger, PipelineEvent};

use crate::adobe::{AdobeExtractClient, JobState, JobStatusPayload};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractStep {
    Source,
    Token,
    Asset,
    Upload,
    Job,
    Poll,
    Download,
    Persist,
}

impl ExtractStep {
    pub fn as_str(self) -> &'static str {
        match self {
            ExtractStep::Source => "source",
            ExtractStep::Token => "token",
            ExtractStep::Asset => "asset",
            ExtractStep::Upload => "upload",
            ExtractStep::Job => "job",
            ExtractStep::Poll => "poll",
            ExtractStep::Download => "download",
            ExtractStep::Persist => "persist",
        }
    }
}

impl fmt::Display for ExtractStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("token request rejected: {body}")]
    Auth { status: u16, body: String },

    #[error("token response has no access_token: {body}")]
    TokenMalformed { status: u16, body: String },

    #[error("asset request rejected: {body}")]
    AssetRejected { status: u16, body: String },

    #[error("asset response has no uploadUri/assetID: {body}")]
    AssetMalformed { status: u16, body: String },

    #[error("asset upload rejected: {body}")]
    Upload { status: u16, body: String },

    #[error("job submission rejected: {body}")]
    JobRejected { status: u16, body: String },

    #[error("no job location returned")]
    JobLocationMissing { body: String },

    #[error("job status request failed: {body}")]
    Poll { status: Option<u16>, body: String },

    #[error("extract job ended with status '{}'", status_of(.payload))]
    JobFailed { payload: Value },

    #[error("extract job did not complete after {attempts} polls")]
    PollTimeout { attempts: u32, last: Option<Value> },

    #[error("no downloadUri in job status")]
    DownloadUriMissing { payload: Value },

    #[error("result download rejected: {body}")]
    Download { status: u16, body: String },

    #[error("{step} request failed: {message}")]
    Transport { step: ExtractStep, message: String },

    #[error("source object not found: {0}")]
    SourceMissing(String),

    #[error("source object unreadable: {0}")]
    SourceUnreadable(DocgateError),

    #[error("storing result failed: {0}")]
    Persist(DocgateError),
}

fn status_of(payload: &Value) -> &str {
    payload.get("status").and_then(Value::as_str).unwrap_or("")
}

impl ExtractError {
    pub fn step(&self) -> ExtractStep {
        match self {
            ExtractError::Auth { .. } | ExtractError::TokenMalformed { .. } => ExtractStep::Token,
            ExtractError::AssetRejected { .. } | ExtractError::AssetMalformed { .. } => {
                ExtractStep::Asset
            }
            ExtractError::Upload { .. } => ExtractStep::Upload,
            ExtractError::JobRejected { .. } | ExtractError::JobLocationMissing { .. } => {
                ExtractStep::Job
            }
            ExtractError::Poll { .. }
            | ExtractError::JobFailed { .. }
            | ExtractError::PollTimeout { .. } => ExtractStep::Poll,
            ExtractError::DownloadUriMissing { .. } | ExtractError::Download { .. } => {
                ExtractStep::Download
            }
            ExtractError::Transport { step, .. } => *step,
            ExtractError::SourceMissing(_) | ExtractError::SourceUnreadable(_) => {
                ExtractStep::Source
            }
            ExtractError::Persist(_) => ExtractStep::Persist,
        }
    }

    /// Upstream HTTP status, when the failure carried one.
    pub fn status(&self) -> Option<u16> {
        match self {
            ExtractError::Auth { status, .. }
            | ExtractError::TokenMalformed { status, .. }
            | ExtractError::AssetRejected { status, .. }
            | ExtractError::AssetMalformed { status, .. }
            | ExtractError::Upload { status, .. }
            | ExtractError::JobRejected { status, .. }
            | ExtractError::Download { status, .. } => Some(*status),
            ExtractError::Poll { status, .. } => *status,
            _ => None,
        }
    }

    /// Provider payload attached to the failure, if any.
    pub fn payload(&self) -> Option<&Value> {
        match self {
            ExtractError::JobFailed { payload } | ExtractError::DownloadUriMissing { payload } => {
                Some(payload)
            }
            ExtractError::PollTimeout { last, .. } => last.as_ref(),
            _ => None,
        }
    }

    /// Provider response body, verbatim.
    pub fn body(&self) -> Option<&str> {
        match self {
            ExtractError::Auth { body, .. }
            | ExtractError::TokenMalformed { body, .. }
            | ExtractError::AssetRejected { body, .. }
            | ExtractError::AssetMalformed { body, .. }
            | ExtractError::Upload { body, .. }
            | ExtractError::JobRejected { body, .. }
            | ExtractError::JobLocationMissing { body }
            | ExtractError::Poll { body, .. }
            | ExtractError::Download { body, .. } => Some(body),
            _ => None,
        }
    }

    /// Failures caused by the provider rather than local storage.
    pub fn is_upstream(&self) -> bool {
        !matches!(
            self,
            ExtractError::SourceMissing(_)
                | ExtractError::SourceUnreadable(_)
                | ExtractError::Persist(_)
        )
    }

    /// Place the failure in the service-wide error taxonomy.
    pub fn classify(&self) -> DocgateError {
        match self {
            ExtractError::SourceMissing(key) => DocgateError::NotFound(key.clone()),
            ExtractError::SourceUnreadable(DocgateError::BadRequest(msg)) => {
                DocgateError::BadRequest(msg.clone())
            }
            ExtractError::SourceUnreadable(e) | ExtractError::Persist(e) => {
                DocgateError::Storage(e.to_string())
            }
            ExtractError::PollTimeout { attempts, last } => DocgateError::Timeout {
                attempts: *attempts,
                last: last.clone(),
            },
            other => DocgateError::Upstream(UpstreamFailure::new(
                "adobe-extract",
                other.status(),
                other.body().map(str::to_string).unwrap_or_else(|| other.to_string()),
            )),
        }
    }
}

/// Identifiers gathered during a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionJob {
    #[serde(skip)]
    pub access_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upload_uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    pub poll_attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_uri: Option<String>,
}

#[derive(Debug)]
pub struct ExtractFailure {
    pub step: ExtractStep,
    pub error: ExtractError,
    pub job: ExtractionJob,
}

impl ExtractFailure {
    /// JSON body returned to the HTTP caller.
    pub fn report(&self) -> Value {
        let mut body = json!({
            "step": self.step,
            "error": self.error.to_string(),
            "job": self.job,
        });
        if let Some(status) = self.error.status() {
            body["status"] = json!(status);
        }
        if let Some(raw) = self.error.body() {
            body["body"] = json!(raw);
        }
        if let Some(payload) = self.error.payload() {
            body["payload"] = payload.clone();
        }
        body
    }
}

impl fmt::Display for ExtractFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "extract failed at {}: {}", self.step, self.error)
    }
}

impl std::error::Error for ExtractFailure {}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractOutcome {
    /// Key the result archive was stored under.
    pub key: String,
    pub size: usize,
    pub job: ExtractionJob,
}

pub struct ExtractOrchestrator {
    client: AdobeExtractClient,
    store: Arc<dyn ObjectStore>,
    sleeper: Arc<dyn Sleeper>,
    poll: PollPolicy,
    settle_delay: Duration,
}

impl ExtractOrchestrator {
    pub fn new(client: AdobeExtractClient, store: Arc<dyn ObjectStore>) -> Self {
        Self {
            client,
            store,
            sleeper: Arc::new(TokioSleeper),
            poll: PollPolicy::default(),
            settle_delay: Duration::from_secs(2),
        }
    }

    pub fn from_config(
        config: &ExtractConfig,
        http: Client,
        store: Arc<dyn ObjectStore>,
    ) -> Result<Self, DocgateError> {
        let client = AdobeExtractClient::from_config(config, http)?;
        Ok(Self::new(client, store)
            .with_poll_policy(PollPolicy::new(
                config.poll_attempts,
                Duration::from_millis(config.poll_interval_ms),
            ))
            .with_settle_delay(Duration::from_millis(config.settle_delay_ms)))
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn with_poll_policy(mut self, poll: PollPolicy) -> Self {
        self.poll = poll;
        self
    }

    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Extract `key` and store the archive as `<key>.adobe-extract.zip`.
    pub async fn run(&self, key: &str) -> Result<ExtractOutcome, ExtractFailure> {
        let mut job = ExtractionJob::default();
        match self.steps(key, &mut job).await {
            Ok((result_key, size)) => {
                info!(
                    source = %key,
                    result = %result_key,
                    size,
                    polls = job.poll_attempts,
                    "Extract complete"
                );
                Ok(ExtractOutcome {
                    key: result_key,
                    size,
                    job,
                })
            }
            Err(error) => {
                let step = error.step();
                EventLogger::log_event(
                    key,
                    PipelineEvent::StepFailed {
                        step: step.to_string(),
                        error: error.to_string(),
                    },
                );
                Err(ExtractFailure { step, error, job })
            }
        }
    }

    async fn steps(
        &self,
        key: &str,
        job: &mut ExtractionJob,
    ) -> Result<(String, usize), ExtractError> {
        let source = self
            .store
            .get(key)
            .await
            .map_err(ExtractError::SourceUnreadable)?
            .ok_or_else(|| ExtractError::SourceMissing(key.to_string()))?;

        let token = self.client.fetch_token().await?;
        job.access_token = Some(token.clone());
        completed(key, ExtractStep::Token, "access token obtained");

        let slot = self.client.create_asset(&token).await?;
        job.asset_id = Some(slot.asset_id.clone());
        job.upload_uri = Some(slot.upload_uri.clone());
        completed(key, ExtractStep::Asset, &slot.asset_id);

        self.client.upload_asset(&slot.upload_uri, source.data).await?;
        completed(key, ExtractStep::Upload, "asset uploaded");

        self.sleeper.sleep(self.settle_delay).await;

        let location = self.client.submit_job(&token, &slot.asset_id).await?;
        job.job_location = Some(location.clone());
        completed(key, ExtractStep::Job, &location);

        let outcome = self
            .poll
            .run(
                self.sleeper.as_ref(),
                |_| self.client.poll_job(&token, &location),
                |p: &JobStatusPayload| p.status != JobState::InProgress,
            )
            .await?;

        let payload = match outcome {
            PollOutcome::Settled { value, attempts } => {
                job.poll_attempts = attempts;
                job.status = Some(value.status.as_str().to_string());
                if value.status != JobState::Done {
                    return Err(ExtractError::JobFailed { payload: value.raw });
                }
                value
            }
            PollOutcome::Exhausted { last, attempts } => {
                job.poll_attempts = attempts;
                job.status = last.as_ref().map(|p| p.status.as_str().to_string());
                return Err(ExtractError::PollTimeout {
                    attempts,
                    last: last.map(|p| p.raw),
                });
            }
        };
        completed(key, ExtractStep::Poll, "job done");

        let download_uri = payload
            .download_uri
            .ok_or(ExtractError::DownloadUriMissing { payload: payload.raw })?;
        job.download_uri = Some(download_uri.clone());
        let archive = self.client.download_result(&download_uri).await?;

        let result_key = extract_archive_key(key);
        let size = archive.len();
        self.store
            .put(&result_key, archive, Some(ArtifactKind::ExtractArchive.content_type()))
            .await
            .map_err(ExtractError::Persist)?;
        EventLogger::log_event(
            key,
            PipelineEvent::ArtifactStored {
                key: result_key.clone(),
                content_type: ArtifactKind::ExtractArchive.content_type().into(),
                bytes: size,
            },
        );

        Ok((result_key, size))
    }
}

fn completed(source: &str, step: ExtractStep, detail: &str) {
    EventLogger::log_event(
        source,
        PipelineEvent::StepCompleted {
            step: step.to_string(),
            detail: detail.to_string(),
        },
    );
}
