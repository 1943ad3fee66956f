//! docgate runtime configuration schema.
//!
//! Typed for serde YAML/JSON deserialization. Every section has defaults, so
//! an empty file (or no file) yields a runnable config; provider sections
//! stay `None` until credentials are supplied.

use serde::{Deserialize, Serialize};

use crate::defaults::*;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocgateConfig {
    /// HTTP listener settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Object store backend
    #[serde(default)]
    pub storage: StorageConfig,

    /// Mistral OCR provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ocr: Option<OcrConfig>,

    /// Adobe PDF Services extract provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extract: Option<ExtractConfig>,

    /// Cloudflare AutoRAG search/chat provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<SearchConfig>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
    /// Chunks buffered between the upstream reader and a streaming client.
    pub stream_buffer: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            port: DEFAULT_PORT,
            stream_buffer: DEFAULT_STREAM_BUFFER,
        }
    }
}

// ---------------------------------------------------------------------------
// Storage
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    #[default]
    Fs,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Root directory for the `fs` backend.
    pub root: String,
    /// Public URL prefix under which stored objects are reachable by providers.
    /// When unset, documents are sent to the OCR provider inline.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_base_url: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            root: DEFAULT_STORAGE_ROOT.to_string(),
            public_base_url: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Providers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OcrConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub include_image_base64: bool,
    /// Also store each OCR page object as `<key>.page-<n>.json`.
    pub store_page_json: bool,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_MISTRAL_BASE_URL.to_string(),
            model: DEFAULT_MISTRAL_OCR_MODEL.to_string(),
            include_image_base64: true,
            store_page_json: false,
        }
    }
}

impl OcrConfig {
    pub fn is_configured(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExtractConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    pub base_url: String,
    pub poll_attempts: u32,
    pub poll_interval_ms: u64,
    /// Wait between uploading the asset and submitting the job.
    pub settle_delay_ms: u64,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            base_url: DEFAULT_ADOBE_BASE_URL.to_string(),
            poll_attempts: DEFAULT_POLL_ATTEMPTS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            settle_delay_ms: DEFAULT_SETTLE_DELAY_MS,
        }
    }
}

impl ExtractConfig {
    pub fn is_configured(&self) -> bool {
        let set = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.is_empty());
        set(&self.client_id) && set(&self.client_secret)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SearchConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rag_name: Option<String>,
    pub base_url: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_token: None,
            account_id: None,
            rag_name: None,
            base_url: DEFAULT_CLOUDFLARE_BASE_URL.to_string(),
        }
    }
}

impl SearchConfig {
    pub fn is_configured(&self) -> bool {
        let set = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.is_empty());
        set(&self.api_token) && set(&self.account_id) && set(&self.rag_name)
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LoggingConfig {
    /// `EnvFilter` directive; `RUST_LOG` takes precedence at runtime.
    pub level: String,
    /// Emit console logs as JSON instead of human-readable lines.
    pub json: bool,
    /// Directory for daily-rolling NDJSON log files. Disabled when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            json: false,
            dir: None,
        }
    }
}
