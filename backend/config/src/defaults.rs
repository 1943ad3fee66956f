//! Config defaults and post-load normalization.

use crate::schema::DocgateConfig;

pub const DEFAULT_BIND: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8787;
pub const DEFAULT_STREAM_BUFFER: usize = 32;
pub const DEFAULT_STORAGE_ROOT: &str = "./data";
pub const DEFAULT_LOG_LEVEL: &str = "info";

pub const DEFAULT_MISTRAL_BASE_URL: &str = "https://api.mistral.ai";
pub const DEFAULT_MISTRAL_OCR_MODEL: &str = "mistral-ocr-latest";

pub const DEFAULT_ADOBE_BASE_URL: &str = "https://pdf-services.adobe.io";
pub const DEFAULT_POLL_ATTEMPTS: u32 = 20;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2_000;
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 2_000;

pub const DEFAULT_CLOUDFLARE_BASE_URL: &str = "https://api.cloudflare.com/client/v4";

/// Normalize a freshly loaded config: trailing slashes are stripped from URL
/// prefixes so clients can join paths with `format!("{base}/...")`.
pub fn apply_all_defaults(mut config: DocgateConfig) -> DocgateConfig {
    if let Some(url) = config.storage.public_base_url.as_mut() {
        trim_trailing_slash(url);
    }
    if let Some(ocr) = config.ocr.as_mut() {
        trim_trailing_slash(&mut ocr.base_url);
    }
    if let Some(extract) = config.extract.as_mut() {
        trim_trailing_slash(&mut extract.base_url);
    }
    if let Some(search) = config.search.as_mut() {
        trim_trailing_slash(&mut search.base_url);
    }
    if config.logging.level.trim().is_empty() {
        config.logging.level = DEFAULT_LOG_LEVEL.to_string();
    }
    config
}

fn trim_trailing_slash(url: &mut String) {
    while url.ends_with('/') {
        url.pop();
    }
}
