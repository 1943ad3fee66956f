//! Log Redaction Layer
//!
//! Scrubs bearer tokens, API keys, and OAuth secrets from strings (typically
//! upstream error bodies) prior to logging.

use regex::Regex;
use std::sync::LazyLock;

static BEARER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Bearer\s+[A-Za-z0-9\-\._~+/]+=*").unwrap());
static SECRET_FIELD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)("?(?:access_token|client_secret|api_key|apiKey|token)"?\s*[:=]\s*"?)[^"&,\s}]+"#)
        .unwrap()
});

/// Longest upstream body excerpt written to a log line.
pub const MAX_LOGGED_BODY: usize = 512;

/// Redacts sensitive patterns in a string.
pub fn redact_sensitive_data(input: &str) -> String {
    let redacted = BEARER_RE.replace_all(input, "Bearer [REDACTED_TOKEN]");
    SECRET_FIELD_RE
        .replace_all(&redacted, "${1}[REDACTED]")
        .into_owned()
}

/// Redact and truncate an upstream body for logging.
pub fn log_excerpt(body: &str) -> String {
    let redacted = redact_sensitive_data(body);
    if redacted.chars().count() <= MAX_LOGGED_BODY {
        return redacted;
    }
    let cut: String = redacted.chars().take(MAX_LOGGED_BODY).collect();
    format!("{cut}...")
}
