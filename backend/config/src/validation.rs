//! Config validation: checks with user-friendly error messages.

use crate::schema::{DocgateConfig, StorageBackend};
use thiserror::Error;

/// A config validation error with field path and message.
#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

/// All errors and warnings found in one pass.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }
}

/// Validate the config and return a report of all errors and warnings.
pub fn validate(config: &DocgateConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_server(config, &mut report);
    validate_storage(config, &mut report);
    validate_providers(config, &mut report);
    report
}

fn validate_server(config: &DocgateConfig, report: &mut ValidationReport) {
    if config.server.bind.trim().is_empty() {
        report.error("server.bind", "Bind address cannot be empty");
    } else if config.server.bind.parse::<std::net::IpAddr>().is_err() {
        report.error("server.bind", format!("'{}' is not an IP address", config.server.bind));
    }
    if config.server.port == 0 {
        report.error("server.port", "Port must be between 1 and 65535");
    }
    if config.server.stream_buffer == 0 {
        report.error("server.streamBuffer", "Stream buffer must hold at least one chunk");
    }
}

fn validate_storage(config: &DocgateConfig, report: &mut ValidationReport) {
    let storage = &config.storage;
    match storage.backend {
        StorageBackend::Fs if storage.root.trim().is_empty() => {
            report.error("storage.root", "Filesystem backend requires a root directory");
        }
        StorageBackend::Memory => {
            report.warn("storage.backend", "Memory backend loses all objects on restart");
        }
        _ => {}
    }
    if let Some(url) = &storage.public_base_url {
        check_url(report, "storage.publicBaseUrl", url);
    }
}

fn validate_providers(config: &DocgateConfig, report: &mut ValidationReport) {
    match &config.ocr {
        Some(ocr) => {
            check_url(report, "ocr.baseUrl", &ocr.base_url);
            if ocr.model.trim().is_empty() {
                report.error("ocr.model", "OCR model cannot be empty");
            }
            if !ocr.is_configured() {
                report.warn("ocr.apiKey", "No API key; /ocr will return 500");
            }
        }
        None => report.warn("ocr", "OCR provider not configured; /ocr will return 500"),
    }

    match &config.extract {
        Some(extract) => {
            check_url(report, "extract.baseUrl", &extract.base_url);
            if extract.poll_attempts == 0 {
                report.error("extract.pollAttempts", "Poll budget must be at least 1 attempt");
            }
            if extract.poll_interval_ms == 0 {
                report.warn("extract.pollIntervalMs", "Zero poll interval hammers the provider");
            }
            if !extract.is_configured() {
                report.warn(
                    "extract",
                    "clientId and clientSecret are both required; /adobe-extract will return 500",
                );
            }
        }
        None => report.warn(
            "extract",
            "Extract provider not configured; /adobe-extract will return 500",
        ),
    }

    match &config.search {
        Some(search) => {
            check_url(report, "search.baseUrl", &search.base_url);
            if !search.is_configured() {
                report.warn(
                    "search",
                    "apiToken, accountId and ragName are all required; /autorag will return 500",
                );
            }
        }
        None => report.warn("search", "Search provider not configured; /autorag will return 500"),
    }
}

fn check_url(report: &mut ValidationReport, path: &str, url: &str) {
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        report.error(path, format!("Expected an http(s) URL, got \"{url}\""));
    }
}
