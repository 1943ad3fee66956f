//! `docgate-config`: runtime configuration management.
//!
//! Provides:
//! - Typed config schema (server, storage, providers, logging)
//! - YAML loading with a defaults-only fallback
//! - `${ENV_VAR}` substitution and well-known env overrides
//! - Config redaction for safe logging/display
//! - Validation with errors and warnings

pub mod defaults;
pub mod env;
pub mod io;
pub mod redact;
pub mod schema;
pub mod validation;

// Re-export most-used types at crate root.
pub use schema::DocgateConfig;
pub use io::{config_dir, config_file_path, load_config};
pub use env::{
    apply_env_overrides, apply_env_overrides_with, collect_referenced_vars, resolve_env_vars,
    resolve_env_vars_with, MissingEnvVarError,
};
pub use redact::{collect_redacted_paths, redact};
pub use defaults::apply_all_defaults;
pub use validation::{validate, ConfigValidationError, ValidationReport};

use anyhow::{Context, Result};
use serde_json::Value;
use std::path::Path;

/// Load a config file, substitute env references, apply env overrides and
/// defaults, then validate.
///
/// Validation problems are returned rather than logged, since logging is
/// usually initialised from the config this returns.
pub async fn load_and_prepare(path: &Path) -> Result<(DocgateConfig, ValidationReport)> {
    let raw_config = load_config(path).await?;

    let value: Value = serde_json::to_value(&raw_config)
        .context("Failed to serialize config for processing")?;
    let value = resolve_env_vars(&value).context("Failed to resolve env vars in config")?;

    let config: DocgateConfig =
        serde_json::from_value(value).context("Failed to deserialize config after processing")?;
    let config = apply_all_defaults(apply_env_overrides(config));

    let report = validate(&config);
    Ok((config, report))
}
