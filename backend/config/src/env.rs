//! Environment handling for config values.
//!
//! Two mechanisms:
//! - `${VAR_NAME}` references inside any string value are substituted at load
//!   time (`$${VAR}` is an escape producing a literal `${VAR}`). Only
//!   uppercase `[A-Z_][A-Z0-9_]*` names are recognised.
//! - A fixed set of well-known variables override individual fields, so a
//!   deployment can run with no config file at all.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value;

use crate::schema::{DocgateConfig, ExtractConfig, OcrConfig, SearchConfig};

/// Matches `${VAR}` and its escaped form `$${VAR}`.
static ENV_REF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$?\$\{([A-Z_][A-Z0-9_]*)\}").unwrap());

/// A `${VAR}` reference whose variable is unset or empty.
#[derive(Debug, thiserror::Error)]
#[error("Missing env var \"{var_name}\" referenced at config path: {config_path}")]
pub struct MissingEnvVarError {
    pub var_name: String,
    pub config_path: String,
}

/// Substitute `${VAR}` references using the process environment.
pub fn resolve_env_vars(value: &Value) -> Result<Value, MissingEnvVarError> {
    resolve_env_vars_with(value, &std::env::vars().collect())
}

/// Substitute `${VAR}` references using the given map.
pub fn resolve_env_vars_with(
    value: &Value,
    env: &HashMap<String, String>,
) -> Result<Value, MissingEnvVarError> {
    walk(value, env, "")
}

fn walk(value: &Value, env: &HashMap<String, String>, path: &str) -> Result<Value, MissingEnvVarError> {
    Ok(match value {
        Value::String(s) => Value::String(substitute(s, env, path)?),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .enumerate()
                .map(|(i, v)| walk(v, env, &format!("{path}[{i}]")))
                .collect::<Result<_, _>>()?,
        ),
        Value::Object(map) => {
            let mut out = serde_json::Map::with_capacity(map.len());
            for (k, v) in map {
                let child = if path.is_empty() { k.clone() } else { format!("{path}.{k}") };
                out.insert(k.clone(), walk(v, env, &child)?);
            }
            Value::Object(out)
        }
        other => other.clone(),
    })
}

fn substitute(s: &str, env: &HashMap<String, String>, path: &str) -> Result<String, MissingEnvVarError> {
    if !s.contains("${") {
        return Ok(s.to_string());
    }
    let mut missing = None;
    let out = ENV_REF.replace_all(s, |caps: &Captures| {
        let whole = &caps[0];
        let name = &caps[1];
        if whole.starts_with("$$") {
            return format!("${{{name}}}");
        }
        match env.get(name).filter(|v| !v.is_empty()) {
            Some(v) => v.clone(),
            None => {
                missing.get_or_insert_with(|| MissingEnvVarError {
                    var_name: name.to_string(),
                    config_path: path.to_string(),
                });
                String::new()
            }
        }
    });
    match missing {
        Some(err) => Err(err),
        None => Ok(out.into_owned()),
    }
}

/// Names of all variables referenced by `${VAR}` in the value tree.
pub fn collect_referenced_vars(value: &Value) -> Vec<String> {
    fn collect(value: &Value, out: &mut Vec<String>) {
        match value {
            Value::String(s) => out.extend(
                ENV_REF
                    .captures_iter(s)
                    .filter(|c| !c[0].starts_with("$$"))
                    .map(|c| c[1].to_string()),
            ),
            Value::Array(items) => items.iter().for_each(|v| collect(v, out)),
            Value::Object(map) => map.values().for_each(|v| collect(v, out)),
            _ => {}
        }
    }
    let mut vars = Vec::new();
    collect(value, &mut vars);
    vars.sort();
    vars.dedup();
    vars
}

/// Apply well-known environment variables from the process environment.
pub fn apply_env_overrides(config: DocgateConfig) -> DocgateConfig {
    apply_env_overrides_with(config, &std::env::vars().collect())
}

/// Apply well-known environment variables from the given map.
///
/// Provider sections are created on demand when one of their variables is set.
pub fn apply_env_overrides_with(
    mut config: DocgateConfig,
    env: &HashMap<String, String>,
) -> DocgateConfig {
    let get = |name: &str| env.get(name).filter(|v| !v.trim().is_empty()).cloned();

    if let Some(bind) = get("DOCGATE_BIND") {
        config.server.bind = bind;
    }
    if let Some(port) = get("DOCGATE_PORT").and_then(|p| p.parse().ok()) {
        config.server.port = port;
    }
    if let Some(root) = get("DOCGATE_STORAGE_ROOT") {
        config.storage.root = root;
    }
    if let Some(url) = get("DOCGATE_PUBLIC_BASE_URL") {
        config.storage.public_base_url = Some(url);
    }

    if let Some(key) = get("MISTRAL_OCR_API_KEY") {
        config.ocr.get_or_insert_with(OcrConfig::default).api_key = Some(key);
    }

    if let Some(id) = get("PDF_SERVICES_CLIENT_ID") {
        config.extract.get_or_insert_with(ExtractConfig::default).client_id = Some(id);
    }
    if let Some(secret) = get("PDF_SERVICES_CLIENT_SECRET") {
        config.extract.get_or_insert_with(ExtractConfig::default).client_secret = Some(secret);
    }

    if let Some(token) = get("AUTORAG_API_TOKEN") {
        config.search.get_or_insert_with(SearchConfig::default).api_token = Some(token);
    }
    if let Some(account) = get("AUTORAG_ACCOUNT_ID") {
        config.search.get_or_insert_with(SearchConfig::default).account_id = Some(account);
    }
    if let Some(rag) = get("AUTORAG_RAG_NAME") {
        config.search.get_or_insert_with(SearchConfig::default).rag_name = Some(rag);
    }

    if let Some(dir) = get("DOCGATE_LOG_DIR") {
        config.logging.dir = Some(dir);
    }
    if let Some(level) = get("RUST_LOG") {
        config.logging.level = level;
    }

    config
}
