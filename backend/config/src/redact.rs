//! Config redaction: safe-to-print config snapshots with secrets masked.

use serde_json::Value;

/// Field names whose string values are secrets.
static SECRET_KEYS: &[&str] = &[
    "apiKey",
    "api_key",
    "apiToken",
    "api_token",
    "clientSecret",
    "client_secret",
    "accessToken",
    "access_token",
    "token",
    "secret",
    "password",
];

/// Redact a config JSON value, masking every secret as `abcd***`.
pub fn redact(value: &Value) -> Value {
    redact_under(value, "")
}

fn is_secret_key(key: &str) -> bool {
    SECRET_KEYS.iter().any(|k| k.eq_ignore_ascii_case(key))
}

fn mask(s: &str) -> String {
    if s.chars().count() > 4 {
        format!("{}***", s.chars().take(4).collect::<String>())
    } else {
        "***".to_string()
    }
}

fn redact_under(value: &Value, key: &str) -> Value {
    match value {
        Value::String(s) if is_secret_key(key) && !s.is_empty() => Value::String(mask(s)),
        Value::Array(items) => Value::Array(items.iter().map(|v| redact_under(v, key)).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), redact_under(v, k)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Dotted paths of every field `redact` would mask.
pub fn collect_redacted_paths(value: &Value) -> Vec<String> {
    fn collect(value: &Value, key: &str, path: &str, out: &mut Vec<String>) {
        match value {
            Value::String(s) if is_secret_key(key) && !s.is_empty() => out.push(path.to_string()),
            Value::Array(items) => {
                for (i, v) in items.iter().enumerate() {
                    collect(v, key, &format!("{path}[{i}]"), out);
                }
            }
            Value::Object(map) => {
                for (k, v) in map {
                    let child = if path.is_empty() { k.clone() } else { format!("{path}.{k}") };
                    collect(v, k, &child, out);
                }
            }
            _ => {}
        }
    }
    let mut paths = Vec::new();
    collect(value, "", "", &mut paths);
    paths
}
