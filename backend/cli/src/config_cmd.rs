//! CLI Config Command
//!
//! Prints the effective config with secrets masked, then the validation report.

use std::path::Path;

use anyhow::{Context, Result};

use docgate_config::{collect_redacted_paths, collect_referenced_vars, load_and_prepare, load_config, redact};

pub async fn run(path: &Path) -> Result<()> {
    let raw = serde_json::to_value(load_config(path).await?).context("Failed to serialize config")?;
    let referenced = collect_referenced_vars(&raw);
    let (config, report) = load_and_prepare(path).await?;

    let value = serde_json::to_value(&config).context("Failed to serialize config")?;
    let masked = collect_redacted_paths(&value);

    println!("# {}", path.display());
    println!("{}", serde_json::to_string_pretty(&redact(&value))?);

    if !referenced.is_empty() {
        println!("\nEnv references: {}", referenced.join(", "));
    }
    if !masked.is_empty() {
        println!("\nMasked: {}", masked.join(", "));
    }

    println!();
    for error in &report.errors {
        println!("  🔴 {}: {}", error.path, error.message);
    }
    for warning in &report.warnings {
        println!("  🟡 {}: {}", warning.path, warning.message);
    }
    if report.is_valid() {
        println!("✅ Config is valid.");
    } else {
        println!("❌ Config has {} error(s).", report.errors.len());
    }

    Ok(())
}
