pub mod config;
pub mod info;
pub mod inventory;
pub mod run;

use std::path::Path;

use anyhow::{Context, Result};
use bbired_core::pipeline::config::PipelineConfig;

/// Read a TOML configuration, or JSON when the file ends in `.json`.
/// No file means all defaults.
pub fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    let Some(path) = path else {
        return Ok(PipelineConfig::default());
    };
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    let config = if is_json {
        serde_json::from_str(&contents).context("Invalid JSON pipeline config")?
    } else {
        toml::from_str(&contents).context("Invalid pipeline config")?
    };
    Ok(config)
}
