//! Configuration management for ssh-rotate
//!
//! Loads the optional JSONC configuration file. A missing file means the
//! built-in defaults; unknown fields are rejected.

pub mod paths;
pub mod schema;

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use jsonc_parser::parse_to_serde_value;

pub use paths::{expand_tilde, get_config_dir, get_config_path};
pub use schema::{Config, Settings};

/// Load configuration from the default config file
///
/// Supports JSONC (JSON with comments).
pub fn load_config() -> Result<Config> {
    let config_path =
        get_config_path().ok_or_else(|| anyhow::anyhow!("Could not determine config file path"))?;
    load_config_from(&config_path)
}

/// Load configuration from `path`, falling back to defaults if it is absent
pub fn load_config_from(path: &Path) -> Result<Config> {
    if !path.exists() {
        tracing::debug!(
            "Config file not found, using defaults: {}",
            path.display()
        );
        return Ok(Config::default());
    }

    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_config(&contents)
        .with_context(|| format!("Invalid configuration in {}", path.display()))
}

/// Parse JSONC config text; an empty document yields the defaults
pub fn parse_config(contents: &str) -> Result<Config> {
    let Some(value) = parse_to_serde_value(contents, &Default::default())
        .map_err(|e| anyhow::anyhow!("Invalid JSONC: {e}"))?
    else {
        return Ok(Config::default());
    };

    // deny_unknown_fields rejects misspelled keys here
    serde_json::from_value(value).context("Check for unknown fields or invalid values")
}
