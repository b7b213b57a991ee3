// src/config.rs

//! Configuration loading utilities.
//!
//! Settings come from a TOML file, then environment variables (a `.env`
//! file is honoured) override the secrets and deployment toggles:
//!
//! - `WEBHOOK_URLS`: comma-separated Discord webhook URLs
//! - `GITHUB_TOKEN`: GitHub API token for the listings source
//! - `JOBWATCH_INCLUDE_REACTIVATED`: `true`/`false`

use std::path::Path;

use crate::error::{AppError, Result};
use crate::models::Config;

pub const ENV_WEBHOOK_URLS: &str = "WEBHOOK_URLS";
pub const ENV_GITHUB_TOKEN: &str = "GITHUB_TOKEN";
pub const ENV_INCLUDE_REACTIVATED: &str = "JOBWATCH_INCLUDE_REACTIVATED";

/// Load `.env` if present. Missing file is not an error.
pub fn load_dotenv() {
    match dotenvy::dotenv() {
        Ok(path) => log::debug!("Loaded environment from {}", path.display()),
        Err(e) if e.not_found() => {}
        Err(e) => log::warn!("Ignoring unreadable .env file: {}", e),
    }
}

/// Split a comma-separated list, dropping blanks.
pub fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_bool(name: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(AppError::config(format!(
            "{} must be true or false, got {:?}",
            name, other
        ))),
    }
}

/// Apply overrides from a variable lookup.
///
/// Takes the lookup as a function so tests need not touch process state.
pub fn apply_overrides<F>(config: &mut Config, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(raw) = lookup(ENV_WEBHOOK_URLS) {
        let urls = parse_list(&raw);
        if !urls.is_empty() {
            config.channels.webhook_urls = urls;
        }
    }
    if let Some(token) = lookup(ENV_GITHUB_TOKEN).filter(|t| !t.trim().is_empty()) {
        config.source.token = Some(token);
    }
    if let Some(raw) = lookup(ENV_INCLUDE_REACTIVATED) {
        config.relay.include_reactivated = parse_bool(ENV_INCLUDE_REACTIVATED, &raw)?;
    }
    Ok(())
}

/// Load configuration from a TOML file.
///
/// Falls back to defaults if the file is missing or unreadable.
pub fn load_config(path: &Path) -> Config {
    if path.exists() {
        Config::load_or_default(path)
    } else {
        log::info!("No config file at {:?}; using defaults", path);
        Config::default()
    }
}

/// Load file, `.env` and environment overrides without validating.
pub fn load_with_env(path: &Path) -> Result<Config> {
    load_dotenv();
    let mut config = load_config(path);
    apply_overrides(&mut config, |name| std::env::var(name).ok())?;
    Ok(config)
}

/// Validate a loaded configuration, tagging the error for startup output.
pub fn validate(config: &Config) -> Result<()> {
    config
        .validate()
        .map_err(|e| AppError::config(format!("Invalid configuration: {e}")))
}
