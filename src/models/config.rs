//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AppError, Result};

/// Discord rejects webhook messages carrying more than this many embeds.
pub const MAX_EMBEDS_PER_MESSAGE: usize = 10;

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Diff, batching and scheduling policy
    #[serde(default)]
    pub relay: RelayConfig,

    /// Where the listings snapshot comes from
    #[serde(default)]
    pub source: SourceConfig,

    /// HTTP client settings shared by source and channels
    #[serde(default)]
    pub http: HttpConfig,

    /// Outbound notification endpoints
    #[serde(default)]
    pub channels: ChannelsConfig,

    /// Previous-snapshot persistence
    #[serde(default)]
    pub storage: StorageConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values. Run once at startup.
    pub fn validate(&self) -> Result<()> {
        if self.relay.max_batch_size == 0 {
            return Err(AppError::validation("relay.max_batch_size must be > 0"));
        }
        if self.relay.max_batch_size > MAX_EMBEDS_PER_MESSAGE {
            return Err(AppError::validation(format!(
                "relay.max_batch_size must be <= {}",
                MAX_EMBEDS_PER_MESSAGE
            )));
        }
        if self.relay.poll_interval_secs == 0 {
            return Err(AppError::validation("relay.poll_interval_secs must be > 0"));
        }
        if self.http.timeout_secs == 0 {
            return Err(AppError::validation("http.timeout_secs must be > 0"));
        }
        if self.http.user_agent.trim().is_empty() {
            return Err(AppError::validation("http.user_agent is empty"));
        }
        if self.source.file.is_none() && self.source.repository.trim().is_empty() {
            return Err(AppError::validation(
                "source.repository is empty and no source.file is set",
            ));
        }
        if self.channels.webhook_urls.is_empty() {
            return Err(AppError::validation(
                "No channels configured; set channels.webhook_urls or WEBHOOK_URLS",
            ));
        }
        for raw in &self.channels.webhook_urls {
            let url = Url::parse(raw)?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(AppError::validation(format!(
                    "Webhook URL must be http(s): {}",
                    raw
                )));
            }
        }
        Ok(())
    }
}

/// When the new snapshot replaces the previous one within a cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitPolicy {
    /// Commit once every batch has been attempted on every channel.
    /// A crash mid-cycle may re-deliver, but never loses an event.
    #[default]
    AfterDelivery,
    /// Commit before delivering. A failed commit delivers nothing.
    BeforeDelivery,
}

/// Diff, batching and scheduling policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Report postings that flipped from inactive to active
    #[serde(default)]
    pub include_reactivated: bool,

    /// Postings per outbound message
    #[serde(default = "defaults::max_batch_size")]
    pub max_batch_size: usize,

    /// Seconds between polling cycles
    #[serde(default = "defaults::poll_interval")]
    pub poll_interval_secs: u64,

    #[serde(default)]
    pub commit_policy: CommitPolicy,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            include_reactivated: false,
            max_batch_size: defaults::max_batch_size(),
            poll_interval_secs: defaults::poll_interval(),
            commit_policy: CommitPolicy::default(),
        }
    }
}

/// Listings source settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// GitHub repository in `owner/name` form
    #[serde(default = "defaults::repository")]
    pub repository: String,

    /// Path of the listings JSON inside the repository
    #[serde(default = "defaults::listing_path")]
    pub path: String,

    /// GitHub REST API base URL
    #[serde(default = "defaults::api_base")]
    pub api_base: String,

    /// Personal access token; raises the API rate limit
    #[serde(default, skip_serializing)]
    pub token: Option<String>,

    /// Read listings from a local JSON file instead of GitHub
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            repository: defaults::repository(),
            path: defaults::listing_path(),
            api_base: defaults::api_base(),
            token: None,
            file: None,
        }
    }
}

/// HTTP client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
        }
    }
}

/// Outbound channel endpoints.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChannelsConfig {
    /// Discord webhook URLs; every batch goes to each of them
    #[serde(default, skip_serializing)]
    pub webhook_urls: Vec<String>,
}

/// Previous-snapshot persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the previous snapshot
    #[serde(default = "defaults::storage_dir")]
    pub dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: defaults::storage_dir(),
        }
    }
}

mod defaults {
    use std::path::PathBuf;

    // Relay defaults
    pub fn max_batch_size() -> usize {
        9
    }
    pub fn poll_interval() -> u64 {
        300
    }

    // Source defaults
    pub fn repository() -> String {
        "SimplifyJobs/Summer2025-Internships".into()
    }
    pub fn listing_path() -> String {
        ".github/scripts/listings.json".into()
    }
    pub fn api_base() -> String {
        "https://api.github.com".into()
    }

    // HTTP defaults
    pub fn user_agent() -> String {
        "jobwatch/0.1 (+https://github.com)".into()
    }
    pub fn timeout() -> u64 {
        30
    }

    pub fn storage_dir() -> PathBuf {
        PathBuf::from("storage")
    }
}
