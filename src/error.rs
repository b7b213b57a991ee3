// src/error.rs

//! Unified error handling for the relay.

use std::fmt;

use thiserror::Error;

/// Result type alias for relay operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Base64 payload could not be decoded
    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Snapshot could not be fetched from its source
    #[error("Fetch error from {source_name}: {message}")]
    Fetch {
        source_name: String,
        message: String,
    },

    /// A channel rejected or failed to receive a batch
    #[error("Delivery error on {channel}: {message}")]
    Delivery { channel: String, message: String },

    /// The new snapshot could not be committed to the store
    #[error("Snapshot commit failed: {0}")]
    Commit(String),
}

impl AppError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a fetch error with the source name as context.
    pub fn fetch(source_name: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Fetch {
            source_name: source_name.into(),
            message: message.to_string(),
        }
    }

    /// Create a delivery error for a channel.
    pub fn delivery(channel: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Delivery {
            channel: channel.into(),
            message: message.to_string(),
        }
    }

    /// Create a commit error.
    pub fn commit(message: impl fmt::Display) -> Self {
        Self::Commit(message.to_string())
    }

    /// Whether this error came out of the snapshot commit step.
    pub fn is_commit(&self) -> bool {
        matches!(self, Self::Commit(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AppError::delivery("discord#1", "429 Too Many Requests");
        assert_eq!(
            err.to_string(),
            "Delivery error on discord#1: 429 Too Many Requests"
        );

        let err = AppError::fetch("github", "timed out");
        assert_eq!(err.to_string(), "Fetch error from github: timed out");
    }

    #[test]
    fn test_is_commit() {
        assert!(AppError::commit("disk full").is_commit());
        assert!(!AppError::config("x").is_commit());
    }
}
