// src/models/mod.rs

//! Domain models for the relay.
//!
//! This module contains the data structures shared by the pipeline,
//! storage and services layers.

mod config;
mod posting;
mod snapshot;

// Re-export all public types
pub use config::{
    ChannelsConfig, CommitPolicy, Config, HttpConfig, MAX_EMBEDS_PER_MESSAGE, RelayConfig,
    SourceConfig, StorageConfig,
};
pub use posting::JobPosting;
pub use snapshot::Snapshot;
