//! External collaborators of the relay.
//!
//! - Snapshot sources (`GitHubListingSource`, `FileSource`)
//! - Delivery channels (`DiscordWebhook`)

mod discord;
mod file;
mod github;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::models::Snapshot;
use crate::pipeline::Batch;

pub use discord::DiscordWebhook;
pub use file::FileSource;
pub use github::GitHubListingSource;

/// Produces the current listings snapshot.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Short name used in logs and errors.
    fn name(&self) -> &str;

    /// Fetch and decode the current snapshot, in feed order.
    async fn fetch(&self) -> Result<Snapshot>;
}

/// An outbound endpoint that accepts one batch per message.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Short name used in logs and delivery outcomes.
    fn name(&self) -> &str;

    /// Deliver the whole batch as one message.
    async fn send(&self, batch: &Batch) -> Result<()>;
}

/// Decode a listings feed body.
///
/// The body must be a JSON array; anything else is a failed fetch, never an
/// empty snapshot. Individual malformed records are skipped.
pub(crate) fn decode_feed(source_name: &str, bytes: &[u8]) -> Result<Snapshot> {
    let records: Vec<Value> = serde_json::from_slice(bytes)
        .map_err(|e| AppError::fetch(source_name, format!("listings are not a JSON array: {}", e)))?;
    let (snapshot, _skipped) = Snapshot::from_records(records);
    Ok(snapshot)
}
