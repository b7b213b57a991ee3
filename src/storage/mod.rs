//! Storage of the previous listings snapshot.
//!
//! The relay keeps exactly one snapshot between cycles: the last one it
//! fully processed. It is read at the start of a cycle and replaced
//! wholesale at commit time.
//!
//! ## Directory Structure
//!
//! ```text
//! storage/
//! └── previous_listings.json   # Last committed snapshot
//! ```

pub mod local;
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::{JobPosting, Snapshot};

// Re-export for convenience
pub use local::LocalStorage;
pub use memory::MemoryStorage;

/// On-disk form of a committed snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredSnapshot {
    /// ISO 8601 timestamp of the commit
    pub updated_at: DateTime<Utc>,
    /// Posting count
    pub count: usize,
    /// The postings, in feed order
    pub postings: Vec<JobPosting>,
}

impl StoredSnapshot {
    pub fn new(snapshot: &Snapshot) -> Self {
        Self {
            updated_at: Utc::now(),
            count: snapshot.len(),
            postings: snapshot.postings().to_vec(),
        }
    }
}

/// Trait for previous-snapshot backends.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Load the last committed snapshot. `None` means first run.
    async fn load(&self) -> Result<Option<Snapshot>>;

    /// Replace the committed snapshot. On error the old one must remain.
    async fn replace(&self, snapshot: &Snapshot) -> Result<()>;
}
