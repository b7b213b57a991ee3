//! In-memory snapshot store for tests and dry runs.

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::Result;
use crate::models::Snapshot;
use crate::storage::SnapshotStore;

/// Snapshot store held in process memory.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    snapshot: RwLock<Option<Snapshot>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing previous snapshot.
    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        Self {
            snapshot: RwLock::new(Some(snapshot)),
        }
    }
}

#[async_trait]
impl SnapshotStore for MemoryStorage {
    async fn load(&self) -> Result<Option<Snapshot>> {
        Ok(self.snapshot.read().await.clone())
    }

    async fn replace(&self, snapshot: &Snapshot) -> Result<()> {
        *self.snapshot.write().await = Some(snapshot.clone());
        Ok(())
    }
}
