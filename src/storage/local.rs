//! Local filesystem snapshot store.
//!
//! ## Storage Layout
//!
//! ```text
//! {root}/
//! └── previous_listings.json   # { updated_at, count, postings }
//! ```
//!
//! Writes go to a temp file that is renamed over the target, so a crash or
//! failed write leaves the previous snapshot intact.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::Snapshot;
use crate::storage::{SnapshotStore, StoredSnapshot};

/// File holding the last committed snapshot.
pub const SNAPSHOT_FILE: &str = "previous_listings.json";

/// Local filesystem storage backend.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root_dir: PathBuf,
}

impl LocalStorage {
    /// Create a new LocalStorage rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    /// Get the full path for a relative key.
    fn path(&self, key: &str) -> PathBuf {
        self.root_dir.join(key)
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path(key);
        self.ensure_dir(&path).await?;

        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    /// Write JSON data.
    async fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(value)?;
        self.write_bytes(key, &bytes).await
    }

    /// Read bytes, returning None if file doesn't exist.
    async fn read_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    /// Read JSON data.
    async fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.read_bytes(key).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Header of the stored snapshot, for status display.
    pub async fn info(&self) -> Result<Option<StoredSnapshot>> {
        self.read_json(SNAPSHOT_FILE).await
    }
}

#[async_trait]
impl SnapshotStore for LocalStorage {
    async fn load(&self) -> Result<Option<Snapshot>> {
        match self.read_json::<StoredSnapshot>(SNAPSHOT_FILE).await? {
            Some(stored) => {
                log::debug!(
                    "Loaded previous snapshot: {} postings from {}",
                    stored.count,
                    stored.updated_at
                );
                Ok(Some(Snapshot::new(stored.postings)))
            }
            None => {
                log::info!("No {} found", SNAPSHOT_FILE);
                Ok(None)
            }
        }
    }

    async fn replace(&self, snapshot: &Snapshot) -> Result<()> {
        let stored = StoredSnapshot::new(snapshot);
        self.write_json(SNAPSHOT_FILE, &stored)
            .await
            .map_err(AppError::commit)?;
        log::info!(
            "Committed snapshot: {} postings written to {}",
            stored.count,
            self.path(SNAPSHOT_FILE).display()
        );
        Ok(())
    }
}
