// src/services/file.rs

//! Listings snapshot read from a local JSON file.

use std::path::PathBuf;

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::models::Snapshot;

use super::{SnapshotSource, decode_feed};

/// Reads a JSON array of postings from disk on every fetch.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl SnapshotSource for FileSource {
    fn name(&self) -> &str {
        "file"
    }

    async fn fetch(&self) -> Result<Snapshot> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|e| AppError::fetch(self.name(), format!("{}: {}", self.path.display(), e)))?;
        let snapshot = decode_feed(self.name(), &bytes)?;
        log::info!(
            "Read {} postings from {}",
            snapshot.len(),
            self.path.display()
        );
        Ok(snapshot)
    }
}
