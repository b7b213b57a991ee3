//! Point-in-time collections of postings.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::JobPosting;

/// One ordered fetch of the listings feed.
///
/// Order is the feed's own and is preserved through diffing and delivery.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct Snapshot {
    postings: Vec<JobPosting>,
}

impl Snapshot {
    pub fn new(postings: Vec<JobPosting>) -> Self {
        Self { postings }
    }

    pub fn len(&self) -> usize {
        self.postings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.postings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &JobPosting> {
        self.postings.iter()
    }

    pub fn postings(&self) -> &[JobPosting] {
        &self.postings
    }

    pub fn into_postings(self) -> Vec<JobPosting> {
        self.postings
    }

    /// Build a snapshot from raw feed records, one record at a time.
    ///
    /// A record without a usable `id` or `active` is dropped and counted;
    /// it never invalidates the rest of the feed.
    pub fn from_records(records: Vec<Value>) -> (Snapshot, usize) {
        let total = records.len();
        let mut first_error = None;
        let postings: Vec<JobPosting> = records
            .into_iter()
            .filter_map(|record| match serde_json::from_value::<JobPosting>(record) {
                Ok(posting) => Some(posting),
                Err(e) => {
                    first_error.get_or_insert(e);
                    None
                }
            })
            .collect();

        let skipped = total - postings.len();
        if let Some(e) = first_error {
            log::warn!(
                "Skipped {} malformed posting record(s) of {}; first: {}",
                skipped,
                total,
                e
            );
        }
        (Snapshot::new(postings), skipped)
    }

    /// Identity lookup. When an id repeats, the last occurrence wins.
    pub fn by_id(&self) -> HashMap<&str, &JobPosting> {
        self.postings.iter().map(|p| (p.id.as_str(), p)).collect()
    }

    /// Collapse repeated ids, keeping the last occurrence at its own position.
    ///
    /// Returns the cleaned snapshot and how many entries were dropped.
    pub fn deduplicated(&self) -> (Snapshot, usize) {
        let mut seen = HashSet::new();
        let mut kept: Vec<JobPosting> = self
            .postings
            .iter()
            .rev()
            .filter(|p| seen.insert(p.id.as_str()))
            .cloned()
            .collect();
        kept.reverse();

        let dropped = self.postings.len() - kept.len();
        if dropped > 0 {
            log::warn!(
                "Snapshot contains {} duplicate posting id(s); keeping last occurrence",
                dropped
            );
        }
        (Snapshot::new(kept), dropped)
    }
}

impl FromIterator<JobPosting> for Snapshot {
    fn from_iter<I: IntoIterator<Item = JobPosting>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
