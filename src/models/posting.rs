//! Job posting data structure.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// One job posting as published by the listings feed.
///
/// Only `id` and `active` are inspected by the diff; every other field is
/// carried through for rendering. Fields this crate does not model are kept
/// in `extra` so a stored snapshot reproduces the upstream payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobPosting {
    /// Stable identity of the posting across snapshots
    pub id: String,

    /// Whether the posting is currently open
    pub active: bool,

    #[serde(default, deserialize_with = "null_as_default")]
    pub company_name: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub locations: Vec<String>,

    /// Seasons or terms the role applies to (e.g. "Summer 2025")
    #[serde(default, deserialize_with = "null_as_default")]
    pub terms: Vec<String>,

    /// Application link
    #[serde(default, deserialize_with = "null_as_default")]
    pub url: String,

    #[serde(default)]
    pub company_url: Option<String>,

    #[serde(default)]
    pub source: Option<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub sponsorship: String,

    #[serde(default = "default_visible", deserialize_with = "null_as_visible")]
    pub is_visible: bool,

    /// Unix timestamp (seconds)
    #[serde(default, deserialize_with = "null_as_default")]
    pub date_posted: i64,

    /// Unix timestamp (seconds)
    #[serde(default, deserialize_with = "null_as_default")]
    pub date_updated: i64,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_visible() -> bool {
    true
}

/// Display fields are payload; the feed sometimes publishes them as `null`.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn null_as_visible<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or_else(default_visible))
}

impl JobPosting {
    /// Create a posting with only identity and activity set.
    pub fn new(id: impl Into<String>, active: bool) -> Self {
        Self {
            id: id.into(),
            active,
            company_name: String::new(),
            title: String::new(),
            locations: Vec::new(),
            terms: Vec::new(),
            url: String::new(),
            company_url: None,
            source: None,
            sponsorship: String::new(),
            is_visible: true,
            date_posted: 0,
            date_updated: 0,
            extra: Map::new(),
        }
    }

    /// Posting date, if the feed provided a valid timestamp.
    pub fn posted_at(&self) -> Option<DateTime<Utc>> {
        if self.date_posted <= 0 {
            return None;
        }
        DateTime::from_timestamp(self.date_posted, 0)
    }

    /// Comma-joined locations, or `N/A`.
    pub fn location_summary(&self) -> String {
        if self.locations.is_empty() {
            "N/A".to_string()
        } else {
            self.locations.join(", ")
        }
    }

    /// Sponsorship note, or `N/A`.
    pub fn sponsorship_summary(&self) -> String {
        let note = self.sponsorship.trim();
        if note.is_empty() {
            "N/A".to_string()
        } else {
            note.to_string()
        }
    }
}
