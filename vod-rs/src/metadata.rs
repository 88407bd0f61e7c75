// VOD metadata document

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use uuid::Uuid;

/// Durable description of one recorded VOD
///
/// Persisted as `metadata/{id}.json` under the storage root. The `id` is
/// assigned once when the value is created and doubles as the filename stem
/// of both the metadata document and the media file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VodMetadata {
    /// Opaque unique identifier
    pub id: String,

    pub user_id: String,
    pub game_id: String,
    pub game_name: String,
    pub title: String,
    pub description: String,

    /// Absolute path of the media file, empty when unknown
    pub file_path: String,

    /// Absolute path of the thumbnail image, empty when none was captured
    pub thumbnail_path: String,

    pub created_at: DateTime<Utc>,

    /// Recorded length of the VOD
    #[serde(with = "crate::timespan")]
    pub duration: Duration,

    /// Media file length in bytes, reconciled against disk on every load
    pub file_size: u64,

    /// Free-form per-game attributes (rank, map, agent, ...)
    pub properties: HashMap<String, String>,

    /// Ordered tags, matched case-insensitively when searching
    pub tags: Vec<String>,

    pub is_favorite: bool,
}

impl VodMetadata {
    /// Create empty metadata with a freshly generated id
    ///
    /// `Default` leaves `id` empty; documents missing an id take it from
    /// their filename when loaded.
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            ..Default::default()
        }
    }

    /// Look up a per-game property, falling back to `default`
    pub fn property<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.properties.get(key).map(String::as_str).unwrap_or(default)
    }

    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.properties.insert(key.into(), value.into());
    }

    /// Case-insensitive tag membership
    pub fn has_tag(&self, tag: &str) -> bool {
        let tag = tag.to_lowercase();
        self.tags.iter().any(|t| t.to_lowercase() == tag)
    }

    /// Case-insensitive substring match against title, description and game name
    pub fn matches_text(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        [&self.title, &self.description, &self.game_name]
            .iter()
            .any(|field| field.to_lowercase().contains(&needle))
    }
}
