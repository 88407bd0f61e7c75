use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An in-progress recording, held in memory only
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingSession {
    pub id: String,
    pub game_id: String,
    pub game_name: String,
    pub user_id: String,
    pub start_time: DateTime<Utc>,
}

impl RecordingSession {
    pub fn new(id: String, game_id: &str, game_name: &str, user_id: String) -> Self {
        Self {
            id,
            game_id: game_id.to_string(),
            game_name: game_name.to_string(),
            user_id,
            start_time: Utc::now(),
        }
    }

    /// Time recorded so far, clamped at zero if the clock went backwards
    pub fn elapsed(&self, now: DateTime<Utc>) -> std::time::Duration {
        (now - self.start_time).to_std().unwrap_or_default()
    }
}
