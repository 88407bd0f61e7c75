//! Search predicates over VOD metadata

use serde::Deserialize;
use squadov_vod::VodMetadata;

pub const DEFAULT_LIMIT: usize = 100;

/// Criteria for [`VodCatalog::search`](super::VodCatalog::search)
///
/// All given predicates must hold. Empty strings and an empty tag list are
/// treated as "not given".
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchQuery {
    /// Case-insensitive substring of the title, description or game name
    pub text: Option<String>,
    /// Exact game id
    pub game_id: Option<String>,
    /// Record must carry at least one of these (case-insensitive)
    pub tags: Vec<String>,
    pub limit: usize,
}

impl Default for SearchQuery {
    fn default() -> Self {
        Self {
            text: None,
            game_id: None,
            tags: Vec::new(),
            limit: DEFAULT_LIMIT,
        }
    }
}

impl SearchQuery {
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn game(mut self, game_id: impl Into<String>) -> Self {
        self.game_id = Some(game_id.into());
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn matches(&self, meta: &VodMetadata) -> bool {
        if let Some(text) = self.text.as_deref().filter(|t| !t.is_empty()) {
            if !meta.matches_text(text) {
                return false;
            }
        }

        if let Some(game_id) = self.game_id.as_deref().filter(|g| !g.is_empty()) {
            if meta.game_id != game_id {
                return false;
            }
        }

        if !self.tags.is_empty() && !self.tags.iter().any(|tag| meta.has_tag(tag)) {
            return false;
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vod(title: &str, game_id: &str, tags: &[&str]) -> VodMetadata {
        let mut meta = VodMetadata::new();
        meta.title = title.to_string();
        meta.game_id = game_id.to_string();
        meta.game_name = game_id.to_uppercase();
        meta.tags = tags.iter().map(|t| t.to_string()).collect();
        meta
    }

    #[test]
    fn test_empty_query_matches_everything() {
        let query = SearchQuery::default();
        assert!(query.matches(&vod("anything", "cs2", &[])));
        assert_eq!(query.limit, DEFAULT_LIMIT);
    }

    #[test]
    fn test_tags_match_any_ignoring_case() {
        let ace = vod("one", "valorant", &["ace"]);
        let clutch = vod("two", "valorant", &["clutch"]);

        let query = SearchQuery::default().tags(["ACE"]);
        assert!(query.matches(&ace));
        assert!(!query.matches(&clutch));

        let either = SearchQuery::default().tags(["ace", "clutch"]);
        assert!(either.matches(&ace));
        assert!(either.matches(&clutch));
    }

    #[test]
    fn test_predicates_are_anded() {
        let meta = vod("Ranked grind", "lol", &["ranked"]);

        assert!(SearchQuery::default().text("grind").game("lol").matches(&meta));
        assert!(!SearchQuery::default().text("grind").game("cs2").matches(&meta));
        assert!(!SearchQuery::default().text("grind").tags(["casual"]).matches(&meta));
        // Game name is searched as text too
        assert!(SearchQuery::default().text("LOL").matches(&meta));
    }

    #[test]
    fn test_blank_values_are_ignored() {
        let meta = vod("x", "cs2", &[]);
        assert!(SearchQuery::default().text("").game("").matches(&meta));
    }
}
