//! Comment model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::CatalogKind;

/// A comment on a character, comic or series.
///
/// New comments are inactive and stay hidden until an admin approves them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub kind: CatalogKind,
    /// Id of the commented entry
    pub target_id: i64,
    pub user_id: i64,
    /// Author's username, joined from `users`
    pub username: String,
    pub user_comment: String,
    pub created_on: DateTime<Utc>,
    /// Moderation flag
    pub active: bool,
}

/// Admin listing filters
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommentFilter {
    #[serde(default)]
    pub active: Option<bool>,
    /// Only comments created at or after this instant
    #[serde(default)]
    pub since: Option<DateTime<Utc>>,
    /// Case-insensitive search over username and comment text
    #[serde(default)]
    pub q: Option<String>,
}

impl CommentFilter {
    /// Search term with surrounding whitespace removed, `None` when blank
    pub fn search_term(&self) -> Option<&str> {
        self.q.as_deref().map(str::trim).filter(|q| !q.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_term() {
        let filter = CommentFilter {
            q: Some("  venom ".to_string()),
            ..Default::default()
        };
        assert_eq!(filter.search_term(), Some("venom"));

        let filter = CommentFilter {
            q: Some("   ".to_string()),
            ..Default::default()
        };
        assert_eq!(filter.search_term(), None);
        assert_eq!(CommentFilter::default().search_term(), None);
    }

    #[test]
    fn test_filter_deserializes_since() {
        let filter: CommentFilter =
            serde_json::from_str(r#"{"active": false, "since": "2024-05-01T00:00:00Z"}"#).unwrap();
        assert_eq!(filter.active, Some(false));
        assert_eq!(filter.since.map(|d| d.to_rfc3339()), Some("2024-05-01T00:00:00+00:00".to_string()));
    }
}
