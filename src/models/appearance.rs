//! Appearance model
//!
//! Join rows recording that a character appears in a comic or a series.
//! Both sides are nullable and rows survive the deletion of either side.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{CatalogKind, Entry};

/// The non-character side of an appearance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkKind {
    Comic,
    Series,
}

impl WorkKind {
    pub fn table(self) -> &'static str {
        match self {
            Self::Comic => "character_in_comic",
            Self::Series => "character_in_series",
        }
    }

    pub fn catalog_kind(self) -> CatalogKind {
        match self {
            Self::Comic => CatalogKind::Comic,
            Self::Series => CatalogKind::Series,
        }
    }

    /// Appearance kind for a work, `None` for characters
    pub fn from_catalog(kind: CatalogKind) -> Option<Self> {
        match kind {
            CatalogKind::Character => None,
            CatalogKind::Comic => Some(Self::Comic),
            CatalogKind::Series => Some(Self::Series),
        }
    }
}

impl fmt::Display for WorkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.catalog_kind().slug())
    }
}

impl FromStr for WorkKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kind = CatalogKind::from_str(s)?;
        Self::from_catalog(kind).ok_or_else(|| anyhow::anyhow!("Not a comic or series: {}", s))
    }
}

/// CharacterInComic / CharacterInSeries row with both sides loaded
#[derive(Debug, Clone, Serialize)]
pub struct Appearance {
    pub id: i64,
    pub work_kind: WorkKind,
    pub character: Option<Entry>,
    /// The comic or series
    pub work: Option<Entry>,
}

impl fmt::Display for Appearance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let character = self.character.as_ref().map(Entry::to_string).unwrap_or_default();
        let work = self.work.as_ref().map(Entry::to_string).unwrap_or_default();
        write!(f, "{} in {}", character, work)
    }
}

/// Payload for creating an appearance row.
///
/// The work id may be sent as `comic_id` or `series_id`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateAppearanceInput {
    #[serde(default)]
    pub character_id: Option<i64>,
    #[serde(default, alias = "comic_id", alias = "series_id")]
    pub work_id: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(kind: CatalogKind, id: i64, title: &str) -> Entry {
        Entry {
            id,
            kind,
            title: Some(title.to_string()),
            description: None,
            image: None,
        }
    }

    #[test]
    fn test_display() {
        let appearance = Appearance {
            id: 1,
            work_kind: WorkKind::Comic,
            character: Some(entry(CatalogKind::Character, 1, "Jean Grey")),
            work: Some(entry(CatalogKind::Comic, 2, "Phoenix Saga")),
        };
        assert_eq!(appearance.to_string(), "Jean Grey in Phoenix Saga");
    }

    #[test]
    fn test_display_orphan() {
        let appearance = Appearance {
            id: 1,
            work_kind: WorkKind::Series,
            character: None,
            work: Some(entry(CatalogKind::Series, 2, "Ms. Marvel")),
        };
        assert_eq!(appearance.to_string(), " in Ms. Marvel");
    }

    #[test]
    fn test_work_kind_from_str() {
        assert_eq!(WorkKind::from_str("comics").unwrap(), WorkKind::Comic);
        assert_eq!(WorkKind::from_str("series").unwrap(), WorkKind::Series);
        assert!(WorkKind::from_str("characters").is_err());
        assert!(WorkKind::from_str("films").is_err());
    }

    #[test]
    fn test_create_input_aliases() {
        let input: CreateAppearanceInput =
            serde_json::from_str(r#"{"character_id": 3, "series_id": 9}"#).unwrap();
        assert_eq!(input.character_id, Some(3));
        assert_eq!(input.work_id, Some(9));

        let input: CreateAppearanceInput = serde_json::from_str("{}").unwrap();
        assert!(input.character_id.is_none());
        assert!(input.work_id.is_none());
    }
}
