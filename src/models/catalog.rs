//! Catalog model
//!
//! Characters, comics and series share one shape: an id plus an optional
//! title, description and image URL. For characters the title column is
//! `name`. `CatalogKind` knows which tables and columns belong to each kind.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which catalog table an entry lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogKind {
    Character,
    Comic,
    Series,
}

impl CatalogKind {
    pub const ALL: [CatalogKind; 3] = [CatalogKind::Character, CatalogKind::Comic, CatalogKind::Series];

    /// Entity table
    pub fn table(self) -> &'static str {
        match self {
            Self::Character => "characters",
            Self::Comic => "comics",
            Self::Series => "series",
        }
    }

    /// Column holding the display string
    pub fn title_column(self) -> &'static str {
        match self {
            Self::Character => "name",
            Self::Comic | Self::Series => "title",
        }
    }

    /// Foreign key column pointing at this kind from comment, favorite and
    /// appearance tables
    pub fn fk_column(self) -> &'static str {
        match self {
            Self::Character => "character_id",
            Self::Comic => "comic_id",
            Self::Series => "series_id",
        }
    }

    pub fn comment_table(self) -> &'static str {
        match self {
            Self::Character => "character_comments",
            Self::Comic => "comic_comments",
            Self::Series => "series_comments",
        }
    }

    pub fn favorite_table(self) -> &'static str {
        match self {
            Self::Character => "favorite_characters",
            Self::Comic => "favorite_comics",
            Self::Series => "favorite_series",
        }
    }

    /// URL path segment, also used by `FromStr`
    pub fn slug(self) -> &'static str {
        self.table()
    }

    /// Kind for an exact URL segment (`characters`, `comics`, `series`)
    pub fn from_slug(slug: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.slug() == slug)
    }

    /// Heading used on list pages
    pub fn label(self) -> &'static str {
        match self {
            Self::Character => "Characters",
            Self::Comic => "Comics",
            Self::Series => "Series",
        }
    }

    /// Template used for the detail page
    pub fn detail_template(self) -> &'static str {
        match self {
            Self::Character => "character.html",
            Self::Comic => "comic.html",
            Self::Series => "series.html",
        }
    }
}

impl fmt::Display for CatalogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for CatalogKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "characters" | "character" => Ok(Self::Character),
            "comics" | "comic" => Ok(Self::Comic),
            "series" => Ok(Self::Series),
            _ => Err(anyhow::anyhow!("Unknown catalog kind: {}", s)),
        }
    }
}

/// A character, comic or series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub id: i64,
    pub kind: CatalogKind,
    /// Character name or comic/series title
    pub title: Option<String>,
    pub description: Option<String>,
    /// Image URL
    pub image: Option<String>,
}

impl Entry {
    /// An unsaved entry with every descriptive field empty
    pub fn empty(kind: CatalogKind) -> Self {
        Self {
            id: 0,
            kind,
            title: None,
            description: None,
            image: None,
        }
    }

    /// Path of the public detail page
    pub fn url(&self) -> String {
        format!("/{}/{}", self.kind.slug(), self.id)
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title.as_deref().unwrap_or(""))
    }
}

/// Fields accepted when creating or replacing an entry.
///
/// `name` is accepted as an alias of `title` so character payloads can use
/// their natural field name.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct EntryInput {
    #[serde(default, alias = "name")]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

/// Number of entries per kind, shown on the home page
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct CatalogCounts {
    pub characters: i64,
    pub comics: i64,
    pub series: i64,
}
