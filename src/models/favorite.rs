//! Favorite model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::CatalogKind;

/// A user's favorite marker on one entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Favorite {
    pub id: i64,
    pub user_id: i64,
    pub kind: CatalogKind,
    pub entry_id: i64,
    pub created_at: DateTime<Utc>,
}
