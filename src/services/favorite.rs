//! Favorite service

use crate::db::repositories::{CatalogRepository, FavoriteRepository};
use crate::models::{CatalogKind, Entry};
use serde::Serialize;
use std::sync::Arc;

/// Error types for favorite operations
#[derive(Debug, thiserror::Error)]
pub enum FavoriteError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// A user's favorites grouped by kind
#[derive(Debug, Clone, Default, Serialize)]
pub struct FavoriteLists {
    pub characters: Vec<Entry>,
    pub comics: Vec<Entry>,
    pub series: Vec<Entry>,
}

impl FavoriteLists {
    pub fn is_empty(&self) -> bool {
        self.characters.is_empty() && self.comics.is_empty() && self.series.is_empty()
    }
}

/// Favorite service
pub struct FavoriteService {
    repo: Arc<dyn FavoriteRepository>,
    catalog_repo: Arc<dyn CatalogRepository>,
}

impl FavoriteService {
    pub fn new(repo: Arc<dyn FavoriteRepository>, catalog_repo: Arc<dyn CatalogRepository>) -> Self {
        Self { repo, catalog_repo }
    }

    /// Flip the favorite marker and return the new state
    pub async fn toggle(&self, user_id: i64, kind: CatalogKind, entry_id: i64) -> Result<bool, FavoriteError> {
        if self.catalog_repo.get(kind, entry_id).await?.is_none() {
            return Err(FavoriteError::NotFound(format!(
                "No {} with id {}",
                kind.slug(),
                entry_id
            )));
        }

        if self.repo.delete(user_id, kind, entry_id).await? {
            tracing::debug!(user_id, kind = %kind, entry_id, "Removed favorite");
            return Ok(false);
        }

        self.repo.create(user_id, kind, entry_id).await?;
        tracing::debug!(user_id, kind = %kind, entry_id, "Added favorite");
        Ok(true)
    }

    pub async fn is_favorite(&self, user_id: i64, kind: CatalogKind, entry_id: i64) -> Result<bool, FavoriteError> {
        Ok(self.repo.find(user_id, kind, entry_id).await?.is_some())
    }

    /// Entries of one kind the user marked, most recent first
    pub async fn list_for_user(&self, user_id: i64, kind: CatalogKind) -> Result<Vec<Entry>, FavoriteError> {
        Ok(self.repo.list_entries(user_id, kind).await?)
    }

    pub async fn all_for_user(&self, user_id: i64) -> Result<FavoriteLists, FavoriteError> {
        Ok(FavoriteLists {
            characters: self.list_for_user(user_id, CatalogKind::Character).await?,
            comics: self.list_for_user(user_id, CatalogKind::Comic).await?,
            series: self.list_for_user(user_id, CatalogKind::Series).await?,
        })
    }
}
