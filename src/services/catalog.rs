//! Catalog service
//!
//! Listing and detail views for characters, comics and series, plus the
//! admin operations that create, edit and link them.

use crate::db::repositories::{AppearanceRepository, CatalogRepository};
use crate::models::{
    Appearance, CatalogCounts, CatalogKind, CreateAppearanceInput, Entry, EntryInput, WorkKind,
};
use anyhow::Context;
use serde::Serialize;
use std::sync::Arc;

/// Error types for catalog operations
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// An entry with the entries it is linked to.
///
/// For a character, `comics` and `series` are filled; for a comic or a
/// series, `characters` is. Orphaned appearance rows are left out.
#[derive(Debug, Clone, Serialize)]
pub struct EntryDetail {
    pub entry: Entry,
    pub characters: Vec<Entry>,
    pub comics: Vec<Entry>,
    pub series: Vec<Entry>,
}

/// Catalog service
pub struct CatalogService {
    catalog_repo: Arc<dyn CatalogRepository>,
    appearance_repo: Arc<dyn AppearanceRepository>,
}

impl CatalogService {
    pub fn new(
        catalog_repo: Arc<dyn CatalogRepository>,
        appearance_repo: Arc<dyn AppearanceRepository>,
    ) -> Self {
        Self {
            catalog_repo,
            appearance_repo,
        }
    }

    /// Every entry of a kind, in table order
    pub async fn list(&self, kind: CatalogKind) -> Result<Vec<Entry>, CatalogError> {
        Ok(self.catalog_repo.list(kind, None).await?)
    }

    /// The first `limit` entries of a kind
    pub async fn preview(&self, kind: CatalogKind, limit: i64) -> Result<Vec<Entry>, CatalogError> {
        Ok(self.catalog_repo.list(kind, Some(limit)).await?)
    }

    pub async fn get(&self, kind: CatalogKind, id: i64) -> Result<Entry, CatalogError> {
        self.catalog_repo
            .get(kind, id)
            .await?
            .ok_or_else(|| CatalogError::NotFound(format!("No {} with id {}", kind.slug(), id)))
    }

    /// Whether an entry exists
    pub async fn exists(&self, kind: CatalogKind, id: i64) -> Result<bool, CatalogError> {
        Ok(self.catalog_repo.get(kind, id).await?.is_some())
    }

    /// An entry with its linked characters, comics or series
    pub async fn detail(&self, kind: CatalogKind, id: i64) -> Result<EntryDetail, CatalogError> {
        let entry = self.get(kind, id).await?;
        let mut detail = EntryDetail {
            entry,
            characters: Vec::new(),
            comics: Vec::new(),
            series: Vec::new(),
        };

        match WorkKind::from_catalog(kind) {
            None => {
                detail.comics = linked_works(
                    self.appearance_repo.list_for_character(WorkKind::Comic, id).await?,
                );
                detail.series = linked_works(
                    self.appearance_repo.list_for_character(WorkKind::Series, id).await?,
                );
            }
            Some(work) => {
                detail.characters = self
                    .appearance_repo
                    .list_for_work(work, id)
                    .await?
                    .into_iter()
                    .filter_map(|appearance| appearance.character)
                    .collect();
            }
        }

        Ok(detail)
    }

    /// Number of entries of each kind
    pub async fn counts(&self) -> Result<CatalogCounts, CatalogError> {
        Ok(CatalogCounts {
            characters: self.catalog_repo.count(CatalogKind::Character).await?,
            comics: self.catalog_repo.count(CatalogKind::Comic).await?,
            series: self.catalog_repo.count(CatalogKind::Series).await?,
        })
    }

    // ========================================================================
    // Admin operations
    // ========================================================================

    /// All entries, or those matching `query` when it is not blank
    pub async fn search(&self, kind: CatalogKind, query: Option<&str>) -> Result<Vec<Entry>, CatalogError> {
        match query.map(str::trim).filter(|q| !q.is_empty()) {
            Some(term) => Ok(self.catalog_repo.search(kind, term).await?),
            None => self.list(kind).await,
        }
    }

    pub async fn create(&self, kind: CatalogKind, input: EntryInput) -> Result<Entry, CatalogError> {
        let entry = self
            .catalog_repo
            .create(kind, &normalize(input))
            .await
            .context("Failed to create entry")?;

        tracing::info!(kind = %kind, id = entry.id, "Created catalog entry");
        Ok(entry)
    }

    pub async fn update(&self, kind: CatalogKind, id: i64, input: EntryInput) -> Result<Entry, CatalogError> {
        self.catalog_repo
            .update(kind, id, &normalize(input))
            .await?
            .ok_or_else(|| CatalogError::NotFound(format!("No {} with id {}", kind.slug(), id)))
    }

    pub async fn delete(&self, kind: CatalogKind, id: i64) -> Result<(), CatalogError> {
        if !self.catalog_repo.delete(kind, id).await? {
            return Err(CatalogError::NotFound(format!("No {} with id {}", kind.slug(), id)));
        }
        tracing::info!(kind = %kind, id, "Deleted catalog entry");
        Ok(())
    }

    pub async fn list_appearances(&self, work: WorkKind) -> Result<Vec<Appearance>, CatalogError> {
        Ok(self.appearance_repo.list(work).await?)
    }

    /// Link a character to a comic or series. Either side may be omitted,
    /// but an id that is given must exist.
    pub async fn create_appearance(
        &self,
        work: WorkKind,
        input: CreateAppearanceInput,
    ) -> Result<Appearance, CatalogError> {
        if let Some(character_id) = input.character_id {
            if !self.exists(CatalogKind::Character, character_id).await? {
                return Err(CatalogError::ValidationError(format!(
                    "No character with id {}",
                    character_id
                )));
            }
        }
        if let Some(work_id) = input.work_id {
            if !self.exists(work.catalog_kind(), work_id).await? {
                return Err(CatalogError::ValidationError(format!(
                    "No {} with id {}",
                    work.catalog_kind().slug(),
                    work_id
                )));
            }
        }

        Ok(self.appearance_repo.create(work, &input).await?)
    }

    pub async fn delete_appearance(&self, work: WorkKind, id: i64) -> Result<(), CatalogError> {
        if !self.appearance_repo.delete(work, id).await? {
            return Err(CatalogError::NotFound(format!("No {} row with id {}", work.table(), id)));
        }
        Ok(())
    }
}

fn linked_works(appearances: Vec<Appearance>) -> Vec<Entry> {
    appearances.into_iter().filter_map(|a| a.work).collect()
}

/// Blank strings are stored as NULL
fn normalize(input: EntryInput) -> EntryInput {
    let clean = |value: Option<String>| value.filter(|v| !v.trim().is_empty());
    EntryInput {
        title: clean(input.title).map(|t| t.trim().to_string()),
        description: clean(input.description),
        image: clean(input.image).map(|i| i.trim().to_string()),
    }
}
