//! Comment service
//!
//! Comments are stored inactive and only become public once an admin
//! approves them.

use crate::db::repositories::{CatalogRepository, CommentRepository};
use crate::models::{CatalogKind, Comment, CommentFilter};
use chrono::Utc;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Error types for comment operations
#[derive(Debug, thiserror::Error)]
pub enum CommentError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Comment service
pub struct CommentService {
    repo: Arc<dyn CommentRepository>,
    catalog_repo: Arc<dyn CatalogRepository>,
}

impl CommentService {
    pub fn new(repo: Arc<dyn CommentRepository>, catalog_repo: Arc<dyn CatalogRepository>) -> Self {
        Self { repo, catalog_repo }
    }

    /// Submit a comment on an entry. The comment waits for moderation.
    pub async fn create(
        &self,
        kind: CatalogKind,
        target_id: i64,
        user_id: i64,
        text: &str,
    ) -> Result<Comment, CommentError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(CommentError::ValidationError("Comment cannot be empty".to_string()));
        }

        if self.catalog_repo.get(kind, target_id).await?.is_none() {
            return Err(CommentError::NotFound(format!(
                "No {} with id {}",
                kind.slug(),
                target_id
            )));
        }

        let comment = self
            .repo
            .create(kind, target_id, user_id, text, Utc::now())
            .await?;

        tracing::info!(kind = %kind, target_id, user_id, id = comment.id, "Comment awaiting moderation");
        Ok(comment)
    }

    /// Approved comments on an entry, latest first
    pub async fn list_active(&self, kind: CatalogKind, target_id: i64) -> Result<Vec<Comment>, CommentError> {
        Ok(self.repo.list_active(kind, target_id).await?)
    }

    /// The newest approved comment of a kind
    pub async fn latest(&self, kind: CatalogKind) -> Result<Option<Comment>, CommentError> {
        Ok(self.repo.latest_active(kind).await?)
    }

    pub async fn admin_list(&self, kind: CatalogKind, filter: &CommentFilter) -> Result<Vec<Comment>, CommentError> {
        Ok(self.repo.list(kind, filter).await?)
    }

    /// Approve every comment in `ids`, returning how many changed state.
    ///
    /// Duplicate ids are counted once; ids already active or unknown are
    /// skipped.
    pub async fn approve(&self, kind: CatalogKind, ids: &[i64]) -> Result<u64, CommentError> {
        let ids: BTreeSet<i64> = ids.iter().copied().collect();
        let mut approved = 0;

        for id in ids {
            if self.repo.approve(kind, id).await? {
                approved += 1;
            }
        }

        tracing::info!(kind = %kind, approved, "Approved comments");
        Ok(approved)
    }
}
