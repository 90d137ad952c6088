//! Profile service
//!
//! Profile rows are created on first access. Creation is an insert-ignore
//! against the unique `user_id` column followed by a read, so concurrent
//! first views end up sharing one row.

use crate::db::repositories::{ProfileRepository, UserRepository};
use crate::models::{UpdateUserDataInput, UserData};
use anyhow::anyhow;
use std::sync::Arc;

/// Error types for profile operations
#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Profile service
pub struct ProfileService {
    repo: Arc<dyn ProfileRepository>,
    user_repo: Arc<dyn UserRepository>,
}

impl ProfileService {
    pub fn new(repo: Arc<dyn ProfileRepository>, user_repo: Arc<dyn UserRepository>) -> Self {
        Self { repo, user_repo }
    }

    /// The user's profile row, created with defaults if missing
    pub async fn get_or_create(&self, user_id: i64) -> Result<UserData, ProfileError> {
        if let Some(data) = self.repo.get_by_user(user_id).await? {
            return Ok(data);
        }

        self.repo.create_if_missing(user_id).await?;
        tracing::debug!(user_id, "Created profile");

        self.repo
            .get_by_user(user_id)
            .await?
            .ok_or_else(|| ProfileError::InternalError(anyhow!("Profile for user {} vanished", user_id)))
    }

    /// Store a custom avatar URL. An empty URL restores the Gravatar fallback.
    pub async fn update_avatar(&self, user_id: i64, url: &str) -> Result<UserData, ProfileError> {
        self.get_or_create(user_id).await?;
        self.repo.set_avatar(user_id, url.trim()).await?;
        self.get_or_create(user_id).await
    }

    /// Admin update of medal and score
    pub async fn update(&self, user_id: i64, input: &UpdateUserDataInput) -> Result<UserData, ProfileError> {
        if self.user_repo.get_by_id(user_id).await?.is_none() {
            return Err(ProfileError::NotFound(format!("No user with id {}", user_id)));
        }

        self.get_or_create(user_id).await?;
        self.repo.update(user_id, input).await?;
        tracing::info!(user_id, "Updated profile");
        self.get_or_create(user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::test_support::{insert_user, setup_pool};
    use crate::db::repositories::{SqlxProfileRepository, SqlxUserRepository};
    use crate::db::DynDatabasePool;

    async fn setup() -> (Arc<ProfileService>, DynDatabasePool) {
        let pool = setup_pool().await;
        let service = ProfileService::new(
            SqlxProfileRepository::boxed(pool.clone()),
            SqlxUserRepository::boxed(pool.clone()),
        );
        (Arc::new(service), pool)
    }

    #[tokio::test]
    async fn test_created_once() {
        let (service, pool) = setup().await;
        let user = insert_user(&pool, "tchalla").await;

        let first = service.get_or_create(user).await.unwrap();
        let second = service.get_or_create(user).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.profile_img_url, "");
        assert_eq!(first.medal_img, "");
        assert_eq!(first.scores, 0);
    }

    #[tokio::test]
    async fn test_concurrent_first_views_share_a_row() {
        let (service, pool) = setup().await;
        let user = insert_user(&pool, "shuri").await;

        let (a, b) = tokio::join!(service.get_or_create(user), service.get_or_create(user));
        assert_eq!(a.unwrap().id, b.unwrap().id);
    }

    #[tokio::test]
    async fn test_update_avatar_creates_profile() {
        let (service, pool) = setup().await;
        let user = insert_user(&pool, "okoye").await;

        let data = service
            .update_avatar(user, "https://img.example.com/okoye.png")
            .await
            .unwrap();
        assert_eq!(data.profile_img_url, "https://img.example.com/okoye.png");

        let cleared = service.update_avatar(user, "").await.unwrap();
        assert_eq!(cleared.profile_img_url, "");
        assert_eq!(cleared.id, data.id);
    }

    #[tokio::test]
    async fn test_admin_update() {
        let (service, pool) = setup().await;
        let user = insert_user(&pool, "nakia").await;

        let data = service
            .update(
                user,
                &UpdateUserDataInput {
                    medal_img: Some("/static/gold.png".into()),
                    scores: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(data.medal_img, "/static/gold.png");
        assert_eq!(data.scores, 0);

        let data = service
            .update(
                user,
                &UpdateUserDataInput {
                    medal_img: None,
                    scores: Some(12),
                },
            )
            .await
            .unwrap();
        assert_eq!(data.medal_img, "/static/gold.png");
        assert_eq!(data.scores, 12);
    }

    #[tokio::test]
    async fn test_admin_update_unknown_user() {
        let (service, _pool) = setup().await;
        let result = service.update(999, &UpdateUserDataInput::default()).await;
        assert!(matches!(result, Err(ProfileError::NotFound(_))));
    }
}
