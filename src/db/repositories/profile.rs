//! Profile repository
//!
//! `user_data` rows. Creation is an insert-ignore against the unique
//! `user_id` column, so concurrent first views end up sharing one row.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{UpdateUserDataInput, UserData};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Profile repository trait
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    async fn get_by_user(&self, user_id: i64) -> Result<Option<UserData>>;

    /// Insert a default row unless one exists
    async fn create_if_missing(&self, user_id: i64) -> Result<()>;

    async fn set_avatar(&self, user_id: i64, url: &str) -> Result<()>;

    /// Apply the fields present in `input`
    async fn update(&self, user_id: i64, input: &UpdateUserDataInput) -> Result<()>;
}

/// SQLx-based profile repository implementation
pub struct SqlxProfileRepository {
    pool: DynDatabasePool,
}

impl SqlxProfileRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ProfileRepository> {
        Arc::new(Self::new(pool))
    }
}

const SELECT_USER_DATA: &str =
    "SELECT id, user_id, profile_img_url, medal_img, scores FROM user_data WHERE user_id = ?";

const UPDATE_USER_DATA: &str = r#"
    UPDATE user_data
    SET medal_img = COALESCE(?, medal_img), scores = COALESCE(?, scores)
    WHERE user_id = ?
"#;

#[async_trait]
impl ProfileRepository for SqlxProfileRepository {
    async fn get_by_user(&self, user_id: i64) -> Result<Option<UserData>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_user_data_sqlite(self.pool.sqlite()?, user_id).await,
            DatabaseDriver::Mysql => get_user_data_mysql(self.pool.mysql()?, user_id).await,
        }
    }

    async fn create_if_missing(&self, user_id: i64) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query("INSERT OR IGNORE INTO user_data (user_id) VALUES (?)")
                    .bind(user_id)
                    .execute(self.pool.sqlite()?)
                    .await
                    .context("Failed to create user data")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query("INSERT IGNORE INTO user_data (user_id) VALUES (?)")
                    .bind(user_id)
                    .execute(self.pool.mysql()?)
                    .await
                    .context("Failed to create user data")?;
            }
        }
        Ok(())
    }

    async fn set_avatar(&self, user_id: i64, url: &str) -> Result<()> {
        let sql = "UPDATE user_data SET profile_img_url = ? WHERE user_id = ?";
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(sql)
                    .bind(url)
                    .bind(user_id)
                    .execute(self.pool.sqlite()?)
                    .await
                    .context("Failed to update avatar")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(sql)
                    .bind(url)
                    .bind(user_id)
                    .execute(self.pool.mysql()?)
                    .await
                    .context("Failed to update avatar")?;
            }
        }
        Ok(())
    }

    async fn update(&self, user_id: i64, input: &UpdateUserDataInput) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(UPDATE_USER_DATA)
                    .bind(&input.medal_img)
                    .bind(input.scores)
                    .bind(user_id)
                    .execute(self.pool.sqlite()?)
                    .await
                    .context("Failed to update user data")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(UPDATE_USER_DATA)
                    .bind(&input.medal_img)
                    .bind(input.scores)
                    .bind(user_id)
                    .execute(self.pool.mysql()?)
                    .await
                    .context("Failed to update user data")?;
            }
        }
        Ok(())
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn get_user_data_sqlite(pool: &SqlitePool, user_id: i64) -> Result<Option<UserData>> {
    let row = sqlx::query(SELECT_USER_DATA)
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .context("Failed to get user data")?;

    Ok(row.map(|row| UserData {
        id: row.get("id"),
        user_id: row.get("user_id"),
        profile_img_url: row.get("profile_img_url"),
        medal_img: row.get("medal_img"),
        scores: row.get("scores"),
    }))
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn get_user_data_mysql(pool: &MySqlPool, user_id: i64) -> Result<Option<UserData>> {
    let row = sqlx::query(SELECT_USER_DATA)
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .context("Failed to get user data")?;

    Ok(row.map(|row| UserData {
        id: row.get("id"),
        user_id: row.get("user_id"),
        profile_img_url: row.get("profile_img_url"),
        medal_img: row.get("medal_img"),
        scores: row.get("scores"),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::test_support::{insert_user, setup_pool};

    async fn setup() -> (DynDatabasePool, SqlxProfileRepository) {
        let pool = setup_pool().await;
        (pool.clone(), SqlxProfileRepository::new(pool))
    }

    #[tokio::test]
    async fn test_create_if_missing_is_idempotent() {
        let (pool, repo) = setup().await;
        let user_id = insert_user(&pool, "stephen").await;

        assert!(repo.get_by_user(user_id).await.unwrap().is_none());

        repo.create_if_missing(user_id).await.unwrap();
        let first = repo.get_by_user(user_id).await.unwrap().expect("Missing user data");
        repo.create_if_missing(user_id).await.unwrap();
        let second = repo.get_by_user(user_id).await.unwrap().expect("Missing user data");

        assert_eq!(first, second);
        assert_eq!(first.profile_img_url, "");
        assert_eq!(first.medal_img, "");
        assert_eq!(first.scores, 0);
    }

    #[tokio::test]
    async fn test_set_avatar() {
        let (pool, repo) = setup().await;
        let user_id = insert_user(&pool, "wong").await;
        repo.create_if_missing(user_id).await.unwrap();

        repo.set_avatar(user_id, "https://img.example.com/wong.png").await.unwrap();

        let data = repo.get_by_user(user_id).await.unwrap().unwrap();
        assert_eq!(data.profile_img_url, "https://img.example.com/wong.png");
    }

    #[tokio::test]
    async fn test_partial_update_keeps_other_fields() {
        let (pool, repo) = setup().await;
        let user_id = insert_user(&pool, "america").await;
        repo.create_if_missing(user_id).await.unwrap();

        repo.update(
            user_id,
            &UpdateUserDataInput {
                medal_img: Some("/static/medals/gold.png".into()),
                scores: Some(120),
            },
        )
        .await
        .unwrap();
        repo.update(
            user_id,
            &UpdateUserDataInput {
                medal_img: None,
                scores: Some(150),
            },
        )
        .await
        .unwrap();

        let data = repo.get_by_user(user_id).await.unwrap().unwrap();
        assert_eq!(data.medal_img, "/static/medals/gold.png");
        assert_eq!(data.scores, 150);
    }
}
