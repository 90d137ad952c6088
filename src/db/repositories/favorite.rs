//! Favorite repository

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{CatalogKind, Entry, Favorite};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Favorite repository trait
#[async_trait]
pub trait FavoriteRepository: Send + Sync {
    async fn find(&self, user_id: i64, kind: CatalogKind, entry_id: i64) -> Result<Option<Favorite>>;

    /// Insert the marker. Inserting an existing pair is a no-op.
    async fn create(&self, user_id: i64, kind: CatalogKind, entry_id: i64) -> Result<()>;

    /// Returns whether a marker was removed
    async fn delete(&self, user_id: i64, kind: CatalogKind, entry_id: i64) -> Result<bool>;

    /// Entries a user marked, most recent first
    async fn list_entries(&self, user_id: i64, kind: CatalogKind) -> Result<Vec<Entry>>;
}

/// SQLx-based favorite repository implementation
pub struct SqlxFavoriteRepository {
    pool: DynDatabasePool,
}

impl SqlxFavoriteRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn FavoriteRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl FavoriteRepository for SqlxFavoriteRepository {
    async fn find(&self, user_id: i64, kind: CatalogKind, entry_id: i64) -> Result<Option<Favorite>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => find_favorite_sqlite(self.pool.sqlite()?, user_id, kind, entry_id).await,
            DatabaseDriver::Mysql => find_favorite_mysql(self.pool.mysql()?, user_id, kind, entry_id).await,
        }
    }

    async fn create(&self, user_id: i64, kind: CatalogKind, entry_id: i64) -> Result<()> {
        let columns = format!("{} (user_id, {}, created_at)", kind.favorite_table(), kind.fk_column());
        let now = Utc::now();
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(&format!("INSERT OR IGNORE INTO {} VALUES (?, ?, ?)", columns))
                    .bind(user_id)
                    .bind(entry_id)
                    .bind(now)
                    .execute(self.pool.sqlite()?)
                    .await
                    .context("Failed to create favorite")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(&format!("INSERT IGNORE INTO {} VALUES (?, ?, ?)", columns))
                    .bind(user_id)
                    .bind(entry_id)
                    .bind(now)
                    .execute(self.pool.mysql()?)
                    .await
                    .context("Failed to create favorite")?;
            }
        }
        Ok(())
    }

    async fn delete(&self, user_id: i64, kind: CatalogKind, entry_id: i64) -> Result<bool> {
        let sql = format!(
            "DELETE FROM {} WHERE user_id = ? AND {} = ?",
            kind.favorite_table(),
            kind.fk_column()
        );
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(&sql)
                .bind(user_id)
                .bind(entry_id)
                .execute(self.pool.sqlite()?)
                .await
                .map(|r| r.rows_affected()),
            DatabaseDriver::Mysql => sqlx::query(&sql)
                .bind(user_id)
                .bind(entry_id)
                .execute(self.pool.mysql()?)
                .await
                .map(|r| r.rows_affected()),
        }
        .context("Failed to delete favorite")?;

        Ok(affected > 0)
    }

    async fn list_entries(&self, user_id: i64, kind: CatalogKind) -> Result<Vec<Entry>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_favorite_entries_sqlite(self.pool.sqlite()?, user_id, kind).await,
            DatabaseDriver::Mysql => list_favorite_entries_mysql(self.pool.mysql()?, user_id, kind).await,
        }
    }
}

fn find_sql(kind: CatalogKind) -> String {
    format!(
        "SELECT id, user_id, {fk} AS entry_id, created_at FROM {table} WHERE user_id = ? AND {fk} = ?",
        fk = kind.fk_column(),
        table = kind.favorite_table(),
    )
}

fn list_sql(kind: CatalogKind) -> String {
    format!(
        r#"
        SELECT e.id, e.{title} AS title, e.description, e.image
        FROM {favorites} f
        INNER JOIN {table} e ON e.id = f.{fk}
        WHERE f.user_id = ?
        ORDER BY f.created_at DESC, f.id DESC
        "#,
        title = kind.title_column(),
        favorites = kind.favorite_table(),
        table = kind.table(),
        fk = kind.fk_column(),
    )
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn find_favorite_sqlite(
    pool: &SqlitePool,
    user_id: i64,
    kind: CatalogKind,
    entry_id: i64,
) -> Result<Option<Favorite>> {
    let row = sqlx::query(&find_sql(kind))
        .bind(user_id)
        .bind(entry_id)
        .fetch_optional(pool)
        .await
        .context("Failed to get favorite")?;

    Ok(row.map(|row| Favorite {
        id: row.get("id"),
        user_id: row.get("user_id"),
        kind,
        entry_id: row.get("entry_id"),
        created_at: row.get("created_at"),
    }))
}

async fn list_favorite_entries_sqlite(pool: &SqlitePool, user_id: i64, kind: CatalogKind) -> Result<Vec<Entry>> {
    let rows = sqlx::query(&list_sql(kind))
        .bind(user_id)
        .fetch_all(pool)
        .await
        .with_context(|| format!("Failed to list {}", kind.favorite_table()))?;

    Ok(rows
        .iter()
        .map(|row| Entry {
            id: row.get("id"),
            kind,
            title: row.get("title"),
            description: row.get("description"),
            image: row.get("image"),
        })
        .collect())
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn find_favorite_mysql(
    pool: &MySqlPool,
    user_id: i64,
    kind: CatalogKind,
    entry_id: i64,
) -> Result<Option<Favorite>> {
    let row = sqlx::query(&find_sql(kind))
        .bind(user_id)
        .bind(entry_id)
        .fetch_optional(pool)
        .await
        .context("Failed to get favorite")?;

    Ok(row.map(|row| Favorite {
        id: row.get("id"),
        user_id: row.get("user_id"),
        kind,
        entry_id: row.get("entry_id"),
        created_at: row.get("created_at"),
    }))
}

async fn list_favorite_entries_mysql(pool: &MySqlPool, user_id: i64, kind: CatalogKind) -> Result<Vec<Entry>> {
    let rows = sqlx::query(&list_sql(kind))
        .bind(user_id)
        .fetch_all(pool)
        .await
        .with_context(|| format!("Failed to list {}", kind.favorite_table()))?;

    Ok(rows
        .iter()
        .map(|row| Entry {
            id: row.get("id"),
            kind,
            title: row.get("title"),
            description: row.get("description"),
            image: row.get("image"),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::test_support::{insert_entry, insert_user, setup_pool};

    async fn setup() -> (DynDatabasePool, SqlxFavoriteRepository) {
        let pool = setup_pool().await;
        (pool.clone(), SqlxFavoriteRepository::new(pool))
    }

    #[tokio::test]
    async fn test_favorite_links_user_and_entry() {
        let (pool, repo) = setup().await;
        let user_id = insert_user(&pool, "natasha").await;
        let other_user = insert_user(&pool, "clint").await;
        let comic_id = insert_entry(&pool, CatalogKind::Comic, "Black Widow #1").await;

        repo.create(user_id, CatalogKind::Comic, comic_id).await.unwrap();

        let favorite = repo
            .find(user_id, CatalogKind::Comic, comic_id)
            .await
            .unwrap()
            .expect("Favorite not found");
        assert_eq!(favorite.user_id, user_id);
        assert_eq!(favorite.entry_id, comic_id);
        assert_eq!(favorite.kind, CatalogKind::Comic);

        assert!(repo.find(other_user, CatalogKind::Comic, comic_id).await.unwrap().is_none());
        assert!(repo.find(user_id, CatalogKind::Series, comic_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_twice_keeps_one_row() {
        let (pool, repo) = setup().await;
        let user_id = insert_user(&pool, "tchalla").await;
        let character_id = insert_entry(&pool, CatalogKind::Character, "Shuri").await;

        repo.create(user_id, CatalogKind::Character, character_id).await.unwrap();
        repo.create(user_id, CatalogKind::Character, character_id).await.unwrap();

        let entries = repo.list_entries(user_id, CatalogKind::Character).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].to_string(), "Shuri");
    }

    #[tokio::test]
    async fn test_delete() {
        let (pool, repo) = setup().await;
        let user_id = insert_user(&pool, "loki").await;
        let series_id = insert_entry(&pool, CatalogKind::Series, "Loki").await;

        repo.create(user_id, CatalogKind::Series, series_id).await.unwrap();
        assert!(repo.delete(user_id, CatalogKind::Series, series_id).await.unwrap());
        assert!(!repo.delete(user_id, CatalogKind::Series, series_id).await.unwrap());
        assert!(repo.list_entries(user_id, CatalogKind::Series).await.unwrap().is_empty());
    }
}
