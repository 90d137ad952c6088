//! Catalog repository
//!
//! Characters, comics and series live in three tables with the same shape,
//! so one repository serves all of them. Table and column names come from
//! `CatalogKind` and never from request input.

use crate::config::DatabaseDriver;
use crate::db::repositories::contains_pattern;
use crate::db::DynDatabasePool;
use crate::models::{CatalogKind, Entry, EntryInput};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Catalog repository trait
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// All entries of a kind in table order, optionally capped at `limit`
    async fn list(&self, kind: CatalogKind, limit: Option<i64>) -> Result<Vec<Entry>>;

    async fn get(&self, kind: CatalogKind, id: i64) -> Result<Option<Entry>>;

    /// Entries whose title or description contains `term`, case-insensitively
    async fn search(&self, kind: CatalogKind, term: &str) -> Result<Vec<Entry>>;

    async fn count(&self, kind: CatalogKind) -> Result<i64>;

    async fn create(&self, kind: CatalogKind, input: &EntryInput) -> Result<Entry>;

    /// Replace all descriptive fields. Returns `None` when the id is unknown.
    async fn update(&self, kind: CatalogKind, id: i64, input: &EntryInput) -> Result<Option<Entry>>;

    /// Returns whether a row was deleted
    async fn delete(&self, kind: CatalogKind, id: i64) -> Result<bool>;
}

/// SQLx-based catalog repository implementation
pub struct SqlxCatalogRepository {
    pool: DynDatabasePool,
}

impl SqlxCatalogRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CatalogRepository> {
        Arc::new(Self::new(pool))
    }
}

fn select_sql(kind: CatalogKind) -> String {
    format!(
        "SELECT id, {} AS title, description, image FROM {}",
        kind.title_column(),
        kind.table()
    )
}

#[async_trait]
impl CatalogRepository for SqlxCatalogRepository {
    async fn list(&self, kind: CatalogKind, limit: Option<i64>) -> Result<Vec<Entry>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_entries_sqlite(self.pool.sqlite()?, kind, limit).await,
            DatabaseDriver::Mysql => list_entries_mysql(self.pool.mysql()?, kind, limit).await,
        }
    }

    async fn get(&self, kind: CatalogKind, id: i64) -> Result<Option<Entry>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_entry_sqlite(self.pool.sqlite()?, kind, id).await,
            DatabaseDriver::Mysql => get_entry_mysql(self.pool.mysql()?, kind, id).await,
        }
    }

    async fn search(&self, kind: CatalogKind, term: &str) -> Result<Vec<Entry>> {
        let pattern = contains_pattern(term);
        match self.pool.driver() {
            DatabaseDriver::Sqlite => search_entries_sqlite(self.pool.sqlite()?, kind, &pattern).await,
            DatabaseDriver::Mysql => search_entries_mysql(self.pool.mysql()?, kind, &pattern).await,
        }
    }

    async fn count(&self, kind: CatalogKind) -> Result<i64> {
        let sql = format!("SELECT COUNT(*) AS count FROM {}", kind.table());
        let row = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(&sql)
                .fetch_one(self.pool.sqlite()?)
                .await
                .map(|row| row.get::<i64, _>("count")),
            DatabaseDriver::Mysql => sqlx::query(&sql)
                .fetch_one(self.pool.mysql()?)
                .await
                .map(|row| row.get::<i64, _>("count")),
        };
        row.with_context(|| format!("Failed to count {}", kind.table()))
    }

    async fn create(&self, kind: CatalogKind, input: &EntryInput) -> Result<Entry> {
        let id = match self.pool.driver() {
            DatabaseDriver::Sqlite => create_entry_sqlite(self.pool.sqlite()?, kind, input).await?,
            DatabaseDriver::Mysql => create_entry_mysql(self.pool.mysql()?, kind, input).await?,
        };

        Ok(Entry {
            id,
            kind,
            title: input.title.clone(),
            description: input.description.clone(),
            image: input.image.clone(),
        })
    }

    async fn update(&self, kind: CatalogKind, id: i64, input: &EntryInput) -> Result<Option<Entry>> {
        let sql = format!(
            "UPDATE {} SET {} = ?, description = ?, image = ? WHERE id = ?",
            kind.table(),
            kind.title_column()
        );
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let pool = self.pool.sqlite()?;
                sqlx::query(&sql)
                    .bind(&input.title)
                    .bind(&input.description)
                    .bind(&input.image)
                    .bind(id)
                    .execute(pool)
                    .await
                    .with_context(|| format!("Failed to update {} {}", kind.table(), id))?;
                get_entry_sqlite(pool, kind, id).await
            }
            DatabaseDriver::Mysql => {
                let pool = self.pool.mysql()?;
                sqlx::query(&sql)
                    .bind(&input.title)
                    .bind(&input.description)
                    .bind(&input.image)
                    .bind(id)
                    .execute(pool)
                    .await
                    .with_context(|| format!("Failed to update {} {}", kind.table(), id))?;
                get_entry_mysql(pool, kind, id).await
            }
        }
    }

    async fn delete(&self, kind: CatalogKind, id: i64) -> Result<bool> {
        let sql = format!("DELETE FROM {} WHERE id = ?", kind.table());
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(&sql)
                .bind(id)
                .execute(self.pool.sqlite()?)
                .await
                .map(|r| r.rows_affected()),
            DatabaseDriver::Mysql => sqlx::query(&sql)
                .bind(id)
                .execute(self.pool.mysql()?)
                .await
                .map(|r| r.rows_affected()),
        }
        .with_context(|| format!("Failed to delete {} {}", kind.table(), id))?;

        Ok(affected > 0)
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn list_entries_sqlite(pool: &SqlitePool, kind: CatalogKind, limit: Option<i64>) -> Result<Vec<Entry>> {
    let sql = format!("{} ORDER BY id LIMIT ?", select_sql(kind));
    let rows = sqlx::query(&sql)
        .bind(limit.unwrap_or(-1))
        .fetch_all(pool)
        .await
        .with_context(|| format!("Failed to list {}", kind.table()))?;

    Ok(rows.iter().map(|row| row_to_entry_sqlite(row, kind)).collect())
}

async fn get_entry_sqlite(pool: &SqlitePool, kind: CatalogKind, id: i64) -> Result<Option<Entry>> {
    let sql = format!("{} WHERE id = ?", select_sql(kind));
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .with_context(|| format!("Failed to get {} {}", kind.table(), id))?;

    Ok(row.map(|row| row_to_entry_sqlite(&row, kind)))
}

async fn search_entries_sqlite(pool: &SqlitePool, kind: CatalogKind, pattern: &str) -> Result<Vec<Entry>> {
    let sql = format!(
        "{} WHERE LOWER(COALESCE({}, '')) LIKE ? ESCAPE '!' OR LOWER(COALESCE(description, '')) LIKE ? ESCAPE '!' ORDER BY id",
        select_sql(kind),
        kind.title_column()
    );
    let rows = sqlx::query(&sql)
        .bind(pattern)
        .bind(pattern)
        .fetch_all(pool)
        .await
        .with_context(|| format!("Failed to search {}", kind.table()))?;

    Ok(rows.iter().map(|row| row_to_entry_sqlite(row, kind)).collect())
}

async fn create_entry_sqlite(pool: &SqlitePool, kind: CatalogKind, input: &EntryInput) -> Result<i64> {
    let sql = format!(
        "INSERT INTO {} ({}, description, image) VALUES (?, ?, ?)",
        kind.table(),
        kind.title_column()
    );
    let result = sqlx::query(&sql)
        .bind(&input.title)
        .bind(&input.description)
        .bind(&input.image)
        .execute(pool)
        .await
        .with_context(|| format!("Failed to create {} entry", kind.table()))?;

    Ok(result.last_insert_rowid())
}

fn row_to_entry_sqlite(row: &sqlx::sqlite::SqliteRow, kind: CatalogKind) -> Entry {
    Entry {
        id: row.get("id"),
        kind,
        title: row.get("title"),
        description: row.get("description"),
        image: row.get("image"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn list_entries_mysql(pool: &MySqlPool, kind: CatalogKind, limit: Option<i64>) -> Result<Vec<Entry>> {
    let rows = match limit {
        Some(limit) => {
            let sql = format!("{} ORDER BY id LIMIT ?", select_sql(kind));
            sqlx::query(&sql).bind(limit).fetch_all(pool).await
        }
        None => {
            let sql = format!("{} ORDER BY id", select_sql(kind));
            sqlx::query(&sql).fetch_all(pool).await
        }
    }
    .with_context(|| format!("Failed to list {}", kind.table()))?;

    Ok(rows.iter().map(|row| row_to_entry_mysql(row, kind)).collect())
}

async fn get_entry_mysql(pool: &MySqlPool, kind: CatalogKind, id: i64) -> Result<Option<Entry>> {
    let sql = format!("{} WHERE id = ?", select_sql(kind));
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .with_context(|| format!("Failed to get {} {}", kind.table(), id))?;

    Ok(row.map(|row| row_to_entry_mysql(&row, kind)))
}

async fn search_entries_mysql(pool: &MySqlPool, kind: CatalogKind, pattern: &str) -> Result<Vec<Entry>> {
    let sql = format!(
        "{} WHERE LOWER(COALESCE({}, '')) LIKE ? ESCAPE '!' OR LOWER(COALESCE(description, '')) LIKE ? ESCAPE '!' ORDER BY id",
        select_sql(kind),
        kind.title_column()
    );
    let rows = sqlx::query(&sql)
        .bind(pattern)
        .bind(pattern)
        .fetch_all(pool)
        .await
        .with_context(|| format!("Failed to search {}", kind.table()))?;

    Ok(rows.iter().map(|row| row_to_entry_mysql(row, kind)).collect())
}

async fn create_entry_mysql(pool: &MySqlPool, kind: CatalogKind, input: &EntryInput) -> Result<i64> {
    let sql = format!(
        "INSERT INTO {} ({}, description, image) VALUES (?, ?, ?)",
        kind.table(),
        kind.title_column()
    );
    let result = sqlx::query(&sql)
        .bind(&input.title)
        .bind(&input.description)
        .bind(&input.image)
        .execute(pool)
        .await
        .with_context(|| format!("Failed to create {} entry", kind.table()))?;

    Ok(result.last_insert_id() as i64)
}

fn row_to_entry_mysql(row: &sqlx::mysql::MySqlRow, kind: CatalogKind) -> Entry {
    Entry {
        id: row.get("id"),
        kind,
        title: row.get("title"),
        description: row.get("description"),
        image: row.get("image"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::test_support::setup_pool;

    async fn setup_test_repo() -> SqlxCatalogRepository {
        SqlxCatalogRepository::new(setup_pool().await)
    }

    fn input(title: &str) -> EntryInput {
        EntryInput {
            title: Some(title.to_string()),
            description: Some(format!("About {}", title)),
            image: None,
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let repo = setup_test_repo().await;

        let created = repo
            .create(CatalogKind::Character, &input("Black Panther"))
            .await
            .expect("Failed to create entry");
        assert!(created.id > 0);

        let found = repo
            .get(CatalogKind::Character, created.id)
            .await
            .unwrap()
            .expect("Entry not found");
        assert_eq!(found, created);
        assert_eq!(found.to_string(), "Black Panther");
    }

    #[tokio::test]
    async fn test_create_empty_entry_has_null_fields() {
        let repo = setup_test_repo().await;

        for kind in CatalogKind::ALL {
            let created = repo.create(kind, &EntryInput::default()).await.unwrap();
            let found = repo.get(kind, created.id).await.unwrap().expect("Entry not found");
            assert!(found.title.is_none());
            assert!(found.description.is_none());
            assert!(found.image.is_none());
            assert_eq!(found.to_string(), "");
        }
    }

    #[tokio::test]
    async fn test_kinds_are_separate_tables() {
        let repo = setup_test_repo().await;
        repo.create(CatalogKind::Comic, &input("Civil War")).await.unwrap();

        assert_eq!(repo.count(CatalogKind::Comic).await.unwrap(), 1);
        assert_eq!(repo.count(CatalogKind::Series).await.unwrap(), 0);
        assert_eq!(repo.count(CatalogKind::Character).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_list_in_table_order_with_limit() {
        let repo = setup_test_repo().await;
        for title in ["Daredevil", "Elektra", "Punisher"] {
            repo.create(CatalogKind::Character, &input(title)).await.unwrap();
        }

        let all = repo.list(CatalogKind::Character, None).await.unwrap();
        let titles: Vec<String> = all.iter().map(|e| e.to_string()).collect();
        assert_eq!(titles, vec!["Daredevil", "Elektra", "Punisher"]);

        let first_two = repo.list(CatalogKind::Character, Some(2)).await.unwrap();
        assert_eq!(first_two.len(), 2);
        assert_eq!(first_two[0].id, all[0].id);
    }

    #[tokio::test]
    async fn test_search_is_case_insensitive() {
        let repo = setup_test_repo().await;
        repo.create(CatalogKind::Series, &input("Astonishing X-Men")).await.unwrap();
        repo.create(CatalogKind::Series, &input("Runaways")).await.unwrap();
        repo.create(CatalogKind::Series, &EntryInput::default()).await.unwrap();

        let found = repo.search(CatalogKind::Series, "x-men").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].to_string(), "Astonishing X-Men");

        let by_description = repo.search(CatalogKind::Series, "ABOUT run").await.unwrap();
        assert_eq!(by_description.len(), 1);
    }

    #[tokio::test]
    async fn test_search_wildcards_match_literally() {
        let repo = setup_test_repo().await;
        repo.create(CatalogKind::Comic, &input("Fantastic Four")).await.unwrap();
        repo.create(CatalogKind::Comic, &input("100% Marvel")).await.unwrap();
        repo.create(CatalogKind::Comic, &input("What_If")).await.unwrap();

        let percent = repo.search(CatalogKind::Comic, "%").await.unwrap();
        assert_eq!(percent.len(), 1);
        assert_eq!(percent[0].to_string(), "100% Marvel");

        let underscore = repo.search(CatalogKind::Comic, "_").await.unwrap();
        assert_eq!(underscore.len(), 1);
        assert_eq!(underscore[0].to_string(), "What_If");

        assert!(repo.search(CatalogKind::Comic, "!").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_replaces_fields() {
        let repo = setup_test_repo().await;
        let created = repo.create(CatalogKind::Comic, &input("Secret Wars")).await.unwrap();

        let updated = repo
            .update(
                CatalogKind::Comic,
                created.id,
                &EntryInput {
                    title: Some("Secret Wars II".into()),
                    description: None,
                    image: Some("https://img.example.com/sw2.jpg".into()),
                },
            )
            .await
            .unwrap()
            .expect("Entry not found");

        assert_eq!(updated.to_string(), "Secret Wars II");
        assert!(updated.description.is_none());
        assert_eq!(updated.image.as_deref(), Some("https://img.example.com/sw2.jpg"));

        let missing = repo.update(CatalogKind::Comic, 999, &input("x")).await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_delete() {
        let repo = setup_test_repo().await;
        let created = repo.create(CatalogKind::Character, &input("Vision")).await.unwrap();

        assert!(repo.delete(CatalogKind::Character, created.id).await.unwrap());
        assert!(!repo.delete(CatalogKind::Character, created.id).await.unwrap());
        assert!(repo.get(CatalogKind::Character, created.id).await.unwrap().is_none());
    }
}
