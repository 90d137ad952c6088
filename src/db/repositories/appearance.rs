//! Appearance repository
//!
//! Rows of `character_in_comic` and `character_in_series`, read back with
//! both sides joined so callers get full entries rather than bare ids.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{Appearance, CatalogKind, CreateAppearanceInput, Entry, WorkKind};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Appearance repository trait
#[async_trait]
pub trait AppearanceRepository: Send + Sync {
    /// Every row of one association table, orphans included
    async fn list(&self, work: WorkKind) -> Result<Vec<Appearance>>;

    /// Rows linking `character_id` to comics or series
    async fn list_for_character(&self, work: WorkKind, character_id: i64) -> Result<Vec<Appearance>>;

    /// Rows linking characters to one comic or series
    async fn list_for_work(&self, work: WorkKind, work_id: i64) -> Result<Vec<Appearance>>;

    async fn create(&self, work: WorkKind, input: &CreateAppearanceInput) -> Result<Appearance>;

    /// Returns whether a row was deleted
    async fn delete(&self, work: WorkKind, id: i64) -> Result<bool>;
}

/// SQLx-based appearance repository implementation
pub struct SqlxAppearanceRepository {
    pool: DynDatabasePool,
}

impl SqlxAppearanceRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn AppearanceRepository> {
        Arc::new(Self::new(pool))
    }

    async fn fetch(&self, work: WorkKind, filter: Filter) -> Result<Vec<Appearance>> {
        let sql = select_sql(work, filter);
        match self.pool.driver() {
            DatabaseDriver::Sqlite => fetch_appearances_sqlite(self.pool.sqlite()?, work, &sql, filter).await,
            DatabaseDriver::Mysql => fetch_appearances_mysql(self.pool.mysql()?, work, &sql, filter).await,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Filter {
    All,
    Id(i64),
    Character(i64),
    Work(i64),
}

fn select_sql(work: WorkKind, filter: Filter) -> String {
    let work_kind = work.catalog_kind();
    let fk = work_kind.fk_column();
    let condition = match filter {
        Filter::All => String::new(),
        Filter::Id(_) => "WHERE a.id = ?".to_string(),
        Filter::Character(_) => "WHERE a.character_id = ?".to_string(),
        Filter::Work(_) => format!("WHERE a.{} = ?", fk),
    };

    format!(
        r#"
        SELECT a.id,
               c.id AS character_id, c.name AS character_title,
               c.description AS character_description, c.image AS character_image,
               w.id AS work_id, w.title AS work_title,
               w.description AS work_description, w.image AS work_image
        FROM {table} a
        LEFT JOIN characters c ON c.id = a.character_id
        LEFT JOIN {work_table} w ON w.id = a.{fk}
        {condition}
        ORDER BY a.id
        "#,
        table = work.table(),
        work_table = work_kind.table(),
        fk = fk,
        condition = condition,
    )
}

#[async_trait]
impl AppearanceRepository for SqlxAppearanceRepository {
    async fn list(&self, work: WorkKind) -> Result<Vec<Appearance>> {
        self.fetch(work, Filter::All).await
    }

    async fn list_for_character(&self, work: WorkKind, character_id: i64) -> Result<Vec<Appearance>> {
        self.fetch(work, Filter::Character(character_id)).await
    }

    async fn list_for_work(&self, work: WorkKind, work_id: i64) -> Result<Vec<Appearance>> {
        self.fetch(work, Filter::Work(work_id)).await
    }

    async fn create(&self, work: WorkKind, input: &CreateAppearanceInput) -> Result<Appearance> {
        let sql = format!(
            "INSERT INTO {} (character_id, {}) VALUES (?, ?)",
            work.table(),
            work.catalog_kind().fk_column()
        );
        let id = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(&sql)
                .bind(input.character_id)
                .bind(input.work_id)
                .execute(self.pool.sqlite()?)
                .await
                .map(|r| r.last_insert_rowid()),
            DatabaseDriver::Mysql => sqlx::query(&sql)
                .bind(input.character_id)
                .bind(input.work_id)
                .execute(self.pool.mysql()?)
                .await
                .map(|r| r.last_insert_id() as i64),
        }
        .with_context(|| format!("Failed to create {} row", work.table()))?;

        self.fetch(work, Filter::Id(id))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("Appearance not found after insert"))
    }

    async fn delete(&self, work: WorkKind, id: i64) -> Result<bool> {
        let sql = format!("DELETE FROM {} WHERE id = ?", work.table());
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
        .with_context(|| format!("Failed to delete {} row {}", work.table(), id))?;

        Ok(affected > 0)
    }
}

fn bound_id(filter: Filter) -> Option<i64> {
    match filter {
        Filter::All => None,
        Filter::Id(id) | Filter::Character(id) | Filter::Work(id) => Some(id),
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn fetch_appearances_sqlite(
    pool: &SqlitePool,
    work: WorkKind,
    sql: &str,
    filter: Filter,
) -> Result<Vec<Appearance>> {
    let mut query = sqlx::query(sql);
    if let Some(id) = bound_id(filter) {
        query = query.bind(id);
    }

    let rows = query
        .fetch_all(pool)
        .await
        .with_context(|| format!("Failed to read {}", work.table()))?;

    Ok(rows.iter().map(|row| row_to_appearance_sqlite(row, work)).collect())
}

fn row_to_appearance_sqlite(row: &sqlx::sqlite::SqliteRow, work: WorkKind) -> Appearance {
    let side = |prefix: &str, kind: CatalogKind| {
        row.get::<Option<i64>, _>(format!("{}_id", prefix).as_str())
            .map(|id| Entry {
                id,
                kind,
                title: row.get(format!("{}_title", prefix).as_str()),
                description: row.get(format!("{}_description", prefix).as_str()),
                image: row.get(format!("{}_image", prefix).as_str()),
            })
    };

    Appearance {
        id: row.get("id"),
        work_kind: work,
        character: side("character", CatalogKind::Character),
        work: side("work", work.catalog_kind()),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn fetch_appearances_mysql(
    pool: &MySqlPool,
    work: WorkKind,
    sql: &str,
    filter: Filter,
) -> Result<Vec<Appearance>> {
    let mut query = sqlx::query(sql);
    if let Some(id) = bound_id(filter) {
        query = query.bind(id);
    }

    let rows = query
        .fetch_all(pool)
        .await
        .with_context(|| format!("Failed to read {}", work.table()))?;

    Ok(rows.iter().map(|row| row_to_appearance_mysql(row, work)).collect())
}

fn row_to_appearance_mysql(row: &sqlx::mysql::MySqlRow, work: WorkKind) -> Appearance {
    let side = |prefix: &str, kind: CatalogKind| {
        row.get::<Option<i64>, _>(format!("{}_id", prefix).as_str())
            .map(|id| Entry {
                id,
                kind,
                title: row.get(format!("{}_title", prefix).as_str()),
                description: row.get(format!("{}_description", prefix).as_str()),
                image: row.get(format!("{}_image", prefix).as_str()),
            })
    };

    Appearance {
        id: row.get("id"),
        work_kind: work,
        character: side("character", CatalogKind::Character),
        work: side("work", work.catalog_kind()),
    }
}
