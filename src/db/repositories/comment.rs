//! Comment repository
//!
//! Database operations for character, comic and series comments.
//! Public reads only ever see rows with `active` set.

use crate::config::DatabaseDriver;
use crate::db::repositories::contains_pattern;
use crate::db::DynDatabasePool;
use crate::models::{CatalogKind, Comment, CommentFilter};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Comment repository trait
#[async_trait]
pub trait CommentRepository: Send + Sync {
    /// Store a new, inactive comment
    async fn create(
        &self,
        kind: CatalogKind,
        target_id: i64,
        user_id: i64,
        text: &str,
        created_on: DateTime<Utc>,
    ) -> Result<Comment>;

    /// Active comments on one entry, latest first
    async fn list_active(&self, kind: CatalogKind, target_id: i64) -> Result<Vec<Comment>>;

    /// Most recent active comment of a kind
    async fn latest_active(&self, kind: CatalogKind) -> Result<Option<Comment>>;

    /// Admin listing, latest first
    async fn list(&self, kind: CatalogKind, filter: &CommentFilter) -> Result<Vec<Comment>>;

    /// Mark one comment active. Returns whether a row changed.
    async fn approve(&self, kind: CatalogKind, id: i64) -> Result<bool>;
}

/// SQLx-based comment repository implementation
pub struct SqlxCommentRepository {
    pool: DynDatabasePool,
}

impl SqlxCommentRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CommentRepository> {
        Arc::new(Self::new(pool))
    }
}

fn select_sql(kind: CatalogKind) -> String {
    format!(
        r#"
        SELECT cm.id, cm.{fk} AS target_id, cm.user_id, u.username,
               cm.user_comment, cm.created_on, cm.active
        FROM {table} cm
        INNER JOIN users u ON u.id = cm.user_id
        "#,
        fk = kind.fk_column(),
        table = kind.comment_table(),
    )
}

/// Admin listing SQL and its bind values, in order
fn filtered_sql(kind: CatalogKind, filter: &CommentFilter) -> (String, Vec<Bind>) {
    let mut conditions = Vec::new();
    let mut binds = Vec::new();

    if let Some(active) = filter.active {
        conditions.push("cm.active = ?");
        binds.push(Bind::Flag(active));
    }
    if let Some(since) = filter.since {
        conditions.push("cm.created_on >= ?");
        binds.push(Bind::Time(since));
    }
    if let Some(term) = filter.search_term() {
        conditions.push("(LOWER(u.username) LIKE ? ESCAPE '!' OR LOWER(cm.user_comment) LIKE ? ESCAPE '!')");
        let pattern = contains_pattern(term);
        binds.push(Bind::Text(pattern.clone()));
        binds.push(Bind::Text(pattern));
    }

    let mut sql = select_sql(kind);
    if !conditions.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&conditions.join(" AND "));
    }
    sql.push_str(" ORDER BY cm.created_on DESC, cm.id DESC");

    (sql, binds)
}

enum Bind {
    Flag(bool),
    Time(DateTime<Utc>),
    Text(String),
}

#[async_trait]
impl CommentRepository for SqlxCommentRepository {
    async fn create(
        &self,
        kind: CatalogKind,
        target_id: i64,
        user_id: i64,
        text: &str,
        created_on: DateTime<Utc>,
    ) -> Result<Comment> {
        let sql = format!(
            "INSERT INTO {} ({}, user_id, user_comment, created_on, active) VALUES (?, ?, ?, ?, ?)",
            kind.comment_table(),
            kind.fk_column()
        );

        let (id, username) = match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let pool = self.pool.sqlite()?;
                let result = sqlx::query(&sql)
                    .bind(target_id)
                    .bind(user_id)
                    .bind(text)
                    .bind(created_on)
                    .bind(false)
                    .execute(pool)
                    .await
                    .context("Failed to create comment")?;
                let username: String = sqlx::query_scalar("SELECT username FROM users WHERE id = ?")
                    .bind(user_id)
                    .fetch_one(pool)
                    .await
                    .context("Failed to read comment author")?;
                (result.last_insert_rowid(), username)
            }
            DatabaseDriver::Mysql => {
                let pool = self.pool.mysql()?;
                let result = sqlx::query(&sql)
                    .bind(target_id)
                    .bind(user_id)
                    .bind(text)
                    .bind(created_on)
                    .bind(false)
                    .execute(pool)
                    .await
                    .context("Failed to create comment")?;
                let username: String = sqlx::query_scalar("SELECT username FROM users WHERE id = ?")
                    .bind(user_id)
                    .fetch_one(pool)
                    .await
                    .context("Failed to read comment author")?;
                (result.last_insert_id() as i64, username)
            }
        };

        Ok(Comment {
            id,
            kind,
            target_id,
            user_id,
            username,
            user_comment: text.to_string(),
            created_on,
            active: false,
        })
    }

    async fn list_active(&self, kind: CatalogKind, target_id: i64) -> Result<Vec<Comment>> {
        let sql = format!(
            "{} WHERE cm.{} = ? AND cm.active = ? ORDER BY cm.created_on DESC, cm.id DESC",
            select_sql(kind),
            kind.fk_column()
        );
        let binds = [Bind::Flag(true)];
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                fetch_comments_sqlite(self.pool.sqlite()?, kind, &sql, Some(target_id), &binds).await
            }
            DatabaseDriver::Mysql => {
                fetch_comments_mysql(self.pool.mysql()?, kind, &sql, Some(target_id), &binds).await
            }
        }
    }

    async fn latest_active(&self, kind: CatalogKind) -> Result<Option<Comment>> {
        let sql = format!(
            "{} WHERE cm.active = ? ORDER BY cm.created_on DESC, cm.id DESC LIMIT 1",
            select_sql(kind)
        );
        let binds = [Bind::Flag(true)];
        let comments = match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                fetch_comments_sqlite(self.pool.sqlite()?, kind, &sql, None, &binds).await?
            }
            DatabaseDriver::Mysql => {
                fetch_comments_mysql(self.pool.mysql()?, kind, &sql, None, &binds).await?
            }
        };
        Ok(comments.into_iter().next())
    }

    async fn list(&self, kind: CatalogKind, filter: &CommentFilter) -> Result<Vec<Comment>> {
        let (sql, binds) = filtered_sql(kind, filter);
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                fetch_comments_sqlite(self.pool.sqlite()?, kind, &sql, None, &binds).await
            }
            DatabaseDriver::Mysql => {
                fetch_comments_mysql(self.pool.mysql()?, kind, &sql, None, &binds).await
            }
        }
    }

    async fn approve(&self, kind: CatalogKind, id: i64) -> Result<bool> {
        let sql = format!(
            "UPDATE {} SET active = ? WHERE id = ? AND active = ?",
            kind.comment_table()
        );
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(&sql)
                .bind(true)
                .bind(id)
                .bind(false)
                .execute(self.pool.sqlite()?)
                .await
                .map(|r| r.rows_affected()),
            DatabaseDriver::Mysql => sqlx::query(&sql)
                .bind(true)
                .bind(id)
                .bind(false)
                .execute(self.pool.mysql()?)
                .await
                .map(|r| r.rows_affected()),
        }
        .with_context(|| format!("Failed to approve comment {}", id))?;

        Ok(affected > 0)
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn fetch_comments_sqlite(
    pool: &SqlitePool,
    kind: CatalogKind,
    sql: &str,
    target_id: Option<i64>,
    binds: &[Bind],
) -> Result<Vec<Comment>> {
    let mut query = sqlx::query(sql);
    if let Some(target_id) = target_id {
        query = query.bind(target_id);
    }
    for bind in binds {
        query = match bind {
            Bind::Flag(flag) => query.bind(*flag),
            Bind::Time(time) => query.bind(*time),
            Bind::Text(text) => query.bind(text.clone()),
        };
    }

    let rows = query
        .fetch_all(pool)
        .await
        .with_context(|| format!("Failed to list {}", kind.comment_table()))?;

    Ok(rows
        .iter()
        .map(|row| Comment {
            id: row.get("id"),
            kind,
            target_id: row.get("target_id"),
            user_id: row.get("user_id"),
            username: row.get("username"),
            user_comment: row.get("user_comment"),
            created_on: row.get("created_on"),
            active: row.get("active"),
        })
        .collect())
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn fetch_comments_mysql(
    pool: &MySqlPool,
    kind: CatalogKind,
    sql: &str,
    target_id: Option<i64>,
    binds: &[Bind],
) -> Result<Vec<Comment>> {
    let mut query = sqlx::query(sql);
    if let Some(target_id) = target_id {
        query = query.bind(target_id);
    }
    for bind in binds {
        query = match bind {
            Bind::Flag(flag) => query.bind(*flag),
            Bind::Time(time) => query.bind(*time),
            Bind::Text(text) => query.bind(text.clone()),
        };
    }

    let rows = query
        .fetch_all(pool)
        .await
        .with_context(|| format!("Failed to list {}", kind.comment_table()))?;

    Ok(rows
        .iter()
        .map(|row| Comment {
            id: row.get("id"),
            kind,
            target_id: row.get("target_id"),
            user_id: row.get("user_id"),
            username: row.get("username"),
            user_comment: row.get("user_comment"),
            created_on: row.get("created_on"),
            active: row.get("active"),
        })
        .collect())
}
