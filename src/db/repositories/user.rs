//! User repository
//!
//! Database operations for registered accounts.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{User, UserRole};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::str::FromStr;
use std::sync::Arc;

/// User repository trait
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new user, returning it with its id
    async fn create(&self, user: &User) -> Result<User>;

    /// Insert a self-registered account. The role is decided by the insert
    /// itself: admin when the table is empty, member otherwise.
    async fn create_account(&self, user: &User) -> Result<User>;

    async fn get_by_id(&self, id: i64) -> Result<Option<User>>;

    async fn get_by_username(&self, username: &str) -> Result<Option<User>>;

    /// First user registered with this email
    async fn get_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Count registered users
    async fn count(&self) -> Result<i64>;
}

/// SQLx-based user repository implementation
pub struct SqlxUserRepository {
    pool: DynDatabasePool,
}

impl SqlxUserRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn UserRepository> {
        Arc::new(Self::new(pool))
    }
}

const USER_COLUMNS: &str =
    "id, username, email, first_name, last_name, password_hash, role, created_at, updated_at";

#[async_trait]
impl UserRepository for SqlxUserRepository {
    async fn create(&self, user: &User) -> Result<User> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_user_sqlite(self.pool.sqlite()?, user).await,
            DatabaseDriver::Mysql => create_user_mysql(self.pool.mysql()?, user).await,
        }
    }

    async fn create_account(&self, user: &User) -> Result<User> {
        let id = match self.pool.driver() {
            DatabaseDriver::Sqlite => create_account_sqlite(self.pool.sqlite()?, user).await?,
            DatabaseDriver::Mysql => create_account_mysql(self.pool.mysql()?, user).await?,
        };
        self.get_by_id(id)
            .await?
            .with_context(|| format!("Registered user {} not found", id))
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS);
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                find_user_sqlite(self.pool.sqlite()?, &sql, Lookup::Id(id)).await
            }
            DatabaseDriver::Mysql => find_user_mysql(self.pool.mysql()?, &sql, Lookup::Id(id)).await,
        }
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE username = ?", USER_COLUMNS);
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                find_user_sqlite(self.pool.sqlite()?, &sql, Lookup::Text(username)).await
            }
            DatabaseDriver::Mysql => {
                find_user_mysql(self.pool.mysql()?, &sql, Lookup::Text(username)).await
            }
        }
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        let sql = format!(
            "SELECT {} FROM users WHERE email = ? AND email <> '' ORDER BY id LIMIT 1",
            USER_COLUMNS
        );
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                find_user_sqlite(self.pool.sqlite()?, &sql, Lookup::Text(email)).await
            }
            DatabaseDriver::Mysql => {
                find_user_mysql(self.pool.mysql()?, &sql, Lookup::Text(email)).await
            }
        }
    }

    async fn count(&self) -> Result<i64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => count_users_sqlite(self.pool.sqlite()?).await,
            DatabaseDriver::Mysql => count_users_mysql(self.pool.mysql()?).await,
        }
    }
}

/// Whether `err` was caused by a UNIQUE constraint (duplicate username)
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        matches!(
            cause.downcast_ref::<sqlx::Error>(),
            Some(sqlx::Error::Database(db)) if db.is_unique_violation()
        )
    })
}

/// First account becomes admin, decided in the same statement as the insert
const CREATE_ACCOUNT_SQL: &str = r#"
    INSERT INTO users (username, email, first_name, last_name, password_hash, role, created_at, updated_at)
    SELECT ?, ?, ?, ?, ?,
           CASE WHEN (SELECT COUNT(*) FROM users) = 0 THEN 'admin' ELSE 'member' END,
           ?, ?
"#;

/// Bind value for a single-column user lookup
enum Lookup<'a> {
    Id(i64),
    Text(&'a str),
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_user_sqlite(pool: &SqlitePool, user: &User) -> Result<User> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO users (username, email, first_name, last_name, password_hash, role, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&user.username)
    .bind(&user.email)
    .bind(&user.first_name)
    .bind(&user.last_name)
    .bind(&user.password_hash)
    .bind(user.role.to_string())
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create user")?;

    Ok(User {
        id: result.last_insert_rowid(),
        created_at: now,
        updated_at: now,
        ..user.clone()
    })
}

async fn create_account_sqlite(pool: &SqlitePool, user: &User) -> Result<i64> {
    let now = Utc::now();
    let result = sqlx::query(CREATE_ACCOUNT_SQL)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.password_hash)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await
        .context("Failed to register user")?;

    Ok(result.last_insert_rowid())
}

async fn find_user_sqlite(pool: &SqlitePool, sql: &str, lookup: Lookup<'_>) -> Result<Option<User>> {
    let query = sqlx::query(sql);
    let query = match lookup {
        Lookup::Id(id) => query.bind(id),
        Lookup::Text(text) => query.bind(text),
    };

    let row = query
        .fetch_optional(pool)
        .await
        .context("Failed to get user")?;

    row.as_ref().map(row_to_user_sqlite).transpose()
}

async fn count_users_sqlite(pool: &SqlitePool) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM users")
        .fetch_one(pool)
        .await
        .context("Failed to count users")?;

    Ok(row.get("count"))
}

fn row_to_user_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<User> {
    let role_str: String = row.get("role");
    let role = UserRole::from_str(&role_str)
        .with_context(|| format!("Invalid role in database: {}", role_str))?;

    Ok(User {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        password_hash: row.get("password_hash"),
        role,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_user_mysql(pool: &MySqlPool, user: &User) -> Result<User> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO users (username, email, first_name, last_name, password_hash, role, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&user.username)
    .bind(&user.email)
    .bind(&user.first_name)
    .bind(&user.last_name)
    .bind(&user.password_hash)
    .bind(user.role.to_string())
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create user")?;

    Ok(User {
        id: result.last_insert_id() as i64,
        created_at: now,
        updated_at: now,
        ..user.clone()
    })
}

async fn create_account_mysql(pool: &MySqlPool, user: &User) -> Result<i64> {
    let now = Utc::now();
    let result = sqlx::query(CREATE_ACCOUNT_SQL)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.password_hash)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await
        .context("Failed to register user")?;

    Ok(result.last_insert_id() as i64)
}

async fn find_user_mysql(pool: &MySqlPool, sql: &str, lookup: Lookup<'_>) -> Result<Option<User>> {
    let query = sqlx::query(sql);
    let query = match lookup {
        Lookup::Id(id) => query.bind(id),
        Lookup::Text(text) => query.bind(text),
    };

    let row = query
        .fetch_optional(pool)
        .await
        .context("Failed to get user")?;

    row.as_ref().map(row_to_user_mysql).transpose()
}

async fn count_users_mysql(pool: &MySqlPool) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM users")
        .fetch_one(pool)
        .await
        .context("Failed to count users")?;

    Ok(row.get("count"))
}

fn row_to_user_mysql(row: &sqlx::mysql::MySqlRow) -> Result<User> {
    let role_str: String = row.get("role");
    let role = UserRole::from_str(&role_str)
        .with_context(|| format!("Invalid role in database: {}", role_str))?;

    Ok(User {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        password_hash: row.get("password_hash"),
        role,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}
