//! Database layer
//!
//! Storage for the catalog, comments, favorites, profiles and accounts.
//! SQLite is the default backend and MySQL can be selected in configuration;
//! both sit behind the `DatabasePool` trait so repositories dispatch per driver.
//!
//! ```ignore
//! use marvelverse::config::DatabaseConfig;
//! use marvelverse::db::{create_pool, migrations};
//!
//! let pool = create_pool(&DatabaseConfig::default()).await?;
//! migrations::run_migrations(&pool).await?;
//! ```

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{
    create_pool, create_test_pool, DatabasePool, DynDatabasePool, MysqlDatabase, SqliteDatabase,
};
