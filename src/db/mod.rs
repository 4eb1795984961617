//! Database layer
//!
//! Database abstraction supporting SQLite (default, single-binary
//! deployment) and MySQL. The driver is selected from configuration.
//!
//! # Usage
//!
//! ```ignore
//! use recipe_api::config::DatabaseConfig;
//! use recipe_api::db::{create_pool, migrations};
//!
//! let pool = create_pool(&DatabaseConfig::default()).await?;
//! migrations::run_migrations(&pool).await?;
//! pool.ping().await?;
//! ```

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{
    create_pool, create_test_pool, redact_url, DatabasePool, DynDatabasePool, MysqlDatabase,
    SqliteDatabase,
};
