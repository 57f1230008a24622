//! Database layer
//!
//! SQLite is the default backend; MySQL is selected with
//! `database.driver: mysql`. Schema changes live in [`migrations`] and every
//! table has a repository under [`repositories`].
//!
//! ```ignore
//! use blogdesk::config::DatabaseConfig;
//! use blogdesk::db::{create_pool, migrations};
//!
//! let pool = create_pool(&DatabaseConfig::default()).await?;
//! migrations::run_migrations(&pool).await?;
//! ```

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{
    create_pool, create_test_pool, is_unique_violation, Backend, DatabasePool, DynDatabasePool,
    MysqlDatabase, SqliteDatabase,
};
