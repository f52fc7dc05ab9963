//! Database layer
//!
//! StudyVault runs on SQLite (default, single-file deployment) or MySQL.
//! The `DatabasePool` trait hides the backend; repositories pick the SQL
//! dialect from `pool.driver()`.
//!
//! ```ignore
//! let pool = create_pool(&config.database).await?;
//! migrations::run_migrations(&pool).await?;
//! pool.ping().await?;
//! ```

pub mod migrations;
pub mod pool;
pub mod query;
pub mod repositories;

pub use pool::{
    create_pool, create_test_pool, DatabasePool, DynDatabasePool, MysqlDatabase, SqliteDatabase,
};
