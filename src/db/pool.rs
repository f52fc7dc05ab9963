//! Database connection pool abstraction
//!
//! A single pool is created at start-up and shared by every repository.
//! The backend (SQLite or MySQL) is chosen from configuration.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{
    mysql::{MySqlPool, MySqlPoolOptions},
    sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions},
};
use std::str::FromStr;
use std::sync::Arc;

use crate::config::{DatabaseConfig, DatabaseDriver};

/// Database pool trait that abstracts over the supported backends.
///
/// Repositories call `driver()` to pick the SQL dialect and then borrow the
/// concrete pool through `as_sqlite()` / `as_mysql()`.
#[async_trait]
pub trait DatabasePool: Send + Sync {
    /// Execute a raw SQL statement that doesn't return rows
    async fn execute(&self, query: &str) -> Result<u64>;

    /// Check if the database connection is healthy
    async fn ping(&self) -> Result<()>;

    /// Close the connection pool
    async fn close(&self);

    /// Get the database driver type
    fn driver(&self) -> DatabaseDriver;

    /// Get the underlying SQLite pool if this is a SQLite connection
    fn as_sqlite(&self) -> Option<&SqlitePool> {
        None
    }

    /// Get the underlying MySQL pool if this is a MySQL connection
    fn as_mysql(&self) -> Option<&MySqlPool> {
        None
    }
}

/// SQLite connection pool implementation
pub struct SqliteDatabase {
    pool: SqlitePool,
}

impl SqliteDatabase {
    /// Open (or create) a SQLite database.
    ///
    /// Accepts `:memory:`, `sqlite:` URLs and bare file paths. Parent
    /// directories of file databases are created on demand.
    pub async fn new(url: &str) -> Result<Self> {
        let in_memory = url == ":memory:" || url.starts_with("sqlite::memory:");

        if !in_memory {
            let path = url.trim_start_matches("sqlite://").trim_start_matches("sqlite:");
            let path = path.split('?').next().unwrap_or(path);
            if let Some(parent) = std::path::Path::new(path).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).with_context(|| {
                        format!("Failed to create database directory: {:?}", parent)
                    })?;
                }
            }
        }

        let connection_url = if in_memory {
            "sqlite::memory:".to_string()
        } else if url.starts_with("sqlite:") {
            url.to_string()
        } else {
            format!("sqlite:{}", url)
        };

        let options = SqliteConnectOptions::from_str(&connection_url)
            .with_context(|| format!("Invalid SQLite URL: {}", url))?
            .create_if_missing(true)
            .foreign_keys(true);

        // An in-memory database lives only as long as one of its connections,
        // so keep one open for the lifetime of the pool.
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(5)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(20)
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to connect to SQLite database: {}", url))?;

        Ok(Self { pool })
    }
}

/// MySQL connection pool implementation
pub struct MysqlDatabase {
    pool: MySqlPool,
}

impl MysqlDatabase {
    /// Create a new MySQL connection pool
    pub async fn new(url: &str) -> Result<Self> {
        let connection_url = if url.starts_with("mysql://") {
            url.to_string()
        } else {
            format!("mysql://{}", url)
        };

        let pool = MySqlPoolOptions::new()
            .max_connections(30)
            .connect(&connection_url)
            .await
            .with_context(|| format!("Failed to connect to MySQL database: {}", url))?;

        Ok(Self { pool })
    }
}

/// Implement `DatabasePool` for a wrapper with a `pool` field. The trailing
/// items override the `as_*` accessor matching the backend.
macro_rules! impl_database_pool {
    ($ty:ty, $driver:expr, $($accessor:item)*) => {
        #[async_trait]
        impl DatabasePool for $ty {
            async fn execute(&self, query: &str) -> Result<u64> {
                let done = sqlx::query(query)
                    .execute(&self.pool)
                    .await
                    .with_context(|| format!("Statement failed: {}", query))?;
                Ok(done.rows_affected())
            }

            async fn ping(&self) -> Result<()> {
                sqlx::query("SELECT 1")
                    .execute(&self.pool)
                    .await
                    .with_context(|| format!("{:?} database is not reachable", $driver))?;
                Ok(())
            }

            async fn close(&self) {
                self.pool.close().await;
            }

            fn driver(&self) -> DatabaseDriver {
                $driver
            }

            $($accessor)*
        }
    };
}

impl_database_pool!(
    SqliteDatabase,
    DatabaseDriver::Sqlite,
    fn as_sqlite(&self) -> Option<&SqlitePool> {
        Some(&self.pool)
    }
);

impl_database_pool!(
    MysqlDatabase,
    DatabaseDriver::Mysql,
    fn as_mysql(&self) -> Option<&MySqlPool> {
        Some(&self.pool)
    }
);

/// Shared handle to the configured pool
pub type DynDatabasePool = Arc<dyn DatabasePool>;

/// Create a database connection pool based on configuration.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn create_pool(config: &DatabaseConfig) -> Result<DynDatabasePool> {
    match config.driver {
        DatabaseDriver::Sqlite => {
            let db = SqliteDatabase::new(&config.url).await?;
            Ok(Arc::new(db))
        }
        DatabaseDriver::Mysql => {
            let db = MysqlDatabase::new(&config.url).await?;
            Ok(Arc::new(db))
        }
    }
}

/// Create a SQLite in-memory database pool for testing
pub async fn create_test_pool() -> Result<DynDatabasePool> {
    let config = DatabaseConfig {
        driver: DatabaseDriver::Sqlite,
        url: ":memory:".to_string(),
    };
    create_pool(&config).await
}

/// Borrow the SQLite pool or fail with a descriptive error
pub(crate) fn sqlite(pool: &DynDatabasePool) -> Result<&SqlitePool> {
    pool.as_sqlite()
        .ok_or_else(|| anyhow::anyhow!("Expected a SQLite pool"))
}

/// Borrow the MySQL pool or fail with a descriptive error
pub(crate) fn mysql(pool: &DynDatabasePool) -> Result<&MySqlPool> {
    pool.as_mysql()
        .ok_or_else(|| anyhow::anyhow!("Expected a MySQL pool"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sqlite_pool_creation() {
        let pool = create_test_pool().await.expect("Failed to create pool");
        assert_eq!(pool.driver(), DatabaseDriver::Sqlite);
        assert!(pool.as_sqlite().is_some());
        assert!(pool.as_mysql().is_none());
        pool.ping().await.expect("Ping should succeed");
    }

    #[tokio::test]
    async fn test_in_memory_pool_shares_one_database() {
        let pool = create_test_pool().await.expect("Failed to create pool");

        pool.execute("CREATE TABLE shared (id INTEGER PRIMARY KEY, name TEXT)")
            .await
            .expect("Failed to create table");

        // Run inserts concurrently so several connections are checked out.
        let inserts = (0..8).map(|i| {
            let pool = pool.clone();
            async move {
                pool.execute(&format!("INSERT INTO shared (name) VALUES ('n{}')", i))
                    .await
            }
        });
        for result in futures::future::join_all(inserts).await {
            assert_eq!(result.expect("insert failed"), 1);
        }

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM shared")
            .fetch_one(pool.as_sqlite().unwrap())
            .await
            .unwrap();
        assert_eq!(count, 8);
    }

    #[tokio::test]
    async fn test_sqlite_nested_directory_creation() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("nested").join("dir").join("studyvault.db");

        let config = DatabaseConfig {
            driver: DatabaseDriver::Sqlite,
            url: db_path.to_string_lossy().to_string(),
        };

        let pool = create_pool(&config).await.expect("Failed to create pool");
        pool.ping().await.expect("Ping should succeed");
        assert!(db_path.exists());
    }

    #[tokio::test]
    async fn test_foreign_keys_enforced() {
        let pool = create_test_pool().await.unwrap();
        pool.execute("CREATE TABLE parent (id INTEGER PRIMARY KEY)").await.unwrap();
        pool.execute(
            "CREATE TABLE child (id INTEGER PRIMARY KEY, parent_id INTEGER NOT NULL REFERENCES parent(id))",
        )
        .await
        .unwrap();

        let result = pool.execute("INSERT INTO child (parent_id) VALUES (42)").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    #[ignore = "Requires MySQL server"]
    async fn test_mysql_pool_ping() {
        let url = std::env::var("MYSQL_TEST_URL")
            .unwrap_or_else(|_| "mysql://root@localhost/studyvault_test".to_string());

        let config = DatabaseConfig {
            driver: DatabaseDriver::Mysql,
            url,
        };

        let pool = create_pool(&config).await.expect("Failed to create pool");
        assert_eq!(pool.driver(), DatabaseDriver::Mysql);
        pool.ping().await.expect("Ping should succeed");
    }
}
