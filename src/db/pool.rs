//! Database connection pool abstraction
//!
//! Repositories talk to a [`DynDatabasePool`] and branch on its driver to
//! reach the concrete sqlx pool. SQLite is the default; MySQL is selected by
//! configuration.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{
    mysql::{MySqlPool, MySqlPoolOptions},
    sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions},
};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use crate::config::{DatabaseConfig, DatabaseDriver};

/// Backend-agnostic handle shared by all repositories
#[async_trait]
pub trait DatabasePool: Send + Sync {
    /// Execute a raw SQL statement, returning the affected row count
    async fn execute(&self, query: &str) -> Result<u64>;

    /// Round-trip a trivial query
    async fn ping(&self) -> Result<()>;

    async fn close(&self);

    fn driver(&self) -> DatabaseDriver;

    fn as_sqlite(&self) -> Option<&SqlitePool>;

    fn as_mysql(&self) -> Option<&MySqlPool>;
}

impl dyn DatabasePool {
    /// Borrow the SQLite pool, failing if the driver is something else
    pub fn sqlite(&self) -> Result<&SqlitePool> {
        self.as_sqlite().context("Database pool is not a SQLite pool")
    }

    /// Borrow the MySQL pool, failing if the driver is something else
    pub fn mysql(&self) -> Result<&MySqlPool> {
        self.as_mysql().context("Database pool is not a MySQL pool")
    }
}

pub type DynDatabasePool = Arc<dyn DatabasePool>;

/// A connected sqlx pool of either backend
pub enum Database {
    Sqlite(SqlitePool),
    Mysql(MySqlPool),
}

impl Database {
    /// Open a SQLite database.
    ///
    /// Accepts `:memory:`, `sqlite::memory:`, `sqlite:<path>` or a bare file
    /// path. Missing files and parent directories are created. Foreign keys
    /// are enforced on every connection.
    pub async fn connect_sqlite(url: &str) -> Result<Self> {
        let path = url
            .strip_prefix("sqlite://")
            .or_else(|| url.strip_prefix("sqlite:"))
            .unwrap_or(url);
        let path = path.split('?').next().unwrap_or(path);

        let (options, pool_options) = if path == ":memory:" {
            // Each in-memory connection is its own database; keep exactly one alive.
            (
                SqliteConnectOptions::from_str("sqlite::memory:")
                    .context("Invalid in-memory SQLite options")?,
                SqlitePoolOptions::new()
                    .max_connections(1)
                    .idle_timeout(None)
                    .max_lifetime(None),
            )
        } else {
            if let Some(parent) = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create database directory {}", parent.display()))?;
            }
            (
                SqliteConnectOptions::new()
                    .filename(path)
                    .create_if_missing(true),
                SqlitePoolOptions::new().max_connections(20),
            )
        };

        let pool = pool_options
            .connect_with(options.foreign_keys(true))
            .await
            .with_context(|| format!("Failed to connect to SQLite database: {}", url))?;

        Ok(Database::Sqlite(pool))
    }

    /// Open a MySQL pool; the `mysql://` scheme is optional
    pub async fn connect_mysql(url: &str) -> Result<Self> {
        let url = if url.starts_with("mysql://") {
            url.to_string()
        } else {
            format!("mysql://{}", url)
        };

        let pool = MySqlPoolOptions::new()
            .max_connections(30)
            .connect(&url)
            .await
            .context("Failed to connect to MySQL database")?;

        Ok(Database::Mysql(pool))
    }
}

#[async_trait]
impl DatabasePool for Database {
    async fn execute(&self, query: &str) -> Result<u64> {
        let affected = match self {
            Database::Sqlite(pool) => sqlx::query(query).execute(pool).await.map(|r| r.rows_affected()),
            Database::Mysql(pool) => sqlx::query(query).execute(pool).await.map(|r| r.rows_affected()),
        }
        .with_context(|| format!("Failed to execute query: {}", query))?;
        Ok(affected)
    }

    async fn ping(&self) -> Result<()> {
        match self {
            Database::Sqlite(pool) => sqlx::query("SELECT 1").execute(pool).await.map(|_| ()),
            Database::Mysql(pool) => sqlx::query("SELECT 1").execute(pool).await.map(|_| ()),
        }
        .context("Database ping failed")
    }

    async fn close(&self) {
        match self {
            Database::Sqlite(pool) => pool.close().await,
            Database::Mysql(pool) => pool.close().await,
        }
    }

    fn driver(&self) -> DatabaseDriver {
        match self {
            Database::Sqlite(_) => DatabaseDriver::Sqlite,
            Database::Mysql(_) => DatabaseDriver::Mysql,
        }
    }

    fn as_sqlite(&self) -> Option<&SqlitePool> {
        match self {
            Database::Sqlite(pool) => Some(pool),
            Database::Mysql(_) => None,
        }
    }

    fn as_mysql(&self) -> Option<&MySqlPool> {
        match self {
            Database::Mysql(pool) => Some(pool),
            Database::Sqlite(_) => None,
        }
    }
}

/// Create a database connection pool based on configuration.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn create_pool(config: &DatabaseConfig) -> Result<DynDatabasePool> {
    let db = match config.driver {
        DatabaseDriver::Sqlite => Database::connect_sqlite(&config.url).await?,
        DatabaseDriver::Mysql => Database::connect_mysql(&config.url).await?,
    };
    Ok(Arc::new(db))
}

/// In-memory SQLite pool for tests
pub async fn create_test_pool() -> Result<DynDatabasePool> {
    create_pool(&DatabaseConfig {
        driver: DatabaseDriver::Sqlite,
        url: ":memory:".to_string(),
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sqlite_config(url: impl Into<String>) -> DatabaseConfig {
        DatabaseConfig {
            driver: DatabaseDriver::Sqlite,
            url: url.into(),
        }
    }

    #[tokio::test]
    async fn test_sqlite_pool_creation() {
        let pool = create_pool(&sqlite_config("sqlite::memory:"))
            .await
            .expect("Failed to create pool");

        assert_eq!(pool.driver(), DatabaseDriver::Sqlite);
        assert!(pool.sqlite().is_ok());
        assert!(pool.mysql().is_err());
        pool.ping().await.expect("Ping should succeed");
    }

    #[tokio::test]
    async fn test_execute_reports_rows_affected() {
        let pool = create_test_pool().await.expect("Failed to create test pool");

        pool.execute("CREATE TABLE stage (id INTEGER PRIMARY KEY, km REAL)")
            .await
            .expect("Failed to create table");
        pool.execute("INSERT INTO stage (km) VALUES (42.5), (61.0)")
            .await
            .expect("Failed to insert");

        let affected = pool
            .execute("UPDATE stage SET km = km + 1")
            .await
            .expect("Failed to update");
        assert_eq!(affected, 2);
    }

    #[tokio::test]
    async fn test_sqlite_file_in_nested_directory() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("data").join("nested").join("sattl.db");

        let pool = create_pool(&sqlite_config(db_path.to_string_lossy()))
            .await
            .expect("Failed to create pool");
        pool.ping().await.expect("Ping should succeed");

        assert!(db_path.exists());
    }

    #[tokio::test]
    async fn test_in_memory_pool_keeps_schema_between_queries() {
        let pool = create_test_pool().await.expect("Failed to create test pool");

        pool.execute("CREATE TABLE trail (id INTEGER PRIMARY KEY, name TEXT)")
            .await
            .expect("Failed to create table");

        for name in ["Albtrauf", "Donautal", "Lautertal"] {
            sqlx::query("INSERT INTO trail (name) VALUES (?)")
                .bind(name)
                .execute(pool.sqlite().unwrap())
                .await
                .expect("Failed to insert");
        }

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM trail")
            .fetch_one(pool.sqlite().unwrap())
            .await
            .expect("Failed to count");
        assert_eq!(count, 3);
    }

    #[tokio::test]
    async fn test_foreign_keys_enabled() {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        let enabled: i64 = sqlx::query_scalar("PRAGMA foreign_keys")
            .fetch_one(pool.sqlite().unwrap())
            .await
            .expect("Failed to read pragma");
        assert_eq!(enabled, 1);
    }

    #[tokio::test]
    async fn test_pool_close() {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        pool.close().await;
        assert!(pool.ping().await.is_err());
    }

    // Point MYSQL_TEST_URL at a running server to run this.
    #[tokio::test]
    #[ignore = "Requires MySQL server"]
    async fn test_mysql_pool_creation() {
        let url = std::env::var("MYSQL_TEST_URL")
            .unwrap_or_else(|_| "mysql://root@localhost/sattl_test".to_string());

        let pool = create_pool(&DatabaseConfig {
            driver: DatabaseDriver::Mysql,
            url,
        })
        .await
        .expect("Failed to create pool");

        assert_eq!(pool.driver(), DatabaseDriver::Mysql);
        pool.ping().await.expect("Ping should succeed");
    }
}
