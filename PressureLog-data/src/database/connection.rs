//! Database connection module for PressureLog
//!
//! Builds the SQLite connection pool used by [`crate::repository::SqliteStorage`].
//! The pool is created once at startup from an explicit [`DatabaseConfig`] and
//! handed to the storage adapter; nothing here keeps global state.

use std::env;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};

use super::migrations::run_migrations;

/// SQLite connection pool shared by the storage adapter
#[derive(Debug, Clone)]
pub struct DatabasePool {
    pool: Arc<r2d2::Pool<r2d2_sqlite::SqliteConnectionManager>>,
}

/// Database error
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// SQLite error
    #[error("SQLite error: {0}")]
    SqliteError(#[from] rusqlite::Error),

    /// SQLite connection pool error
    #[error("SQLite connection pool error: {0}")]
    SqlitePoolError(#[from] r2d2::Error),

    /// The database file location could not be prepared
    #[error("Failed to prepare database directory: {0}")]
    DirectoryError(#[from] std::io::Error),

    /// Migration error
    #[error("Database migration error: {0}")]
    MigrationError(String),
}

/// Database configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// Path to SQLite database file
    pub sqlite_path: String,
    /// Maximum number of connections
    pub max_connections: u32,
    /// Connection timeout in seconds
    pub timeout_seconds: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            sqlite_path: "data/pressure_log.db".to_string(),
            max_connections: 10,
            timeout_seconds: 30,
        }
    }
}

impl DatabaseConfig {
    /// Create a database configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Create a database configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let sqlite_path = lookup("DB_SQLITE_PATH").unwrap_or(defaults.sqlite_path);

        let max_connections = lookup("DB_MAX_CONNECTIONS")
            .and_then(|s| s.parse::<u32>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(defaults.max_connections);

        let timeout_seconds = lookup("DB_TIMEOUT_SECONDS")
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(defaults.timeout_seconds);

        Self {
            sqlite_path,
            max_connections,
            timeout_seconds,
        }
    }
}

impl DatabasePool {
    /// Borrow a pooled connection
    pub fn get(&self) -> Result<r2d2::PooledConnection<r2d2_sqlite::SqliteConnectionManager>, r2d2::Error> {
        self.pool.get()
    }

    /// Create a migrated, private in-memory database.
    ///
    /// Each in-memory SQLite connection is its own database, so the pool is
    /// limited to a single connection.
    pub fn in_memory() -> Result<Self, DatabaseError> {
        let manager = r2d2_sqlite::SqliteConnectionManager::memory();
        let pool = r2d2::Pool::builder().max_size(1).build(manager)?;

        let conn = pool.get()?;
        run_migrations(&conn)?;

        Ok(Self { pool: Arc::new(pool) })
    }

    /// Describe the connection for health reporting
    pub fn connection_info(&self) -> String {
        let state = self.pool.state();
        format!(
            "SQLite (connections: active={}, idle={})",
            state.connections, state.idle_connections
        )
    }
}

/// Initialize the SQLite connection pool and run migrations
pub fn initialize_database_pool(config: &DatabaseConfig) -> Result<DatabasePool, DatabaseError> {
    use rusqlite::OpenFlags;

    info!("Initializing SQLite database at: {}", config.sqlite_path);

    // Create parent directory if it doesn't exist
    if let Some(parent) = Path::new(&config.sqlite_path).parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            info!("Creating parent directory: {:?}", parent);
            std::fs::create_dir_all(parent)?;
        }
    }

    let manager = r2d2_sqlite::SqliteConnectionManager::file(&config.sqlite_path)
        .with_flags(OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE);

    let pool = r2d2::Pool::builder()
        .max_size(config.max_connections)
        .connection_timeout(Duration::from_secs(config.timeout_seconds))
        .build(manager)
        .map_err(|e| {
            error!("Failed to create SQLite connection pool: {}", e);
            DatabaseError::SqlitePoolError(e)
        })?;

    let conn = pool.get()?;
    run_migrations(&conn)?;

    info!("SQLite connection pool created successfully");
    Ok(DatabasePool { pool: Arc::new(pool) })
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_database_config_default() {
        let config = DatabaseConfig::default();
        assert_eq!(config.sqlite_path, "data/pressure_log.db");
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.timeout_seconds, 30);
    }

    #[test]
    fn test_database_config_from_lookup() {
        let vars: HashMap<&str, &str> = [
            ("DB_SQLITE_PATH", "/tmp/bp.db"),
            ("DB_MAX_CONNECTIONS", "4"),
            ("DB_TIMEOUT_SECONDS", "not-a-number"),
        ]
        .into_iter()
        .collect();

        let config = DatabaseConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.sqlite_path, "/tmp/bp.db");
        assert_eq!(config.max_connections, 4);
        // Unparseable values fall back to the default
        assert_eq!(config.timeout_seconds, 30);
    }

    #[test]
    fn test_in_memory_pool_is_migrated() {
        let pool = DatabasePool::in_memory().unwrap();
        let conn = pool.get().unwrap();

        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN ('blood_pressure_records', 'users')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 2);
        assert!(pool.connection_info().starts_with("SQLite"));
    }
}
