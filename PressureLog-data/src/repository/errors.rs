use std::sync::PoisonError;
use thiserror::Error;

#[cfg(feature = "sqlite")]
use crate::database::DatabaseError;

/// Error type for repository operations
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// Database setup or connectivity error
    #[cfg(feature = "sqlite")]
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// SQLite error
    #[cfg(feature = "sqlite")]
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Lock error
    #[error("Lock error: {0}")]
    Lock(String),

    /// A stored document could not be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Unique constraint violated
    #[error("Duplicate entry: {0}")]
    Duplicate(String),

    /// Backing store cannot be reached
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

impl RepositoryError {
    /// Whether the store could not be reached, as opposed to rejecting the operation
    pub fn is_unavailable(&self) -> bool {
        match self {
            RepositoryError::Unavailable(_) => true,
            #[cfg(feature = "sqlite")]
            RepositoryError::Database(err) => match err {
                DatabaseError::SqliteError(err) => is_connection_failure(err),
                DatabaseError::SqlitePoolError(_) | DatabaseError::DirectoryError(_) => true,
                DatabaseError::MigrationError(_) => false,
            },
            #[cfg(feature = "sqlite")]
            RepositoryError::Sqlite(err) => is_connection_failure(err),
            _ => false,
        }
    }
}

/// SQLite result codes raised when the database file cannot be used at all
#[cfg(feature = "sqlite")]
fn is_connection_failure(err: &rusqlite::Error) -> bool {
    use rusqlite::ErrorCode;

    match err {
        rusqlite::Error::SqliteFailure(failure, _) => matches!(
            failure.code,
            ErrorCode::CannotOpen
                | ErrorCode::DatabaseBusy
                | ErrorCode::DatabaseLocked
                | ErrorCode::SystemIoFailure
                | ErrorCode::NotADatabase
        ),
        _ => false,
    }
}

// A checkout that times out means the store is unreachable
impl From<r2d2::Error> for RepositoryError {
    fn from(error: r2d2::Error) -> Self {
        RepositoryError::Unavailable(format!("connection pool: {}", error))
    }
}

impl<T> From<PoisonError<T>> for RepositoryError {
    fn from(error: PoisonError<T>) -> Self {
        RepositoryError::Lock(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_connectivity_failures_are_unavailable() {
        assert!(RepositoryError::Unavailable("down".to_string()).is_unavailable());
        assert!(!RepositoryError::Duplicate("open_id".to_string()).is_unavailable());
        assert!(!RepositoryError::Lock("poisoned".to_string()).is_unavailable());

        let bad_json = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(!RepositoryError::from(bad_json).is_unavailable());
    }

    #[cfg(feature = "sqlite")]
    #[test]
    fn test_sqlite_codes() {
        use rusqlite::ffi;

        let busy = rusqlite::Error::SqliteFailure(ffi::Error::new(ffi::SQLITE_BUSY), None);
        assert!(RepositoryError::from(busy).is_unavailable());

        let constraint = rusqlite::Error::SqliteFailure(ffi::Error::new(ffi::SQLITE_CONSTRAINT), None);
        assert!(!RepositoryError::from(constraint).is_unavailable());

        assert!(!RepositoryError::from(rusqlite::Error::QueryReturnedNoRows).is_unavailable());
    }
}
