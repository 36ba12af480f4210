// Repository module structure
pub mod errors;
mod in_memory;
#[cfg(feature = "sqlite")]
mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[cfg(any(test, feature = "mock"))]
use mockall::automock;

use crate::models::{RecordQuery, StoredRecord, StoredUser};

// Re-export commonly used types
pub use errors::RepositoryError;
pub use in_memory::InMemoryStorage;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStorage;

/// Repository trait for blood pressure records
#[cfg_attr(any(test, feature = "mock"), automock)]
#[async_trait]
pub trait BloodPressureRepositoryTrait: Send + Sync {
    /// Persist a new record
    async fn insert(&self, record: StoredRecord) -> Result<StoredRecord, RepositoryError>;

    /// Get a record by ID
    async fn get_by_id(&self, id: &str) -> Result<Option<StoredRecord>, RepositoryError>;

    /// Replace an existing record; `None` when no record has that ID
    async fn update(&self, record: StoredRecord) -> Result<Option<StoredRecord>, RepositoryError>;

    /// Delete a record, returning what was removed
    async fn delete(&self, id: &str) -> Result<Option<StoredRecord>, RepositoryError>;

    /// Find records matching a query, newest first, with the total match count
    async fn find(&self, query: &RecordQuery) -> Result<(Vec<StoredRecord>, usize), RepositoryError>;

    /// Count records across all users, optionally only those created since a point in time
    async fn count_all(&self, created_since: Option<DateTime<Utc>>) -> Result<usize, RepositoryError>;

    /// Delete every record owned by a user, returning how many were removed
    async fn delete_for_user(&self, user_id: &str) -> Result<usize, RepositoryError>;

    /// Verify that the backing store is reachable
    async fn ping(&self) -> Result<(), RepositoryError>;
}

/// Repository trait for user documents
#[cfg_attr(any(test, feature = "mock"), automock)]
#[async_trait]
pub trait UserRepositoryTrait: Send + Sync {
    /// Persist a new user
    async fn insert(&self, user: StoredUser) -> Result<StoredUser, RepositoryError>;

    /// Get a user by ID
    async fn get_by_id(&self, id: &str) -> Result<Option<StoredUser>, RepositoryError>;

    /// Get a user by external login identity
    async fn get_by_open_id(&self, open_id: &str) -> Result<Option<StoredUser>, RepositoryError>;

    /// Replace an existing user; `None` when no user has that ID
    async fn update(&self, user: StoredUser) -> Result<Option<StoredUser>, RepositoryError>;

    /// Delete a user, returning what was removed
    async fn delete(&self, id: &str) -> Result<Option<StoredUser>, RepositoryError>;

    /// List users, newest first, with the total count
    async fn list(&self, limit: usize, offset: usize) -> Result<(Vec<StoredUser>, usize), RepositoryError>;

    /// Count users whose last record date is at or after `since`
    async fn count_active_since(&self, since: DateTime<Utc>) -> Result<usize, RepositoryError>;

    /// Count users, optionally only those created since a point in time
    async fn count(&self, created_since: Option<DateTime<Utc>>) -> Result<usize, RepositoryError>;

    /// Users with the most records, most active first
    async fn top_by_records(&self, limit: usize) -> Result<Vec<StoredUser>, RepositoryError>;
}
