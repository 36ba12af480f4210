use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::models::{RecordQuery, StoredRecord, StoredUser};
use super::errors::RepositoryError;
use super::{BloodPressureRepositoryTrait, UserRepositoryTrait};

/// In-memory storage for records and users.
///
/// Selected explicitly for development and tests. Clones share the same maps.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStorage {
    /// Blood pressure records keyed by ID
    records: Arc<RwLock<HashMap<String, StoredRecord>>>,

    /// Users keyed by ID
    users: Arc<RwLock<HashMap<String, StoredUser>>>,
}

impl InMemoryStorage {
    /// Create a new, empty in-memory storage
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first(records: &mut [StoredRecord]) {
    records.sort_by(|a, b| b.measure_time.cmp(&a.measure_time).then_with(|| b.created_at.cmp(&a.created_at)));
}

#[async_trait]
impl BloodPressureRepositoryTrait for InMemoryStorage {
    async fn insert(&self, record: StoredRecord) -> Result<StoredRecord, RepositoryError> {
        let mut store = self.records.write()?;
        if store.contains_key(&record.id) {
            return Err(RepositoryError::Duplicate(record.id));
        }
        debug!("Storing blood pressure record in memory: {}", record.id);
        store.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<StoredRecord>, RepositoryError> {
        let store = self.records.read()?;
        Ok(store.get(id).cloned())
    }

    async fn update(&self, record: StoredRecord) -> Result<Option<StoredRecord>, RepositoryError> {
        let mut store = self.records.write()?;
        match store.get_mut(&record.id) {
            Some(existing) => {
                *existing = record.clone();
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, id: &str) -> Result<Option<StoredRecord>, RepositoryError> {
        let mut store = self.records.write()?;
        Ok(store.remove(id))
    }

    async fn find(&self, query: &RecordQuery) -> Result<(Vec<StoredRecord>, usize), RepositoryError> {
        let store = self.records.read()?;

        let mut matching: Vec<StoredRecord> = store
            .values()
            .filter(|record| query.matches(record))
            .cloned()
            .collect();

        newest_first(&mut matching);

        let total = matching.len();
        let limit = query.limit.unwrap_or(total);
        let page = matching
            .into_iter()
            .skip(query.offset)
            .take(limit)
            .collect();

        Ok((page, total))
    }

    async fn count_all(&self, created_since: Option<DateTime<Utc>>) -> Result<usize, RepositoryError> {
        let store = self.records.read()?;
        let count = match created_since {
            Some(since) => store.values().filter(|r| r.created_at >= since).count(),
            None => store.len(),
        };
        Ok(count)
    }

    async fn delete_for_user(&self, user_id: &str) -> Result<usize, RepositoryError> {
        let mut store = self.records.write()?;
        let before = store.len();
        store.retain(|_, record| record.user_id != user_id);
        Ok(before - store.len())
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        // A poisoned lock is the only way this store can be unusable
        let _records = self.records.read()?;
        let _users = self.users.read()?;
        Ok(())
    }
}

#[async_trait]
impl UserRepositoryTrait for InMemoryStorage {
    async fn insert(&self, user: StoredUser) -> Result<StoredUser, RepositoryError> {
        let mut store = self.users.write()?;
        if store.values().any(|u| u.open_id == user.open_id) {
            return Err(RepositoryError::Duplicate(user.open_id));
        }
        store.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<StoredUser>, RepositoryError> {
        let store = self.users.read()?;
        Ok(store.get(id).cloned())
    }

    async fn get_by_open_id(&self, open_id: &str) -> Result<Option<StoredUser>, RepositoryError> {
        let store = self.users.read()?;
        Ok(store.values().find(|u| u.open_id == open_id).cloned())
    }

    async fn update(&self, user: StoredUser) -> Result<Option<StoredUser>, RepositoryError> {
        let mut store = self.users.write()?;
        match store.get_mut(&user.id) {
            Some(existing) => {
                *existing = user.clone();
                Ok(Some(user))
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, id: &str) -> Result<Option<StoredUser>, RepositoryError> {
        let mut store = self.users.write()?;
        Ok(store.remove(id))
    }

    async fn list(&self, limit: usize, offset: usize) -> Result<(Vec<StoredUser>, usize), RepositoryError> {
        let store = self.users.read()?;
        let mut users: Vec<StoredUser> = store.values().cloned().collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = users.len();
        let page = users.into_iter().skip(offset).take(limit).collect();
        Ok((page, total))
    }

    async fn count_active_since(&self, since: DateTime<Utc>) -> Result<usize, RepositoryError> {
        let store = self.users.read()?;
        Ok(store
            .values()
            .filter(|u| u.last_record_date.map_or(false, |d| d >= since))
            .count())
    }

    async fn count(&self, created_since: Option<DateTime<Utc>>) -> Result<usize, RepositoryError> {
        let store = self.users.read()?;
        let count = match created_since {
            Some(since) => store.values().filter(|u| u.created_at >= since).count(),
            None => store.len(),
        };
        Ok(count)
    }

    async fn top_by_records(&self, limit: usize) -> Result<Vec<StoredUser>, RepositoryError> {
        let store = self.users.read()?;
        let mut users: Vec<StoredUser> = store.values().cloned().collect();
        users.sort_by(|a, b| b.total_records.cmp(&a.total_records));
        users.truncate(limit);
        Ok(users)
    }
}
