//! Domain layer health check functionality

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tracing::warn;

use pressure_log_data::repository::BloodPressureRepositoryTrait;

/// Which storage adapter backs the service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    /// Process-local maps; nothing to connect to
    Memory,
    /// SQLite through a connection pool
    Sqlite,
}

/// Reported database state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DatabaseStatus {
    Connected,
    Disconnected,
    /// The in-memory adapter is in use
    Memory,
}

/// System health status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemStatus {
    /// All components are healthy
    Healthy,
    /// Some components are degraded but the system can still answer
    Degraded,
}

/// Overall health of the system
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemHealth {
    pub status: SystemStatus,
    pub database: DatabaseStatus,
    /// Why the database is not connected, if it is not
    pub details: Option<String>,
}

/// Trait for health services
#[async_trait]
pub trait HealthServiceTrait: Send + Sync {
    /// Get the overall system health
    async fn get_system_health(&self) -> SystemHealth;
}

/// Health checks against the configured store
pub struct HealthService {
    records: Arc<dyn BloodPressureRepositoryTrait>,
    kind: StorageKind,
}

impl HealthService {
    pub fn new(records: Arc<dyn BloodPressureRepositoryTrait>, kind: StorageKind) -> Self {
        Self { records, kind }
    }
}

#[async_trait]
impl HealthServiceTrait for HealthService {
    async fn get_system_health(&self) -> SystemHealth {
        match (self.kind, self.records.ping().await) {
            (StorageKind::Memory, Ok(())) => SystemHealth {
                status: SystemStatus::Healthy,
                database: DatabaseStatus::Memory,
                details: None,
            },
            (StorageKind::Sqlite, Ok(())) => SystemHealth {
                status: SystemStatus::Healthy,
                database: DatabaseStatus::Connected,
                details: None,
            },
            (_, Err(e)) => {
                warn!("Database health check failed: {}", e);
                SystemHealth {
                    status: SystemStatus::Degraded,
                    database: DatabaseStatus::Disconnected,
                    details: Some(e.to_string()),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pressure_log_data::repository::{InMemoryStorage, MockBloodPressureRepositoryTrait, RepositoryError};

    #[tokio::test]
    async fn test_memory_backend_reports_memory() {
        let service = HealthService::new(Arc::new(InMemoryStorage::new()), StorageKind::Memory);
        let health = service.get_system_health().await;
        assert_eq!(health.status, SystemStatus::Healthy);
        assert_eq!(health.database, DatabaseStatus::Memory);
    }

    #[tokio::test]
    async fn test_failed_ping_reports_disconnected() {
        let mut records = MockBloodPressureRepositoryTrait::new();
        records
            .expect_ping()
            .returning(|| Err(RepositoryError::Unavailable("pool timed out".to_string())));

        let service = HealthService::new(Arc::new(records), StorageKind::Sqlite);
        let health = service.get_system_health().await;
        assert_eq!(health.status, SystemStatus::Degraded);
        assert_eq!(health.database, DatabaseStatus::Disconnected);
        assert!(health.details.unwrap().contains("pool timed out"));
    }
}
