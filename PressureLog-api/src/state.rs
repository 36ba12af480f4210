//! Shared application state handed to every handler

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use pressure_log_data::database::{initialize_database_pool, DatabaseError};
use pressure_log_data::repository::{
    BloodPressureRepositoryTrait, InMemoryStorage, SqliteStorage, UserRepositoryTrait,
};
use pressure_log_domain::auth::{SecurityError, TokenConfig};
use pressure_log_domain::health::{HealthService, HealthServiceTrait, StorageKind};
use pressure_log_domain::services::{
    BloodPressureService, BloodPressureServiceTrait, UserService, UserServiceTrait,
};

use crate::config::{AppConfig, StorageBackend};

/// Errors raised while wiring the application together
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Security(#[from] SecurityError),
}

/// Storage handles for both repositories plus the adapter kind
pub struct Storage {
    pub records: Arc<dyn BloodPressureRepositoryTrait>,
    pub users: Arc<dyn UserRepositoryTrait>,
    pub kind: StorageKind,
}

impl Storage {
    /// Process-local storage
    pub fn in_memory() -> Self {
        let storage = InMemoryStorage::new();
        Self {
            records: Arc::new(storage.clone()),
            users: Arc::new(storage),
            kind: StorageKind::Memory,
        }
    }

    /// Open the adapter named by the configuration
    pub fn from_config(config: &AppConfig) -> Result<Self, DatabaseError> {
        match config.storage_backend {
            StorageBackend::Memory => {
                info!("Using in-memory storage");
                Ok(Self::in_memory())
            }
            StorageBackend::Sqlite => {
                let pool = initialize_database_pool(&config.database)?;
                info!("Using {}", pool.connection_info());
                let storage = SqliteStorage::new(pool);
                Ok(Self {
                    records: Arc::new(storage.clone()),
                    users: Arc::new(storage),
                    kind: StorageKind::Sqlite,
                })
            }
        }
    }
}

/// State shared by every route
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub records: Arc<dyn BloodPressureServiceTrait>,
    pub users: Arc<dyn UserServiceTrait>,
    pub health: Arc<dyn HealthServiceTrait>,
    pub tokens: Arc<TokenConfig>,
}

impl AppState {
    /// Build the services over the given storage
    pub fn new(config: AppConfig, storage: Storage) -> Result<Self, StartupError> {
        let tokens = TokenConfig::new(
            config.jwt_secret.clone(),
            config.jwt_issuer.clone(),
            config.token_expiration_minutes,
        )?;

        Ok(Self {
            records: Arc::new(BloodPressureService::new(storage.records.clone(), storage.users.clone())),
            users: Arc::new(UserService::new(storage.users, storage.records.clone())),
            health: Arc::new(HealthService::new(storage.records, storage.kind)),
            tokens: Arc::new(tokens),
            config: Arc::new(config),
        })
    }

    /// Open the configured storage and build the services over it
    pub fn from_config(config: AppConfig) -> Result<Self, StartupError> {
        let storage = Storage::from_config(&config)?;
        Self::new(config, storage)
    }
}
