use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use pressure_log_data::repository::{BloodPressureRepositoryTrait, UserRepositoryTrait};

use crate::entities::conversions::{convert_to_data_user, convert_to_domain_user};
use crate::entities::user::{User, UserSettings, UserStats};
use crate::services::blood_pressure::{map_repo_error, ServiceError};
use crate::services::validation::format_validation_errors;

/// Nickname given to users who log in without one
pub const DEFAULT_NICKNAME: &str = "User";

/// Number of users reported in the most-active list
pub const TOP_ACTIVE_USERS: usize = 5;

/// Login details from the client
#[derive(Debug, Clone, Default, PartialEq, Eq, Validate)]
pub struct LoginInput {
    #[validate(length(min = 1, message = "open_id is required"))]
    pub open_id: String,
    #[validate(length(max = 50, message = "Nickname cannot exceed 50 characters"))]
    pub nickname: Option<String>,
    pub avatar: Option<String>,
}

/// Result of a login: the user and whether they have recorded anything yet
#[derive(Debug, Clone, PartialEq)]
pub struct LoginOutcome {
    pub user: User,
    pub is_new_user: bool,
}

/// One page of users
#[derive(Debug, Clone, PartialEq)]
pub struct UserPage {
    pub users: Vec<User>,
    pub page: u32,
    pub limit: u32,
    pub total: usize,
    pub total_pages: usize,
}

/// Entry in the most-active users list
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActiveUser {
    pub nickname: String,
    pub total_records: i64,
    pub last_active: Option<DateTime<Utc>>,
}

/// System-wide usage figures for administrators
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemStats {
    pub total_users: usize,
    /// Users with a record in the last 7 days
    pub active_users: usize,
    pub new_users_this_week: usize,
    pub total_records: usize,
    pub records_this_week: usize,
    /// Rounded to one decimal place
    pub average_records_per_user: f64,
    pub top_active_users: Vec<ActiveUser>,
}

/// Trait for user service operations
#[async_trait]
pub trait UserServiceTrait: Send + Sync {
    /// Find the user for an external identity, creating one on first login
    async fn login(&self, input: LoginInput) -> Result<LoginOutcome, ServiceError>;

    /// Get a user by ID
    async fn get(&self, id: &str) -> Result<User, ServiceError>;

    /// Replace a user's settings
    async fn update_settings(&self, id: &str, settings: UserSettings) -> Result<User, ServiceError>;

    /// Page through users, newest first
    async fn list(&self, page: u32, limit: u32) -> Result<UserPage, ServiceError>;

    /// Delete a user and every record they own; returns the number of records removed
    async fn delete(&self, id: &str) -> Result<usize, ServiceError>;

    /// Usage figures as of `now`
    async fn system_stats(&self, now: DateTime<Utc>) -> Result<SystemStats, ServiceError>;
}

/// User service backed by user and record repositories
pub struct UserService {
    users: Arc<dyn UserRepositoryTrait>,
    records: Arc<dyn BloodPressureRepositoryTrait>,
}

impl UserService {
    /// Create a new user service
    pub fn new(users: Arc<dyn UserRepositoryTrait>, records: Arc<dyn BloodPressureRepositoryTrait>) -> Self {
        Self { users, records }
    }

    fn not_found(id: &str) -> ServiceError {
        ServiceError::NotFound(format!("User {} not found", id))
    }

    async fn save(&self, user: &User) -> Result<User, ServiceError> {
        let stored = convert_to_data_user(user).map_err(|e| ServiceError::Storage(e.to_string()))?;
        let updated = self
            .users
            .update(stored)
            .await
            .map_err(map_repo_error)?
            .ok_or_else(|| Self::not_found(&user.id))?;
        Ok(convert_to_domain_user(updated))
    }
}

#[async_trait]
impl UserServiceTrait for UserService {
    async fn login(&self, input: LoginInput) -> Result<LoginOutcome, ServiceError> {
        if let Err(errors) = input.validate() {
            return Err(ServiceError::Validation(format_validation_errors(&errors)));
        }

        if let Some(existing) = self.users.get_by_open_id(&input.open_id).await.map_err(map_repo_error)? {
            let user = convert_to_domain_user(existing);
            info!("User {} logged in", user.id);
            return Ok(LoginOutcome {
                is_new_user: user.stats.total_records == 0,
                user,
            });
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4().to_string(),
            open_id: input.open_id,
            nickname: input
                .nickname
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_NICKNAME.to_string()),
            avatar: input.avatar.unwrap_or_default(),
            settings: UserSettings::default(),
            stats: UserStats::default(),
            created_at: now,
            updated_at: now,
        };

        let stored = convert_to_data_user(&user).map_err(|e| ServiceError::Storage(e.to_string()))?;
        let created = self.users.insert(stored).await.map_err(map_repo_error)?;

        info!("Created user {} on first login", created.id);
        Ok(LoginOutcome {
            user: convert_to_domain_user(created),
            is_new_user: true,
        })
    }

    async fn get(&self, id: &str) -> Result<User, ServiceError> {
        self.users
            .get_by_id(id)
            .await
            .map_err(map_repo_error)?
            .map(convert_to_domain_user)
            .ok_or_else(|| Self::not_found(id))
    }

    async fn update_settings(&self, id: &str, settings: UserSettings) -> Result<User, ServiceError> {
        let mut user = self.get(id).await?;

        for time in &settings.reminders.times {
            if !is_clock_time(time) {
                warn!("Rejected reminder time '{}' for user {}", time, id);
                return Err(ServiceError::Validation(vec![format!(
                    "Reminder time '{}' must be formatted as HH:MM",
                    time
                )]));
            }
        }

        user.settings = settings;
        user.updated_at = Utc::now();
        self.save(&user).await
    }

    async fn list(&self, page: u32, limit: u32) -> Result<UserPage, ServiceError> {
        let page = page.max(1);
        let limit = limit.clamp(1, crate::services::blood_pressure::MAX_PAGE_SIZE);
        let offset = (page as usize - 1) * limit as usize;

        let (stored, total) = self.users.list(limit as usize, offset).await.map_err(map_repo_error)?;

        Ok(UserPage {
            users: stored.into_iter().map(convert_to_domain_user).collect(),
            page,
            limit,
            total,
            total_pages: (total + limit as usize - 1) / limit as usize,
        })
    }

    async fn delete(&self, id: &str) -> Result<usize, ServiceError> {
        self.get(id).await?;

        // Records go first so a failed cascade never leaves them without an owner
        let removed = self.records.delete_for_user(id).await.map_err(map_repo_error)?;

        self.users
            .delete(id)
            .await
            .map_err(map_repo_error)?
            .ok_or_else(|| Self::not_found(id))?;

        info!("Deleted user {} and {} records", id, removed);
        Ok(removed)
    }

    async fn system_stats(&self, now: DateTime<Utc>) -> Result<SystemStats, ServiceError> {
        let week_ago = now - Duration::days(7);

        let total_users = self.users.count(None).await.map_err(map_repo_error)?;
        let active_users = self.users.count_active_since(week_ago).await.map_err(map_repo_error)?;
        let new_users_this_week = self.users.count(Some(week_ago)).await.map_err(map_repo_error)?;
        let total_records = self.records.count_all(None).await.map_err(map_repo_error)?;
        let records_this_week = self.records.count_all(Some(week_ago)).await.map_err(map_repo_error)?;
        let top = self.users.top_by_records(TOP_ACTIVE_USERS).await.map_err(map_repo_error)?;

        let average_records_per_user = if total_users > 0 {
            (total_records as f64 / total_users as f64 * 10.0).round() / 10.0
        } else {
            0.0
        };

        Ok(SystemStats {
            total_users,
            active_users,
            new_users_this_week,
            total_records,
            records_this_week,
            average_records_per_user,
            top_active_users: top
                .into_iter()
                .map(|u| ActiveUser {
                    nickname: u.nickname,
                    total_records: u.total_records,
                    last_active: u.last_record_date,
                })
                .collect(),
        })
    }
}

/// `HH:MM` on a 24-hour clock
fn is_clock_time(value: &str) -> bool {
    match value.split_once(':') {
        Some((h, m)) if h.len() == 2 && m.len() == 2 => {
            matches!((h.parse::<u32>(), m.parse::<u32>()), (Ok(h), Ok(m)) if h < 24 && m < 60)
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::record::NewRecord;
    use crate::services::blood_pressure::{BloodPressureService, BloodPressureServiceTrait};
    use pressure_log_data::repository::{InMemoryStorage, MockBloodPressureRepositoryTrait, RepositoryError};

    fn services() -> (UserService, BloodPressureService) {
        let storage = InMemoryStorage::new();
        let users = UserService::new(Arc::new(storage.clone()), Arc::new(storage.clone()));
        let records = BloodPressureService::new(Arc::new(storage.clone()), Arc::new(storage));
        (users, records)
    }

    fn login_as(open_id: &str) -> LoginInput {
        LoginInput {
            open_id: open_id.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_login_creates_then_finds() {
        let (users, _) = services();

        let first = users.login(login_as("wx-1")).await.unwrap();
        assert!(first.is_new_user);
        assert_eq!(first.user.nickname, DEFAULT_NICKNAME);

        let second = users.login(login_as("wx-1")).await.unwrap();
        assert_eq!(second.user.id, first.user.id);
        // Still no records
        assert!(second.is_new_user);
    }

    #[tokio::test]
    async fn test_login_requires_open_id() {
        let (users, _) = services();
        let err = users.login(login_as("")).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(errors) if errors == vec!["open_id is required".to_string()]));
    }

    #[tokio::test]
    async fn test_returning_user_with_records_is_not_new() {
        let (users, records) = services();
        let login = users.login(login_as("wx-1")).await.unwrap();
        records.create(&login.user.id, NewRecord::with_values(120, 80)).await.unwrap();

        let again = users.login(login_as("wx-1")).await.unwrap();
        assert!(!again.is_new_user);
        assert_eq!(again.user.stats.total_records, 1);
    }

    #[tokio::test]
    async fn test_update_settings() {
        let (users, _) = services();
        let user = users.login(login_as("wx-1")).await.unwrap().user;

        let mut settings = UserSettings::default();
        settings.reminders.enabled = true;
        settings.reminders.times = vec!["08:00".to_string(), "21:30".to_string()];
        let updated = users.update_settings(&user.id, settings.clone()).await.unwrap();
        assert_eq!(updated.settings, settings);

        settings.reminders.times = vec!["8am".to_string()];
        assert!(matches!(
            users.update_settings(&user.id, settings).await,
            Err(ServiceError::Validation(_))
        ));

        assert!(matches!(
            users.update_settings("missing", UserSettings::default()).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_cascades_records() {
        let (users, records) = services();
        let alice = users.login(login_as("wx-alice")).await.unwrap().user;
        let bob = users.login(login_as("wx-bob")).await.unwrap().user;
        records.create(&alice.id, NewRecord::with_values(120, 80)).await.unwrap();
        records.create(&alice.id, NewRecord::with_values(125, 82)).await.unwrap();
        records.create(&bob.id, NewRecord::with_values(130, 85)).await.unwrap();

        assert_eq!(users.delete(&alice.id).await.unwrap(), 2);
        assert!(matches!(users.get(&alice.id).await, Err(ServiceError::NotFound(_))));
        assert!(matches!(users.delete(&alice.id).await, Err(ServiceError::NotFound(_))));

        let stats = users.system_stats(Utc::now()).await.unwrap();
        assert_eq!(stats.total_users, 1);
        assert_eq!(stats.total_records, 1);
    }

    #[tokio::test]
    async fn test_failed_cascade_keeps_user() {
        let storage = InMemoryStorage::new();
        let mut records = MockBloodPressureRepositoryTrait::new();
        records
            .expect_delete_for_user()
            .returning(|_| Err(RepositoryError::Unavailable("connection refused".to_string())));
        let users = UserService::new(Arc::new(storage), Arc::new(records));

        let alice = users.login(login_as("wx-alice")).await.unwrap().user;
        assert!(matches!(users.delete(&alice.id).await, Err(ServiceError::Unavailable(_))));
        assert_eq!(users.get(&alice.id).await.unwrap().id, alice.id);
    }

    #[tokio::test]
    async fn test_system_stats() {
        let (users, records) = services();
        for n in 0..3 {
            let user = users.login(login_as(&format!("wx-{}", n))).await.unwrap().user;
            for _ in 0..=n {
                records.create(&user.id, NewRecord::with_values(120, 80)).await.unwrap();
            }
        }
        users.login(login_as("wx-idle")).await.unwrap();

        let stats = users.system_stats(Utc::now()).await.unwrap();
        assert_eq!(stats.total_users, 4);
        assert_eq!(stats.active_users, 3);
        assert_eq!(stats.new_users_this_week, 4);
        assert_eq!(stats.total_records, 6);
        assert_eq!(stats.records_this_week, 6);
        assert_eq!(stats.average_records_per_user, 1.5);
        assert_eq!(stats.top_active_users[0].total_records, 3);
        assert_eq!(stats.top_active_users.len(), 4);
    }

    #[tokio::test]
    async fn test_list_pages_users() {
        let (users, _) = services();
        for n in 0..3 {
            users.login(login_as(&format!("wx-{}", n))).await.unwrap();
        }

        let page = users.list(2, 2).await.unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.users.len(), 1);
    }

    #[test]
    fn test_clock_time_format() {
        assert!(is_clock_time("00:00"));
        assert!(is_clock_time("23:59"));
        assert!(!is_clock_time("24:00"));
        assert!(!is_clock_time("8:00"));
        assert!(!is_clock_time("08:60"));
    }
}
