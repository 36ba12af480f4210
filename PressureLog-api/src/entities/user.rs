use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use pressure_log_domain::entities::{User, UserSettings, UserStatus};
use pressure_log_domain::services::{SystemStats, UserPage};

use crate::entities::common::Pagination;

/// Denormalized record statistics of a user
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserStatsResponse {
    pub total_records: i64,
    pub average_systolic: Option<i32>,
    pub average_diastolic: Option<i32>,
    pub last_record_date: Option<DateTime<Utc>>,
}

/// Public representation of a user. The external login identity is never exposed.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub nickname: String,
    pub avatar: String,
    pub settings: UserSettings,
    pub stats: UserStatsResponse,
    /// Engagement derived from the last record date
    pub status: UserStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserResponse {
    pub fn new(user: User, now: DateTime<Utc>) -> Self {
        let status = user.status(now);
        Self {
            id: user.id,
            nickname: user.nickname,
            avatar: user.avatar,
            settings: user.settings,
            stats: UserStatsResponse {
                total_records: user.stats.total_records,
                average_systolic: user.stats.average_systolic,
                average_diastolic: user.stats.average_diastolic,
                last_record_date: user.stats.last_record_date,
            },
            status,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Query parameters for listing users
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListUsersParams {
    /// Page number, 1-based (default 1)
    pub page: Option<u32>,
    /// Page size (default 20, at most 100)
    pub limit: Option<u32>,
}

/// One page of users
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserListResponse {
    pub users: Vec<UserResponse>,
    pub pagination: Pagination,
}

impl UserListResponse {
    pub fn new(page: UserPage, now: DateTime<Utc>) -> Self {
        Self {
            pagination: Pagination {
                current: page.page,
                page_size: page.limit,
                total: page.total,
                total_pages: page.total_pages,
            },
            users: page.users.into_iter().map(|user| UserResponse::new(user, now)).collect(),
        }
    }
}

/// Result of deleting a user
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserDeletedResponse {
    pub id: String,
    /// Records removed along with the user
    pub deleted_records: usize,
}

/// Entry in the most-active users list
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActiveUserResponse {
    pub nickname: String,
    pub total_records: i64,
    pub last_active: Option<DateTime<Utc>>,
}

/// System-wide usage figures
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SystemStatsResponse {
    pub total_users: usize,
    /// Users with a record in the last 7 days
    pub active_users: usize,
    pub new_users_this_week: usize,
    pub total_records: usize,
    pub records_this_week: usize,
    pub average_records_per_user: f64,
    pub top_active_users: Vec<ActiveUserResponse>,
}

impl From<SystemStats> for SystemStatsResponse {
    fn from(stats: SystemStats) -> Self {
        Self {
            total_users: stats.total_users,
            active_users: stats.active_users,
            new_users_this_week: stats.new_users_this_week,
            total_records: stats.total_records,
            records_this_week: stats.records_this_week,
            average_records_per_user: stats.average_records_per_user,
            top_active_users: stats
                .top_active_users
                .into_iter()
                .map(|u| ActiveUserResponse {
                    nickname: u.nickname,
                    total_records: u.total_records,
                    last_active: u.last_active,
                })
                .collect(),
        }
    }
}
