use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use pressure_log_domain::entities::UserSettings;

use crate::entities::user::UserResponse;

/// Login request payload
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    /// External login identity
    #[serde(alias = "open_id")]
    pub open_id: Option<String>,

    /// Display name, used when the user is created
    pub nickname: Option<String>,

    /// Avatar URL, used when the user is created
    pub avatar: Option<String>,
}

/// Login response payload
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    /// Signed access token
    pub token: String,

    /// Token type (Bearer)
    pub token_type: String,

    /// Lifetime of the token in seconds
    pub expires_in: i64,

    pub user: UserResponse,

    /// True until the user stores a first record
    pub is_new_user: bool,
}

/// Settings replacement payload
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SettingsRequest {
    pub settings: UserSettings,
}
