use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

/// Storage model for a user document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredUser {
    /// Unique identifier for the user
    pub id: String,

    /// External login identity; unique across users
    pub open_id: String,

    /// Display name
    pub nickname: String,

    /// Avatar URL (may be empty)
    pub avatar: String,

    /// User settings as a JSON document
    pub settings: serde_json::Value,

    /// Denormalized number of records owned by the user
    pub total_records: i64,

    /// Rounded average systolic over the most recent records
    pub average_systolic: Option<i32>,

    /// Rounded average diastolic over the most recent records
    pub average_diastolic: Option<i32>,

    /// When the stats were last refreshed after a record change
    pub last_record_date: Option<DateTime<Utc>>,

    /// When the user was created
    pub created_at: DateTime<Utc>,

    /// When the user was last updated
    pub updated_at: DateTime<Utc>,
}
