use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

#[cfg(feature = "with-api")]
use utoipa::ToSchema;

/// Inclusive range of acceptable values (mmHg)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct ValueRange {
    pub min: i32,
    pub max: i32,
}

impl ValueRange {
    /// Whether `value` lies within the range, bounds included
    pub fn contains(&self, value: i32) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Per-user normal blood pressure range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct NormalRange {
    pub systolic: ValueRange,
    pub diastolic: ValueRange,
}

impl Default for NormalRange {
    fn default() -> Self {
        Self {
            systolic: ValueRange { min: 90, max: 140 },
            diastolic: ValueRange { min: 60, max: 90 },
        }
    }
}

/// Measurement reminder settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct Reminders {
    pub enabled: bool,
    /// Times of day formatted as `HH:MM`
    #[serde(default)]
    pub times: Vec<String>,
}

/// Data sharing preference
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct DataSharing {
    pub enabled: bool,
}

/// User settings. Missing sections fall back to their defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
#[serde(default, rename_all = "camelCase")]
pub struct UserSettings {
    pub normal_range: NormalRange,
    pub reminders: Reminders,
    pub data_sharing: DataSharing,
}

/// Denormalized per-user record statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStats {
    pub total_records: i64,
    pub average_systolic: Option<i32>,
    pub average_diastolic: Option<i32>,
    pub last_record_date: Option<DateTime<Utc>>,
}

/// Engagement status derived from the last record date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    /// No records yet
    New,
    /// Recorded today
    Active,
    /// Recorded within the last week
    Regular,
    Inactive,
}

/// Domain entity for a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    /// External login identity
    pub open_id: String,
    pub nickname: String,
    pub avatar: String,
    pub settings: UserSettings,
    pub stats: UserStats,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Status as of `now`, counted in whole days since the last record
    pub fn status(&self, now: DateTime<Utc>) -> UserStatus {
        match self.stats.last_record_date {
            None => UserStatus::New,
            Some(last) => match (now - last).num_days() {
                0 => UserStatus::Active,
                days if days <= 7 => UserStatus::Regular,
                _ => UserStatus::Inactive,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn user(last_record_date: Option<DateTime<Utc>>) -> User {
        let now = Utc::now();
        User {
            id: "u1".to_string(),
            open_id: "wx-1".to_string(),
            nickname: "Tester".to_string(),
            avatar: String::new(),
            settings: UserSettings::default(),
            stats: UserStats {
                last_record_date,
                ..Default::default()
            },
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_user_status() {
        let now = Utc::now();
        assert_eq!(user(None).status(now), UserStatus::New);
        assert_eq!(user(Some(now - Duration::hours(5))).status(now), UserStatus::Active);
        assert_eq!(user(Some(now - Duration::days(7))).status(now), UserStatus::Regular);
        assert_eq!(user(Some(now - Duration::days(8))).status(now), UserStatus::Inactive);
    }

    #[test]
    fn test_partial_settings_fill_defaults() {
        let settings: UserSettings =
            serde_json::from_str(r#"{"reminders": {"enabled": true, "times": ["08:00", "20:00"]}}"#).unwrap();

        assert!(settings.reminders.enabled);
        assert_eq!(settings.reminders.times.len(), 2);
        assert_eq!(settings.normal_range, NormalRange::default());
        assert!(!settings.data_sharing.enabled);
    }
}
