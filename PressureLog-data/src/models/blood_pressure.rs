use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

/// Storage model for a blood pressure record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    /// Unique identifier for the record
    pub id: String,

    /// Owning user
    pub user_id: String,

    /// Systolic blood pressure (mmHg)
    pub systolic: i32,

    /// Diastolic blood pressure (mmHg)
    pub diastolic: i32,

    /// When the measurement was taken
    pub measure_time: DateTime<Utc>,

    /// Activity before the measurement, stored as its wire name
    pub activity: String,

    /// Emotional state before the measurement, stored as its wire name
    pub emotion: String,

    /// Optional free-text notes
    pub notes: Option<String>,

    /// Where the record came from (manual, device, import)
    pub source: String,

    /// Measuring device name, when the source is a device
    pub device_name: Option<String>,

    /// Measuring device model, when the source is a device
    pub device_model: Option<String>,

    /// When the record was created
    pub created_at: DateTime<Utc>,

    /// When the record was last updated
    pub updated_at: DateTime<Utc>,
}

/// Filter and paging options for record lookups.
///
/// `start` and `end` are inclusive bounds on `measure_time`. Results are
/// always ordered newest first; `limit = None` returns every match.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordQuery {
    /// Restrict to a single user
    pub user_id: String,

    /// Earliest measure time to include
    pub start: Option<DateTime<Utc>>,

    /// Latest measure time to include
    pub end: Option<DateTime<Utc>>,

    /// Maximum number of records to return
    pub limit: Option<usize>,

    /// Number of matching records to skip
    pub offset: usize,
}

impl RecordQuery {
    /// Every record belonging to a user
    pub fn for_user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            ..Default::default()
        }
    }

    /// Restrict to measurements taken at or after `start`
    pub fn since(mut self, start: DateTime<Utc>) -> Self {
        self.start = Some(start);
        self
    }

    /// Restrict to measurements taken at or before `end`
    pub fn until(mut self, end: DateTime<Utc>) -> Self {
        self.end = Some(end);
        self
    }

    /// Page the results
    pub fn page(mut self, limit: usize, offset: usize) -> Self {
        self.limit = Some(limit);
        self.offset = offset;
        self
    }

    /// Whether a record satisfies the user and time filters
    pub fn matches(&self, record: &StoredRecord) -> bool {
        if record.user_id != self.user_id {
            return false;
        }

        if let Some(start) = self.start {
            if record.measure_time < start {
                return false;
            }
        }

        if let Some(end) = self.end {
            if record.measure_time > end {
                return false;
            }
        }

        true
    }
}
