use serde::{Deserialize, Serialize};
use chrono::{DateTime, Timelike, Utc};
use validator::Validate;

#[cfg(feature = "with-api")]
use utoipa::ToSchema;

use crate::entities::user::NormalRange;
use crate::services::classification::{classify, Classification};

/// What the user was doing before the measurement
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum Activity {
    #[default]
    Rest,
    LightActivity,
    Exercise,
    Work,
    Other,
}

/// How the user felt before the measurement
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum Emotion {
    #[default]
    Calm,
    Stressed,
    Anxious,
    Happy,
    Tired,
}

/// Part of the day a measurement falls in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum TimeOfDay {
    Morning,
    Afternoon,
    Evening,
    Night,
}

/// Where a record came from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum Source {
    #[default]
    Manual,
    Device,
    Import,
}

impl Activity {
    /// Stored name of the activity
    pub fn as_str(&self) -> &'static str {
        match self {
            Activity::Rest => "rest",
            Activity::LightActivity => "light_activity",
            Activity::Exercise => "exercise",
            Activity::Work => "work",
            Activity::Other => "other",
        }
    }

    /// Parse a stored name, `None` for anything unknown
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "rest" => Some(Activity::Rest),
            "light_activity" => Some(Activity::LightActivity),
            "exercise" => Some(Activity::Exercise),
            "work" => Some(Activity::Work),
            "other" => Some(Activity::Other),
            _ => None,
        }
    }
}

impl Emotion {
    /// Stored name of the emotion
    pub fn as_str(&self) -> &'static str {
        match self {
            Emotion::Calm => "calm",
            Emotion::Stressed => "stressed",
            Emotion::Anxious => "anxious",
            Emotion::Happy => "happy",
            Emotion::Tired => "tired",
        }
    }

    /// Parse a stored name, `None` for anything unknown
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "calm" => Some(Emotion::Calm),
            "stressed" => Some(Emotion::Stressed),
            "anxious" => Some(Emotion::Anxious),
            "happy" => Some(Emotion::Happy),
            "tired" => Some(Emotion::Tired),
            _ => None,
        }
    }
}

impl Source {
    /// Stored name of the source
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Manual => "manual",
            Source::Device => "device",
            Source::Import => "import",
        }
    }

    /// Parse a stored name, `None` for anything unknown
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "manual" => Some(Source::Manual),
            "device" => Some(Source::Device),
            "import" => Some(Source::Import),
            _ => None,
        }
    }
}

impl TimeOfDay {
    /// Bucket an hour of the day (0-23)
    pub fn from_hour(hour: u32) -> Self {
        if hour < 12 {
            TimeOfDay::Morning
        } else if hour < 18 {
            TimeOfDay::Afternoon
        } else if hour < 22 {
            TimeOfDay::Evening
        } else {
            TimeOfDay::Night
        }
    }

    /// Bucket a measurement time by its UTC hour
    pub fn for_time(time: &DateTime<Utc>) -> Self {
        Self::from_hour(time.hour())
    }
}

/// Measuring device details
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct Device {
    /// Device name
    pub name: Option<String>,
    /// Device model
    pub model: Option<String>,
}

/// State before the measurement
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeforeMeasure {
    pub activity: Activity,
    pub emotion: Emotion,
}

/// Measurement context; `time_of_day` is always derived from the measure time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeasureContext {
    pub time_of_day: TimeOfDay,
    pub before_measure: BeforeMeasure,
}

/// Domain entity for a blood pressure record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BloodPressureRecord {
    /// Unique identifier, assigned at creation
    pub id: String,

    /// Owning user
    pub user_id: String,

    /// Systolic blood pressure (mmHg)
    pub systolic: i32,

    /// Diastolic blood pressure (mmHg)
    pub diastolic: i32,

    /// When the measurement was taken
    pub measure_time: DateTime<Utc>,

    /// Measurement context
    pub context: MeasureContext,

    /// Optional notes
    pub notes: Option<String>,

    /// Where the record came from
    pub source: Source,

    /// Device details, for device readings
    pub device: Option<Device>,

    /// When the record was created
    pub created_at: DateTime<Utc>,

    /// When the record was last updated
    pub updated_at: DateTime<Utc>,
}

impl BloodPressureRecord {
    /// Severity tier of this reading
    pub fn classification(&self) -> &'static Classification {
        classify(self.systolic, self.diastolic)
    }

    /// Systolic minus diastolic
    pub fn pulse_pressure(&self) -> i32 {
        self.systolic - self.diastolic
    }

    /// Mean arterial pressure, rounded to the nearest mmHg
    pub fn mean_arterial_pressure(&self) -> i32 {
        let map = self.diastolic as f64 + (self.systolic - self.diastolic) as f64 / 3.0;
        map.round() as i32
    }

    /// Whether either value falls outside the user's normal range
    pub fn is_abnormal(&self, range: &NormalRange) -> bool {
        !range.systolic.contains(self.systolic) || !range.diastolic.contains(self.diastolic)
    }
}

/// Input for a new record
#[derive(Debug, Clone, Default, PartialEq, Validate)]
pub struct NewRecord {
    pub systolic: i32,
    pub diastolic: i32,
    /// Defaults to the creation time when absent
    pub measure_time: Option<DateTime<Utc>>,
    pub activity: Option<Activity>,
    pub emotion: Option<Emotion>,
    #[validate(length(max = 200, message = "Notes cannot exceed 200 characters"))]
    pub notes: Option<String>,
    pub source: Option<Source>,
    pub device: Option<Device>,
}

impl NewRecord {
    /// A record with only the two pressure values set
    pub fn with_values(systolic: i32, diastolic: i32) -> Self {
        Self {
            systolic,
            diastolic,
            ..Default::default()
        }
    }
}

/// Partial update of an existing record. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Validate)]
pub struct RecordUpdate {
    pub systolic: Option<i32>,
    pub diastolic: Option<i32>,
    pub measure_time: Option<DateTime<Utc>>,
    pub activity: Option<Activity>,
    pub emotion: Option<Emotion>,
    #[validate(length(max = 200, message = "Notes cannot exceed 200 characters"))]
    pub notes: Option<String>,
    pub source: Option<Source>,
    pub device: Option<Device>,
}

/// Trim notes and drop them entirely when blank
pub fn normalize_notes(notes: Option<String>) -> Option<String> {
    notes
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(systolic: i32, diastolic: i32) -> BloodPressureRecord {
        let now = Utc::now();
        BloodPressureRecord {
            id: "r1".to_string(),
            user_id: "u1".to_string(),
            systolic,
            diastolic,
            measure_time: now,
            context: MeasureContext {
                time_of_day: TimeOfDay::for_time(&now),
                before_measure: BeforeMeasure::default(),
            },
            notes: None,
            source: Source::Manual,
            device: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_derived_pressures() {
        let r = record(120, 80);
        assert_eq!(r.pulse_pressure(), 40);
        assert_eq!(r.mean_arterial_pressure(), 93);

        // 80 + 55/3 = 98.33
        assert_eq!(record(135, 80).mean_arterial_pressure(), 98);
    }

    #[test]
    fn test_time_of_day_boundaries() {
        assert_eq!(TimeOfDay::from_hour(0), TimeOfDay::Morning);
        assert_eq!(TimeOfDay::from_hour(11), TimeOfDay::Morning);
        assert_eq!(TimeOfDay::from_hour(12), TimeOfDay::Afternoon);
        assert_eq!(TimeOfDay::from_hour(17), TimeOfDay::Afternoon);
        assert_eq!(TimeOfDay::from_hour(18), TimeOfDay::Evening);
        assert_eq!(TimeOfDay::from_hour(21), TimeOfDay::Evening);
        assert_eq!(TimeOfDay::from_hour(22), TimeOfDay::Night);

        let evening = Utc.with_ymd_and_hms(2024, 3, 1, 19, 30, 0).unwrap();
        assert_eq!(TimeOfDay::for_time(&evening), TimeOfDay::Evening);
    }

    #[test]
    fn test_is_abnormal_against_default_range() {
        let range = NormalRange::default();
        assert!(!record(120, 80).is_abnormal(&range));
        assert!(!record(140, 90).is_abnormal(&range));
        assert!(record(141, 80).is_abnormal(&range));
        assert!(record(120, 59).is_abnormal(&range));
        assert!(record(85, 60).is_abnormal(&range));
    }

    #[test]
    fn test_enum_names_round_trip() {
        for activity in [Activity::Rest, Activity::LightActivity, Activity::Exercise, Activity::Work, Activity::Other] {
            assert_eq!(Activity::parse(activity.as_str()), Some(activity));
        }
        assert_eq!(Emotion::parse("anxious"), Some(Emotion::Anxious));
        assert_eq!(Source::parse("device"), Some(Source::Device));
        assert_eq!(Source::parse("fax"), None);

        let json = serde_json::to_string(&Activity::LightActivity).unwrap();
        assert_eq!(json, "\"light_activity\"");
    }

    #[test]
    fn test_normalize_notes() {
        assert_eq!(normalize_notes(Some("  after lunch ".to_string())), Some("after lunch".to_string()));
        assert_eq!(normalize_notes(Some("   ".to_string())), None);
        assert_eq!(normalize_notes(None), None);
    }
}
