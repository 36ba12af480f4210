use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use pressure_log_domain::entities::{
    Activity, BloodPressureRecord, Device, Emotion, NewRecord, RecordUpdate, Source, TimeOfDay,
};
use pressure_log_domain::services::classification::ClassificationLevel;
use pressure_log_domain::services::statistics::{round_average, Stats};
use pressure_log_domain::services::blood_pressure::{DEFAULT_TIME_RANGE, MAX_TIME_RANGE};
use pressure_log_domain::services::{ListQuery, RecordPage, StatsSummary};

use crate::entities::common::Pagination;

/// State before the measurement, as submitted
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct BeforeMeasureInput {
    pub activity: Option<Activity>,
    pub emotion: Option<Emotion>,
}

/// Measurement context, as submitted. The time of day is always derived.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContextInput {
    pub before_measure: Option<BeforeMeasureInput>,
}

impl ContextInput {
    fn split(context: Option<ContextInput>) -> (Option<Activity>, Option<Emotion>) {
        match context.and_then(|c| c.before_measure) {
            Some(before) => (before.activity, before.emotion),
            None => (None, None),
        }
    }
}

/// Request payload for recording a reading
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateRecordRequest {
    /// Systolic blood pressure (mmHg)
    #[schema(example = 128)]
    pub systolic: Option<i32>,

    /// Diastolic blood pressure (mmHg)
    #[schema(example = 82)]
    pub diastolic: Option<i32>,

    /// When the reading was taken. Defaults to now.
    pub measure_time: Option<DateTime<Utc>>,

    pub context: Option<ContextInput>,

    #[validate(length(max = 200, message = "Notes cannot exceed 200 characters"))]
    pub notes: Option<String>,

    /// Defaults to `manual`
    pub source: Option<Source>,

    /// Kept only when `source` is `device`
    pub device: Option<Device>,
}

impl CreateRecordRequest {
    /// Domain input, or `None` when either pressure value is missing
    pub fn into_new_record(self) -> Option<NewRecord> {
        let (systolic, diastolic) = (self.systolic?, self.diastolic?);
        let (activity, emotion) = ContextInput::split(self.context);

        Some(NewRecord {
            systolic,
            diastolic,
            measure_time: self.measure_time,
            activity,
            emotion,
            notes: self.notes,
            source: self.source,
            device: self.device,
        })
    }
}

/// Request payload for changing a reading; absent fields are left untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRecordRequest {
    pub systolic: Option<i32>,
    pub diastolic: Option<i32>,
    pub measure_time: Option<DateTime<Utc>>,
    pub context: Option<ContextInput>,
    #[validate(length(max = 200, message = "Notes cannot exceed 200 characters"))]
    pub notes: Option<String>,
    pub source: Option<Source>,
    pub device: Option<Device>,
}

impl From<UpdateRecordRequest> for RecordUpdate {
    fn from(request: UpdateRecordRequest) -> Self {
        let (activity, emotion) = ContextInput::split(request.context);
        RecordUpdate {
            systolic: request.systolic,
            diastolic: request.diastolic,
            measure_time: request.measure_time,
            activity,
            emotion,
            notes: request.notes,
            source: request.source,
            device: request.device,
        }
    }
}

/// State before the measurement
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BeforeMeasureResponse {
    pub activity: Activity,
    pub emotion: Emotion,
}

/// Measurement context
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContextResponse {
    pub time_of_day: TimeOfDay,
    pub before_measure: BeforeMeasureResponse,
}

/// Severity tier with its display data
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ClassificationResponse {
    pub level: ClassificationLevel,
    pub name: String,
    pub color: String,
    pub description: String,
}

/// Public representation of a blood pressure record
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecordResponse {
    pub id: String,
    pub user_id: String,
    pub systolic: i32,
    pub diastolic: i32,
    pub measure_time: DateTime<Utc>,
    pub context: ContextResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub source: Source,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<Device>,
    pub classification: ClassificationResponse,
    /// Systolic minus diastolic
    pub pulse_pressure: i32,
    pub mean_arterial_pressure: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<BloodPressureRecord> for RecordResponse {
    fn from(record: BloodPressureRecord) -> Self {
        let classification = record.classification();
        let pulse_pressure = record.pulse_pressure();
        let mean_arterial_pressure = record.mean_arterial_pressure();

        Self {
            classification: ClassificationResponse {
                level: classification.level,
                name: classification.name.to_string(),
                color: classification.color.to_string(),
                description: classification.description.to_string(),
            },
            pulse_pressure,
            mean_arterial_pressure,
            id: record.id,
            user_id: record.user_id,
            systolic: record.systolic,
            diastolic: record.diastolic,
            measure_time: record.measure_time,
            context: ContextResponse {
                time_of_day: record.context.time_of_day,
                before_measure: BeforeMeasureResponse {
                    activity: record.context.before_measure.activity,
                    emotion: record.context.before_measure.emotion,
                },
            },
            notes: record.notes,
            source: record.source,
            device: record.device,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

/// Query parameters for listing records
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query, rename_all = "camelCase")]
pub struct ListRecordsParams {
    /// Page number, 1-based (default 1)
    pub page: Option<u32>,
    /// Page size (default 20, at most 100)
    pub limit: Option<u32>,
    /// Trailing window in days (default 30)
    pub time_range: Option<u32>,
    /// Lower bound, RFC 3339 or `YYYY-MM-DD`; overrides `timeRange`
    pub start_date: Option<String>,
    /// Upper bound, RFC 3339 or `YYYY-MM-DD` (whole day); overrides `timeRange`
    pub end_date: Option<String>,
}

/// Parse a date filter. A bare date as an upper bound covers the whole day.
fn parse_date(name: &str, value: &str, end_of_day: bool) -> Result<DateTime<Utc>, String> {
    if let Ok(time) = DateTime::parse_from_rfc3339(value) {
        return Ok(time.with_timezone(&Utc));
    }

    let invalid = || format!("{} must be an RFC 3339 timestamp or YYYY-MM-DD", name);
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| invalid())?;
    let time = if end_of_day {
        date.and_hms_milli_opt(23, 59, 59, 999)
    } else {
        date.and_hms_opt(0, 0, 0)
    };
    time.map(|t| t.and_utc()).ok_or_else(invalid)
}

/// The requested trailing window, or the default when absent
fn time_range_or_default(value: Option<u32>) -> Result<u32, String> {
    match value {
        None => Ok(DEFAULT_TIME_RANGE),
        Some(days) if days <= MAX_TIME_RANGE => Ok(days),
        Some(_) => Err(format!("timeRange must be at most {} days", MAX_TIME_RANGE)),
    }
}

impl ListRecordsParams {
    /// Listing options, or a message describing the bad parameter
    pub fn to_query(&self) -> Result<ListQuery, String> {
        let defaults = ListQuery::default();
        let start = self
            .start_date
            .as_deref()
            .map(|value| parse_date("startDate", value, false))
            .transpose()?;
        let end = self
            .end_date
            .as_deref()
            .map(|value| parse_date("endDate", value, true))
            .transpose()?;

        if let (Some(start), Some(end)) = (start, end) {
            if start > end {
                return Err("startDate must not be after endDate".to_string());
            }
        }

        Ok(ListQuery {
            page: self.page.unwrap_or(defaults.page),
            limit: self.limit.unwrap_or(defaults.limit),
            time_range: time_range_or_default(self.time_range)?,
            start,
            end,
        }
        .normalized())
    }
}

/// Query parameters for the summary
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query, rename_all = "camelCase")]
pub struct SummaryParams {
    /// Trailing window in days (default 30)
    pub time_range: Option<u32>,
}

impl SummaryParams {
    /// The requested window, or a message describing why it is unusable
    pub fn time_range(&self) -> Result<u32, String> {
        time_range_or_default(self.time_range)
    }
}

/// Statistics over the trailing window, averages rounded to whole mmHg
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WindowStats {
    pub total_records: usize,
    pub time_range: u32,
    pub avg_systolic: Option<i32>,
    pub avg_diastolic: Option<i32>,
    pub min_systolic: Option<i32>,
    pub max_systolic: Option<i32>,
    pub min_diastolic: Option<i32>,
    pub max_diastolic: Option<i32>,
}

impl WindowStats {
    fn new(stats: &Stats, time_range: u32) -> Self {
        Self {
            total_records: stats.total_records,
            time_range,
            avg_systolic: round_average(stats.avg_systolic),
            avg_diastolic: round_average(stats.avg_diastolic),
            min_systolic: stats.min_systolic,
            max_systolic: stats.max_systolic,
            min_diastolic: stats.min_diastolic,
            max_diastolic: stats.max_diastolic,
        }
    }
}

/// One page of records
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RecordListResponse {
    pub records: Vec<RecordResponse>,
    pub pagination: Pagination,
    pub stats: WindowStats,
}

impl From<RecordPage> for RecordListResponse {
    fn from(page: RecordPage) -> Self {
        Self {
            stats: WindowStats::new(&page.stats, page.time_range),
            pagination: Pagination {
                current: page.page,
                page_size: page.limit,
                total: page.total,
                total_pages: page.total_pages,
            },
            records: page.records.into_iter().map(RecordResponse::from).collect(),
        }
    }
}

/// Systolic and diastolic pair of optional values
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PressureAverages {
    pub systolic: Option<i32>,
    pub diastolic: Option<i32>,
}

/// Observed minimum and maximum
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ValueSpan {
    pub min: Option<i32>,
    pub max: Option<i32>,
}

/// Observed spans for both values
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PressureRanges {
    pub systolic: ValueSpan,
    pub diastolic: ValueSpan,
}

/// Summary statistics for the trailing window
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SummaryResponse {
    pub total_records: usize,
    pub time_range: u32,
    pub averages: PressureAverages,
    pub ranges: PressureRanges,
    /// Record count per severity tier, every tier present
    pub distribution: BTreeMap<String, usize>,
}

impl From<StatsSummary> for SummaryResponse {
    fn from(summary: StatsSummary) -> Self {
        let stats = summary.stats;
        Self {
            total_records: stats.total_records,
            time_range: summary.time_range,
            averages: PressureAverages {
                systolic: round_average(stats.avg_systolic),
                diastolic: round_average(stats.avg_diastolic),
            },
            ranges: PressureRanges {
                systolic: ValueSpan {
                    min: stats.min_systolic,
                    max: stats.max_systolic,
                },
                diastolic: ValueSpan {
                    min: stats.min_diastolic,
                    max: stats.max_diastolic,
                },
            },
            distribution: summary
                .distribution
                .into_iter()
                .map(|(level, count)| (level.as_str().to_string(), count))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_missing_values_yield_no_record() {
        let request = CreateRecordRequest {
            systolic: Some(120),
            ..Default::default()
        };
        assert!(request.into_new_record().is_none());
    }

    #[test]
    fn test_request_wire_names() {
        let request: CreateRecordRequest = serde_json::from_str(
            r#"{"systolic": 135, "diastolic": 88, "measureTime": "2024-03-01T08:30:00Z",
                "context": {"timeOfDay": "night", "beforeMeasure": {"activity": "exercise"}},
                "source": "device", "device": {"name": "Omron", "model": "M7"}}"#,
        )
        .unwrap();

        let input = request.into_new_record().unwrap();
        assert_eq!(input.systolic, 135);
        assert_eq!(input.activity, Some(Activity::Exercise));
        assert_eq!(input.emotion, None);
        assert_eq!(input.source, Some(Source::Device));
        assert_eq!(input.measure_time.unwrap().hour(), 8);
    }

    #[test]
    fn test_list_params_dates() {
        let params = ListRecordsParams {
            start_date: Some("2024-03-01".to_string()),
            end_date: Some("2024-03-02".to_string()),
            ..Default::default()
        };
        let query = params.to_query().unwrap();
        let end = query.end.unwrap();
        assert_eq!(query.start.unwrap().day(), 1);
        assert_eq!((end.day(), end.hour(), end.minute()), (2, 23, 59));
        assert_eq!(query.limit, 20);
    }

    #[test]
    fn test_list_params_rejects_bad_dates() {
        let bad = ListRecordsParams {
            start_date: Some("yesterday".to_string()),
            ..Default::default()
        };
        assert!(bad.to_query().unwrap_err().contains("startDate"));

        let reversed = ListRecordsParams {
            start_date: Some("2024-03-05".to_string()),
            end_date: Some("2024-03-01".to_string()),
            ..Default::default()
        };
        assert!(reversed.to_query().is_err());
    }

    #[test]
    fn test_time_range_is_bounded() {
        let huge = ListRecordsParams {
            time_range: Some(100_000_000),
            ..Default::default()
        };
        assert!(huge.to_query().unwrap_err().contains("timeRange"));

        let widest = ListRecordsParams {
            time_range: Some(MAX_TIME_RANGE),
            ..Default::default()
        };
        assert_eq!(widest.to_query().unwrap().time_range, MAX_TIME_RANGE);

        assert_eq!(SummaryParams::default().time_range(), Ok(DEFAULT_TIME_RANGE));
        assert!(SummaryParams { time_range: Some(u32::MAX) }.time_range().is_err());
    }

    #[test]
    fn test_list_params_clamp_limit() {
        let params = ListRecordsParams {
            page: Some(0),
            limit: Some(1000),
            ..Default::default()
        };
        let query = params.to_query().unwrap();
        assert_eq!(query.page, 1);
        assert_eq!(query.limit, 100);
    }
}
