use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use pressure_log_data::models::RecordQuery;
use pressure_log_data::repository::{BloodPressureRepositoryTrait, RepositoryError, UserRepositoryTrait};

use crate::entities::conversions::{convert_to_data_record, convert_to_domain_record};
use crate::entities::record::{
    normalize_notes, BeforeMeasure, BloodPressureRecord, Device, MeasureContext, NewRecord, RecordUpdate, Source,
    TimeOfDay,
};
use crate::services::classification::ClassificationLevel;
use crate::services::statistics::{aggregate, distribution, recompute_user_stats, Stats, USER_STATS_SAMPLE};
use crate::services::validation::validate_record;

/// Default page size for record listings
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Largest page size a client may request
pub const MAX_PAGE_SIZE: u32 = 100;

/// Default trailing window, in days
pub const DEFAULT_TIME_RANGE: u32 = 30;

/// Longest trailing window a client may request, in days
pub const MAX_TIME_RANGE: u32 = 36_500;

/// Errors returned by domain services
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Input failed validation; carries every message
    #[error("Validation error: {}", .0.join("; "))]
    Validation(Vec<String>),

    /// The requested entity does not exist (or is not visible to the caller)
    #[error("Not found: {0}")]
    NotFound(String),

    /// The caller may not perform this operation
    #[error("Forbidden")]
    Forbidden,

    /// The authenticated account no longer exists
    #[error("Unknown user: {0}")]
    UnknownUser(String),

    /// The backing store could not be reached
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// The backing store rejected or failed the operation
    #[error("Storage error: {0}")]
    Storage(String),
}

/// Map repository errors to service errors
pub(crate) fn map_repo_error(err: RepositoryError) -> ServiceError {
    error!("Repository error: {}", err);
    if err.is_unavailable() {
        ServiceError::Unavailable(err.to_string())
    } else {
        ServiceError::Storage(err.to_string())
    }
}

/// Start of the trailing `time_range`-day window ending at `now`
pub(crate) fn window_start(now: DateTime<Utc>, time_range: u32) -> Result<DateTime<Utc>, ServiceError> {
    let out_of_range = || {
        ServiceError::Validation(vec![format!(
            "timeRange must be between 0 and {} days",
            MAX_TIME_RANGE
        )])
    };

    if time_range > MAX_TIME_RANGE {
        return Err(out_of_range());
    }
    now.checked_sub_signed(Duration::days(time_range as i64))
        .ok_or_else(out_of_range)
}

/// Listing options for a user's records
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    /// 1-based page number
    pub page: u32,
    /// Page size, capped at [`MAX_PAGE_SIZE`]
    pub limit: u32,
    /// Trailing window in days, used when no explicit dates are given
    pub time_range: u32,
    /// Explicit lower bound on measure time
    pub start: Option<DateTime<Utc>>,
    /// Explicit upper bound on measure time
    pub end: Option<DateTime<Utc>>,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
            time_range: DEFAULT_TIME_RANGE,
            start: None,
            end: None,
        }
    }
}

impl ListQuery {
    /// Clamp page and limit into their accepted ranges
    pub fn normalized(mut self) -> Self {
        self.page = self.page.max(1);
        self.limit = self.limit.clamp(1, MAX_PAGE_SIZE);
        self
    }

    fn offset(&self) -> usize {
        (self.page as usize - 1) * self.limit as usize
    }

    /// Storage query for this listing as of `now`.
    ///
    /// Explicit dates take precedence over the trailing window.
    fn to_record_query(&self, user_id: &str, now: DateTime<Utc>) -> Result<RecordQuery, ServiceError> {
        let mut query = RecordQuery::for_user(user_id).page(self.limit as usize, self.offset());
        if self.start.is_some() || self.end.is_some() {
            query.start = self.start;
            query.end = self.end;
        } else {
            query = query.since(window_start(now, self.time_range)?);
        }
        Ok(query)
    }
}

/// One page of records plus trailing-window stats
#[derive(Debug, Clone, PartialEq)]
pub struct RecordPage {
    pub records: Vec<BloodPressureRecord>,
    pub page: u32,
    pub limit: u32,
    pub total: usize,
    pub total_pages: usize,
    pub time_range: u32,
    pub stats: Stats,
}

/// Summary statistics over a trailing window
#[derive(Debug, Clone, PartialEq)]
pub struct StatsSummary {
    pub time_range: u32,
    pub stats: Stats,
    pub distribution: BTreeMap<ClassificationLevel, usize>,
}

/// Trait for blood pressure service operations
#[async_trait]
pub trait BloodPressureServiceTrait: Send + Sync {
    /// Validate and store a new record for `user_id`
    async fn create(&self, user_id: &str, input: NewRecord) -> Result<BloodPressureRecord, ServiceError>;

    /// Page through a user's records, newest first
    async fn list(&self, user_id: &str, query: ListQuery) -> Result<RecordPage, ServiceError>;

    /// Get one of the user's records
    async fn get(&self, user_id: &str, id: &str) -> Result<BloodPressureRecord, ServiceError>;

    /// Apply a partial update to one of the user's records and re-validate it
    async fn update(&self, user_id: &str, id: &str, changes: RecordUpdate)
        -> Result<BloodPressureRecord, ServiceError>;

    /// Delete one of the user's records
    async fn delete(&self, user_id: &str, id: &str) -> Result<(), ServiceError>;

    /// Stats and tier distribution over the trailing `time_range` days
    async fn summary(&self, user_id: &str, time_range: u32) -> Result<StatsSummary, ServiceError>;
}

/// Blood pressure service backed by record and user repositories
pub struct BloodPressureService {
    records: Arc<dyn BloodPressureRepositoryTrait>,
    users: Arc<dyn UserRepositoryTrait>,
}

impl BloodPressureService {
    /// Create a new blood pressure service
    pub fn new(records: Arc<dyn BloodPressureRepositoryTrait>, users: Arc<dyn UserRepositoryTrait>) -> Self {
        Self { records, users }
    }

    /// Fetch a record, treating another user's record as missing
    async fn owned_record(&self, user_id: &str, id: &str) -> Result<BloodPressureRecord, ServiceError> {
        let stored = self.records.get_by_id(id).await.map_err(map_repo_error)?;

        match stored {
            Some(stored) if stored.user_id == user_id => Ok(convert_to_domain_record(stored)),
            Some(_) => {
                warn!("User {} requested record {} owned by someone else", user_id, id);
                Err(ServiceError::NotFound(format!("Blood pressure record {} not found", id)))
            }
            None => Err(ServiceError::NotFound(format!("Blood pressure record {} not found", id))),
        }
    }

    /// Every record the user measured in the trailing window
    async fn window(
        &self,
        user_id: &str,
        time_range: u32,
        now: DateTime<Utc>,
    ) -> Result<Vec<BloodPressureRecord>, ServiceError> {
        let query = RecordQuery::for_user(user_id)
            .since(window_start(now, time_range)?)
            .until(now);
        let (stored, _) = self.records.find(&query).await.map_err(map_repo_error)?;
        Ok(stored.into_iter().map(convert_to_domain_record).collect())
    }

    /// Recompute the owner's denormalized stats from storage
    async fn refresh_user_stats(&self, user_id: &str, now: DateTime<Utc>) -> Result<(), ServiceError> {
        let Some(mut user) = self.users.get_by_id(user_id).await.map_err(map_repo_error)? else {
            warn!("Skipping stats refresh for unknown user {}", user_id);
            return Ok(());
        };

        let query = RecordQuery::for_user(user_id).page(USER_STATS_SAMPLE, 0);
        let (recent, total) = self.records.find(&query).await.map_err(map_repo_error)?;
        let recent: Vec<BloodPressureRecord> = recent.into_iter().map(convert_to_domain_record).collect();

        let stats = recompute_user_stats(total, &recent, now);
        user.total_records = stats.total_records;
        user.average_systolic = stats.average_systolic;
        user.average_diastolic = stats.average_diastolic;
        user.last_record_date = stats.last_record_date;
        user.updated_at = now;

        self.users.update(user).await.map_err(map_repo_error)?;
        debug!("Refreshed stats for user {}: {} records", user_id, total);
        Ok(())
    }
}

/// Keep device details only for device readings
fn device_for(source: Source, device: Option<Device>) -> Option<Device> {
    if source == Source::Device {
        device
    } else {
        None
    }
}

#[async_trait]
impl BloodPressureServiceTrait for BloodPressureService {
    async fn create(&self, user_id: &str, input: NewRecord) -> Result<BloodPressureRecord, ServiceError> {
        let now = Utc::now();

        let validation = validate_record(&input, now);
        if !validation.is_valid {
            warn!("Rejected blood pressure record for user {}: {:?}", user_id, validation.errors);
            return Err(ServiceError::Validation(validation.errors));
        }

        // A token can outlive its account; records must always have an owner
        if self.users.get_by_id(user_id).await.map_err(map_repo_error)?.is_none() {
            warn!("Rejected blood pressure record for deleted user {}", user_id);
            return Err(ServiceError::UnknownUser(user_id.to_string()));
        }

        let measure_time = input.measure_time.unwrap_or(now);
        let source = input.source.unwrap_or_default();
        let record = BloodPressureRecord {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            systolic: input.systolic,
            diastolic: input.diastolic,
            measure_time,
            context: MeasureContext {
                time_of_day: TimeOfDay::for_time(&measure_time),
                before_measure: BeforeMeasure {
                    activity: input.activity.unwrap_or_default(),
                    emotion: input.emotion.unwrap_or_default(),
                },
            },
            notes: normalize_notes(input.notes),
            source,
            device: device_for(source, input.device),
            created_at: now,
            updated_at: now,
        };

        let stored = self
            .records
            .insert(convert_to_data_record(&record))
            .await
            .map_err(map_repo_error)?;

        self.refresh_user_stats(user_id, now).await?;

        info!("Created blood pressure record {} for user {}", stored.id, user_id);
        Ok(convert_to_domain_record(stored))
    }

    async fn list(&self, user_id: &str, query: ListQuery) -> Result<RecordPage, ServiceError> {
        let now = Utc::now();
        let query = query.normalized();

        let (stored, total) = self
            .records
            .find(&query.to_record_query(user_id, now)?)
            .await
            .map_err(map_repo_error)?;

        let window = self.window(user_id, query.time_range, now).await?;
        let stats = aggregate(&window, query.time_range, now);

        let limit = query.limit as usize;
        Ok(RecordPage {
            records: stored.into_iter().map(convert_to_domain_record).collect(),
            page: query.page,
            limit: query.limit,
            total,
            total_pages: (total + limit - 1) / limit,
            time_range: query.time_range,
            stats,
        })
    }

    async fn get(&self, user_id: &str, id: &str) -> Result<BloodPressureRecord, ServiceError> {
        self.owned_record(user_id, id).await
    }

    async fn update(
        &self,
        user_id: &str,
        id: &str,
        changes: RecordUpdate,
    ) -> Result<BloodPressureRecord, ServiceError> {
        let now = Utc::now();
        let mut record = self.owned_record(user_id, id).await?;

        let notes = match changes.notes {
            Some(notes) => normalize_notes(Some(notes)),
            None => record.notes.clone(),
        };

        // Validate the merged record, not just the changed fields
        let merged = NewRecord {
            systolic: changes.systolic.unwrap_or(record.systolic),
            diastolic: changes.diastolic.unwrap_or(record.diastolic),
            measure_time: Some(changes.measure_time.unwrap_or(record.measure_time)),
            activity: Some(changes.activity.unwrap_or(record.context.before_measure.activity)),
            emotion: Some(changes.emotion.unwrap_or(record.context.before_measure.emotion)),
            notes,
            source: Some(changes.source.unwrap_or(record.source)),
            device: changes.device.or_else(|| record.device.clone()),
        };

        let validation = validate_record(&merged, now);
        if !validation.is_valid {
            warn!("Rejected update of record {}: {:?}", id, validation.errors);
            return Err(ServiceError::Validation(validation.errors));
        }

        let measure_time = merged.measure_time.unwrap_or(record.measure_time);
        let source = merged.source.unwrap_or(record.source);
        record.systolic = merged.systolic;
        record.diastolic = merged.diastolic;
        record.measure_time = measure_time;
        record.context = MeasureContext {
            time_of_day: TimeOfDay::for_time(&measure_time),
            before_measure: BeforeMeasure {
                activity: merged.activity.unwrap_or_default(),
                emotion: merged.emotion.unwrap_or_default(),
            },
        };
        record.notes = merged.notes;
        record.source = source;
        record.device = device_for(source, merged.device);
        record.updated_at = now;

        let updated = self
            .records
            .update(convert_to_data_record(&record))
            .await
            .map_err(map_repo_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Blood pressure record {} not found", id)))?;

        info!("Updated blood pressure record {}", id);
        Ok(convert_to_domain_record(updated))
    }

    async fn delete(&self, user_id: &str, id: &str) -> Result<(), ServiceError> {
        self.owned_record(user_id, id).await?;

        self.records
            .delete(id)
            .await
            .map_err(map_repo_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Blood pressure record {} not found", id)))?;

        self.refresh_user_stats(user_id, Utc::now()).await?;

        info!("Deleted blood pressure record {} for user {}", id, user_id);
        Ok(())
    }

    async fn summary(&self, user_id: &str, time_range: u32) -> Result<StatsSummary, ServiceError> {
        let now = Utc::now();
        let window = self.window(user_id, time_range, now).await?;

        Ok(StatsSummary {
            time_range,
            stats: aggregate(&window, time_range, now),
            distribution: distribution(&window),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::record::Activity;
    use pressure_log_data::models::StoredUser;
    use pressure_log_data::repository::{InMemoryStorage, MockBloodPressureRepositoryTrait};

    /// Service over fresh storage with the accounts `alice` and `bob`
    async fn service() -> (BloodPressureService, InMemoryStorage) {
        let storage = InMemoryStorage::new();
        seed_user(&storage, "alice").await;
        seed_user(&storage, "bob").await;
        let service = BloodPressureService::new(Arc::new(storage.clone()), Arc::new(storage.clone()));
        (service, storage)
    }

    async fn seed_user(storage: &InMemoryStorage, id: &str) {
        let now = Utc::now();
        let user = StoredUser {
            id: id.to_string(),
            open_id: format!("wx-{}", id),
            nickname: "Tester".to_string(),
            avatar: String::new(),
            settings: serde_json::json!({}),
            total_records: 0,
            average_systolic: None,
            average_diastolic: None,
            last_record_date: None,
            created_at: now,
            updated_at: now,
        };
        UserRepositoryTrait::insert(storage, user).await.unwrap();
    }

    #[tokio::test]
    async fn test_create_applies_defaults_and_refreshes_stats() {
        let (service, storage) = service().await;

        let mut input = NewRecord::with_values(128, 82);
        input.notes = Some("  morning walk  ".to_string());
        let record = service.create("alice", input).await.unwrap();

        assert_eq!(record.user_id, "alice");
        assert_eq!(record.context.before_measure.activity, Activity::Rest);
        assert_eq!(record.source, Source::Manual);
        assert_eq!(record.notes.as_deref(), Some("morning walk"));
        assert_eq!(record.pulse_pressure(), 46);

        let user = storage.get_by_open_id("wx-alice").await.unwrap().unwrap();
        assert_eq!(user.total_records, 1);
        assert_eq!(user.average_systolic, Some(128));
        assert!(user.last_record_date.is_some());
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_values() {
        let (service, _) = service().await;
        let err = service.create("alice", NewRecord::with_values(80, 90)).await.unwrap_err();

        match err {
            ServiceError::Validation(errors) => {
                assert!(errors.contains(&"Systolic must exceed diastolic".to_string()))
            }
            other => panic!("Expected validation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_device_kept_only_for_device_source() {
        let (service, _) = service().await;
        let device = Device {
            name: Some("Omron".to_string()),
            model: Some("M7".to_string()),
        };

        let mut manual = NewRecord::with_values(120, 80);
        manual.device = Some(device.clone());
        assert!(service.create("alice", manual).await.unwrap().device.is_none());

        let mut from_device = NewRecord::with_values(120, 80);
        from_device.source = Some(Source::Device);
        from_device.device = Some(device.clone());
        assert_eq!(service.create("alice", from_device).await.unwrap().device, Some(device));
    }

    #[tokio::test]
    async fn test_records_are_scoped_to_owner() {
        let (service, _) = service().await;
        let record = service.create("alice", NewRecord::with_values(120, 80)).await.unwrap();

        assert!(service.get("alice", &record.id).await.is_ok());
        assert!(matches!(service.get("bob", &record.id).await, Err(ServiceError::NotFound(_))));
        assert!(matches!(service.delete("bob", &record.id).await, Err(ServiceError::NotFound(_))));
        assert!(service.get("alice", &record.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_list_pages_and_stats() {
        let (service, _) = service().await;
        let now = Utc::now();
        for day in 0..5 {
            let mut input = NewRecord::with_values(120 + day, 80);
            input.measure_time = Some(now - Duration::days(day as i64) - Duration::minutes(1));
            service.create("alice", input).await.unwrap();
        }

        let page = service
            .list("alice", ListQuery { page: 2, limit: 2, ..Default::default() })
            .await
            .unwrap();

        assert_eq!(page.total, 5);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.records.len(), 2);
        assert_eq!(page.records[0].systolic, 122);
        assert_eq!(page.stats.total_records, 5);
        assert_eq!(page.stats.max_systolic, Some(124));
    }

    #[tokio::test]
    async fn test_list_explicit_dates_override_time_range() {
        let (service, _) = service().await;
        let now = Utc::now();
        let mut old = NewRecord::with_values(140, 90);
        old.measure_time = Some(now - Duration::days(60));
        service.create("alice", old).await.unwrap();

        let recent = service.list("alice", ListQuery::default()).await.unwrap();
        assert_eq!(recent.total, 0);

        let query = ListQuery {
            start: Some(now - Duration::days(61)),
            end: Some(now - Duration::days(59)),
            ..Default::default()
        };
        let ranged = service.list("alice", query).await.unwrap();
        assert_eq!(ranged.total, 1);
    }

    #[tokio::test]
    async fn test_list_caps_page_size() {
        let (service, _) = service().await;
        let page = service
            .list("alice", ListQuery { page: 0, limit: 500, ..Default::default() })
            .await
            .unwrap();
        assert_eq!(page.page, 1);
        assert_eq!(page.limit, MAX_PAGE_SIZE);
        assert_eq!(page.total_pages, 0);
    }

    #[tokio::test]
    async fn test_update_revalidates_merged_record() {
        let (service, _) = service().await;
        let record = service.create("alice", NewRecord::with_values(130, 85)).await.unwrap();

        let bad = RecordUpdate {
            diastolic: Some(135),
            ..Default::default()
        };
        assert!(matches!(
            service.update("alice", &record.id, bad).await,
            Err(ServiceError::Validation(_))
        ));

        let good = RecordUpdate {
            systolic: Some(118),
            diastolic: Some(76),
            notes: Some("retake".to_string()),
            ..Default::default()
        };
        let updated = service.update("alice", &record.id, good).await.unwrap();
        assert_eq!(updated.systolic, 118);
        assert_eq!(updated.notes.as_deref(), Some("retake"));
        assert_eq!(updated.created_at, record.created_at);
        assert_eq!(updated.classification().level, ClassificationLevel::Optimal);
    }

    #[tokio::test]
    async fn test_delete_refreshes_user_stats() {
        let (service, storage) = service().await;
        let first = service.create("alice", NewRecord::with_values(120, 80)).await.unwrap();
        service.create("alice", NewRecord::with_values(140, 90)).await.unwrap();

        service.delete("alice", &first.id).await.unwrap();

        let user = storage.get_by_open_id("wx-alice").await.unwrap().unwrap();
        assert_eq!(user.total_records, 1);
        assert_eq!(user.average_systolic, Some(140));
    }

    #[tokio::test]
    async fn test_deleting_last_record_clears_last_record_date() {
        let (service, storage) = service().await;
        let only = service.create("alice", NewRecord::with_values(120, 80)).await.unwrap();
        service.delete("alice", &only.id).await.unwrap();

        let user = storage.get_by_open_id("wx-alice").await.unwrap().unwrap();
        assert_eq!(user.total_records, 0);
        assert_eq!(user.last_record_date, None);
    }

    #[tokio::test]
    async fn test_summary_is_stable_without_writes() {
        let (service, _) = service().await;
        service.create("alice", NewRecord::with_values(120, 80)).await.unwrap();
        service.create("alice", NewRecord::with_values(130, 90)).await.unwrap();

        let first = service.summary("alice", 30).await.unwrap();
        let second = service.summary("alice", 30).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.stats.avg_systolic, Some(125.0));
        assert_eq!(first.distribution[&ClassificationLevel::Normal], 1);
        assert_eq!(first.distribution[&ClassificationLevel::MildHypertension], 1);
    }

    #[tokio::test]
    async fn test_create_rejects_deleted_owner() {
        let (service, storage) = service().await;
        UserRepositoryTrait::delete(&storage, "alice").await.unwrap();

        let err = service.create("alice", NewRecord::with_values(120, 80)).await.unwrap_err();
        assert!(matches!(err, ServiceError::UnknownUser(id) if id == "alice"));

        let (_, total) = storage.find(&RecordQuery::for_user("alice")).await.unwrap();
        assert_eq!(total, 0);
    }

    #[tokio::test]
    async fn test_oversized_time_range_is_rejected() {
        let (service, _) = service().await;
        service.create("alice", NewRecord::with_values(120, 80)).await.unwrap();

        let err = service.summary("alice", 100_000_000).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let query = ListQuery {
            time_range: u32::MAX,
            ..Default::default()
        };
        assert!(matches!(service.list("alice", query).await, Err(ServiceError::Validation(_))));

        let widest = service.summary("alice", MAX_TIME_RANGE).await.unwrap();
        assert_eq!(widest.stats.total_records, 1);
    }

    #[test]
    fn test_window_start() {
        let now = Utc::now();
        assert_eq!(window_start(now, 0).unwrap(), now);
        assert_eq!(window_start(now, 30).unwrap(), now - Duration::days(30));
        assert!(window_start(now, MAX_TIME_RANGE + 1).is_err());
    }

    #[tokio::test]
    async fn test_unreachable_store_maps_to_unavailable() {
        let mut records = MockBloodPressureRepositoryTrait::new();
        records
            .expect_get_by_id()
            .returning(|_| Err(RepositoryError::Unavailable("connection refused".to_string())));

        let service = BloodPressureService::new(Arc::new(records), Arc::new(InMemoryStorage::new()));
        let err = service.get("alice", "r1").await.unwrap_err();
        assert!(matches!(err, ServiceError::Unavailable(msg) if msg.contains("connection refused")));
    }

    #[tokio::test]
    async fn test_rejected_write_maps_to_storage_error() {
        let storage = InMemoryStorage::new();
        seed_user(&storage, "alice").await;

        let mut records = MockBloodPressureRepositoryTrait::new();
        records
            .expect_insert()
            .returning(|_| Err(RepositoryError::Duplicate("id".to_string())));

        let service = BloodPressureService::new(Arc::new(records), Arc::new(storage));
        let err = service.create("alice", NewRecord::with_values(120, 80)).await.unwrap_err();
        assert!(matches!(err, ServiceError::Storage(msg) if msg.contains("Duplicate")));
    }
}
