use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, params_from_iter, OptionalExtension, Row};
use tracing::debug;

use crate::database::DatabasePool;
use crate::models::{RecordQuery, StoredRecord, StoredUser};
use super::errors::RepositoryError;
use super::{BloodPressureRepositoryTrait, UserRepositoryTrait};

const RECORD_COLUMNS: &str = "id, user_id, systolic, diastolic, measure_time, activity, emotion, notes, \
     source, device_name, device_model, created_at, updated_at";

const USER_COLUMNS: &str = "id, open_id, nickname, avatar, settings, total_records, average_systolic, \
     average_diastolic, last_record_date, created_at, updated_at";

/// SQLite-backed storage for records and users
#[derive(Debug, Clone)]
pub struct SqliteStorage {
    pool: DatabasePool,
}

impl SqliteStorage {
    /// Create storage on top of an initialized pool
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

/// Timestamps are stored as fixed-width UTC RFC 3339 strings so that text
/// ordering matches time ordering.
fn format_time(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_time(idx: usize, value: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<StoredRecord> {
    Ok(StoredRecord {
        id: row.get(0)?,
        user_id: row.get(1)?,
        systolic: row.get(2)?,
        diastolic: row.get(3)?,
        measure_time: parse_time(4, row.get(4)?)?,
        activity: row.get(5)?,
        emotion: row.get(6)?,
        notes: row.get(7)?,
        source: row.get(8)?,
        device_name: row.get(9)?,
        device_model: row.get(10)?,
        created_at: parse_time(11, row.get(11)?)?,
        updated_at: parse_time(12, row.get(12)?)?,
    })
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<StoredUser> {
    let settings: String = row.get(4)?;
    let settings = serde_json::from_str(&settings)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?;

    Ok(StoredUser {
        id: row.get(0)?,
        open_id: row.get(1)?,
        nickname: row.get(2)?,
        avatar: row.get(3)?,
        settings,
        total_records: row.get(5)?,
        average_systolic: row.get(6)?,
        average_diastolic: row.get(7)?,
        last_record_date: row
            .get::<_, Option<String>>(8)?
            .map(|value| parse_time(8, value))
            .transpose()?,
        created_at: parse_time(9, row.get(9)?)?,
        updated_at: parse_time(10, row.get(10)?)?,
    })
}

fn map_constraint(err: rusqlite::Error, key: &str) -> RepositoryError {
    match err {
        rusqlite::Error::SqliteFailure(ref failure, _)
            if failure.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            RepositoryError::Duplicate(key.to_string())
        }
        other => RepositoryError::Sqlite(other),
    }
}

/// Build the WHERE clause and its parameters for a record query
fn record_filter(query: &RecordQuery) -> (String, Vec<String>) {
    let mut clauses = vec!["user_id = ?".to_string()];
    let mut values = vec![query.user_id.clone()];

    if let Some(start) = &query.start {
        clauses.push("measure_time >= ?".to_string());
        values.push(format_time(start));
    }

    if let Some(end) = &query.end {
        clauses.push("measure_time <= ?".to_string());
        values.push(format_time(end));
    }

    (clauses.join(" AND "), values)
}

#[async_trait]
impl BloodPressureRepositoryTrait for SqliteStorage {
    async fn insert(&self, record: StoredRecord) -> Result<StoredRecord, RepositoryError> {
        debug!("Storing blood pressure record in database: id={}", record.id);
        let conn = self.pool.get()?;

        conn.execute(
            &format!(
                "INSERT INTO blood_pressure_records ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                RECORD_COLUMNS
            ),
            params![
                record.id,
                record.user_id,
                record.systolic,
                record.diastolic,
                format_time(&record.measure_time),
                record.activity,
                record.emotion,
                record.notes,
                record.source,
                record.device_name,
                record.device_model,
                format_time(&record.created_at),
                format_time(&record.updated_at),
            ],
        )
        .map_err(|e| map_constraint(e, &record.id))?;

        Ok(record)
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<StoredRecord>, RepositoryError> {
        debug!("Getting blood pressure record by ID from database: id={}", id);
        let conn = self.pool.get()?;

        let record = conn
            .query_row(
                &format!("SELECT {} FROM blood_pressure_records WHERE id = ?1", RECORD_COLUMNS),
                [id],
                record_from_row,
            )
            .optional()?;

        Ok(record)
    }

    async fn update(&self, record: StoredRecord) -> Result<Option<StoredRecord>, RepositoryError> {
        debug!("Updating blood pressure record in database: id={}", record.id);
        let conn = self.pool.get()?;

        let changed = conn.execute(
            "UPDATE blood_pressure_records
             SET systolic = ?2, diastolic = ?3, measure_time = ?4, activity = ?5, emotion = ?6,
                 notes = ?7, source = ?8, device_name = ?9, device_model = ?10, updated_at = ?11
             WHERE id = ?1",
            params![
                record.id,
                record.systolic,
                record.diastolic,
                format_time(&record.measure_time),
                record.activity,
                record.emotion,
                record.notes,
                record.source,
                record.device_name,
                record.device_model,
                format_time(&record.updated_at),
            ],
        )?;

        Ok(if changed == 0 { None } else { Some(record) })
    }

    async fn delete(&self, id: &str) -> Result<Option<StoredRecord>, RepositoryError> {
        let existing = BloodPressureRepositoryTrait::get_by_id(self, id).await?;
        if existing.is_some() {
            let conn = self.pool.get()?;
            conn.execute("DELETE FROM blood_pressure_records WHERE id = ?1", [id])?;
        }
        Ok(existing)
    }

    async fn find(&self, query: &RecordQuery) -> Result<(Vec<StoredRecord>, usize), RepositoryError> {
        let conn = self.pool.get()?;
        let (filter, values) = record_filter(query);

        let total: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM blood_pressure_records WHERE {}", filter),
            params_from_iter(values.iter()),
            |row| row.get(0),
        )?;

        // SQLite treats a negative LIMIT as "no limit"
        let limit = query.limit.map(|l| l as i64).unwrap_or(-1);
        let sql = format!(
            "SELECT {} FROM blood_pressure_records WHERE {}
             ORDER BY measure_time DESC, created_at DESC LIMIT {} OFFSET {}",
            RECORD_COLUMNS, filter, limit, query.offset
        );

        let mut stmt = conn.prepare(&sql)?;
        let records = stmt
            .query_map(params_from_iter(values.iter()), record_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok((records, total as usize))
    }

    async fn count_all(&self, created_since: Option<DateTime<Utc>>) -> Result<usize, RepositoryError> {
        let conn = self.pool.get()?;
        let count: i64 = match created_since {
            Some(since) => conn.query_row(
                "SELECT COUNT(*) FROM blood_pressure_records WHERE created_at >= ?1",
                [format_time(&since)],
                |row| row.get(0),
            )?,
            None => conn.query_row("SELECT COUNT(*) FROM blood_pressure_records", [], |row| row.get(0))?,
        };
        Ok(count as usize)
    }

    async fn delete_for_user(&self, user_id: &str) -> Result<usize, RepositoryError> {
        let conn = self.pool.get()?;
        let removed = conn.execute("DELETE FROM blood_pressure_records WHERE user_id = ?1", [user_id])?;
        Ok(removed)
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        let conn = self.pool.get()?;
        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
        Ok(())
    }
}

#[async_trait]
impl UserRepositoryTrait for SqliteStorage {
    async fn insert(&self, user: StoredUser) -> Result<StoredUser, RepositoryError> {
        debug!("Storing user in database: id={}", user.id);
        let conn = self.pool.get()?;
        let settings = serde_json::to_string(&user.settings)?;

        conn.execute(
            &format!(
                "INSERT INTO users ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                USER_COLUMNS
            ),
            params![
                user.id,
                user.open_id,
                user.nickname,
                user.avatar,
                settings,
                user.total_records,
                user.average_systolic,
                user.average_diastolic,
                user.last_record_date.as_ref().map(format_time),
                format_time(&user.created_at),
                format_time(&user.updated_at),
            ],
        )
        .map_err(|e| map_constraint(e, &user.open_id))?;

        Ok(user)
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<StoredUser>, RepositoryError> {
        let conn = self.pool.get()?;
        let user = conn
            .query_row(
                &format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS),
                [id],
                user_from_row,
            )
            .optional()?;
        Ok(user)
    }

    async fn get_by_open_id(&self, open_id: &str) -> Result<Option<StoredUser>, RepositoryError> {
        let conn = self.pool.get()?;
        let user = conn
            .query_row(
                &format!("SELECT {} FROM users WHERE open_id = ?1", USER_COLUMNS),
                [open_id],
                user_from_row,
            )
            .optional()?;
        Ok(user)
    }

    async fn update(&self, user: StoredUser) -> Result<Option<StoredUser>, RepositoryError> {
        let conn = self.pool.get()?;
        let settings = serde_json::to_string(&user.settings)?;

        let changed = conn.execute(
            "UPDATE users
             SET nickname = ?2, avatar = ?3, settings = ?4, total_records = ?5, average_systolic = ?6,
                 average_diastolic = ?7, last_record_date = ?8, updated_at = ?9
             WHERE id = ?1",
            params![
                user.id,
                user.nickname,
                user.avatar,
                settings,
                user.total_records,
                user.average_systolic,
                user.average_diastolic,
                user.last_record_date.as_ref().map(format_time),
                format_time(&user.updated_at),
            ],
        )?;

        Ok(if changed == 0 { None } else { Some(user) })
    }

    async fn delete(&self, id: &str) -> Result<Option<StoredUser>, RepositoryError> {
        let existing = UserRepositoryTrait::get_by_id(self, id).await?;
        if existing.is_some() {
            let conn = self.pool.get()?;
            conn.execute("DELETE FROM users WHERE id = ?1", [id])?;
        }
        Ok(existing)
    }

    async fn list(&self, limit: usize, offset: usize) -> Result<(Vec<StoredUser>, usize), RepositoryError> {
        let conn = self.pool.get()?;
        let total: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM users ORDER BY created_at DESC LIMIT ?1 OFFSET ?2",
            USER_COLUMNS
        ))?;
        let users = stmt
            .query_map(params![limit as i64, offset as i64], user_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok((users, total as usize))
    }

    async fn count_active_since(&self, since: DateTime<Utc>) -> Result<usize, RepositoryError> {
        let conn = self.pool.get()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM users WHERE last_record_date IS NOT NULL AND last_record_date >= ?1",
            [format_time(&since)],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    async fn count(&self, created_since: Option<DateTime<Utc>>) -> Result<usize, RepositoryError> {
        let conn = self.pool.get()?;
        let count: i64 = match created_since {
            Some(since) => conn.query_row(
                "SELECT COUNT(*) FROM users WHERE created_at >= ?1",
                [format_time(&since)],
                |row| row.get(0),
            )?,
            None => conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?,
        };
        Ok(count as usize)
    }

    async fn top_by_records(&self, limit: usize) -> Result<Vec<StoredUser>, RepositoryError> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM users ORDER BY total_records DESC LIMIT ?1",
            USER_COLUMNS
        ))?;
        let users = stmt
            .query_map([limit as i64], user_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(users)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn storage() -> SqliteStorage {
        SqliteStorage::new(DatabasePool::in_memory().unwrap())
    }

    fn record(id: &str, user_id: &str, systolic: i32, diastolic: i32, measure_time: DateTime<Utc>) -> StoredRecord {
        StoredRecord {
            id: id.to_string(),
            user_id: user_id.to_string(),
            systolic,
            diastolic,
            measure_time,
            activity: "rest".to_string(),
            emotion: "calm".to_string(),
            notes: Some("after breakfast".to_string()),
            source: "device".to_string(),
            device_name: Some("Omron".to_string()),
            device_model: Some("M7".to_string()),
            created_at: measure_time,
            updated_at: measure_time,
        }
    }

    fn user(id: &str, open_id: &str) -> StoredUser {
        let now = Utc::now();
        StoredUser {
            id: id.to_string(),
            open_id: open_id.to_string(),
            nickname: "Tester".to_string(),
            avatar: String::new(),
            settings: serde_json::json!({ "reminders": { "enabled": true, "times": ["08:00"] } }),
            total_records: 0,
            average_systolic: None,
            average_diastolic: None,
            last_record_date: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_record_insert_and_get_preserves_fields() {
        let storage = storage();
        let measured = Utc::now() - Duration::hours(3);
        let stored = record("r1", "alice", 128, 84, measured);

        BloodPressureRepositoryTrait::insert(&storage, stored.clone()).await.unwrap();
        let fetched = BloodPressureRepositoryTrait::get_by_id(&storage, "r1").await.unwrap().unwrap();

        assert_eq!(fetched.systolic, 128);
        assert_eq!(fetched.diastolic, 84);
        assert_eq!(fetched.device_model.as_deref(), Some("M7"));
        // Microsecond precision survives the text round-trip
        assert_eq!(format_time(&fetched.measure_time), format_time(&measured));
    }

    #[tokio::test]
    async fn test_find_with_window_and_paging() {
        let storage = storage();
        let now = Utc::now();
        for day in 0..6 {
            let r = record(&format!("r{}", day), "alice", 120 + day, 80, now - Duration::days(day as i64));
            BloodPressureRepositoryTrait::insert(&storage, r).await.unwrap();
        }
        BloodPressureRepositoryTrait::insert(&storage, record("b", "bob", 140, 90, now)).await.unwrap();

        let (page, total) = storage.find(&RecordQuery::for_user("alice").page(2, 2)).await.unwrap();
        assert_eq!(total, 6);
        assert_eq!(page.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(), vec!["r2", "r3"]);

        let query = RecordQuery::for_user("alice")
            .since(now - Duration::days(3) - Duration::minutes(1))
            .until(now - Duration::days(1) + Duration::minutes(1));
        let (page, total) = storage.find(&query).await.unwrap();
        assert_eq!(total, 3);
        assert_eq!(page.len(), 3);
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let storage = storage();
        let mut r = record("r1", "alice", 150, 95, Utc::now());
        BloodPressureRepositoryTrait::insert(&storage, r.clone()).await.unwrap();

        r.systolic = 118;
        r.diastolic = 76;
        let updated = BloodPressureRepositoryTrait::update(&storage, r).await.unwrap().unwrap();
        assert_eq!(updated.systolic, 118);

        let removed = BloodPressureRepositoryTrait::delete(&storage, "r1").await.unwrap();
        assert!(removed.is_some());
        assert!(BloodPressureRepositoryTrait::get_by_id(&storage, "r1").await.unwrap().is_none());
        assert!(BloodPressureRepositoryTrait::delete(&storage, "r1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_user_round_trip_and_unique_open_id() {
        let storage = storage();
        UserRepositoryTrait::insert(&storage, user("u1", "wx-1")).await.unwrap();

        let duplicate = UserRepositoryTrait::insert(&storage, user("u2", "wx-1")).await;
        assert!(matches!(duplicate, Err(RepositoryError::Duplicate(_))));

        let mut fetched = storage.get_by_open_id("wx-1").await.unwrap().unwrap();
        assert_eq!(fetched.settings["reminders"]["times"][0], "08:00");

        fetched.total_records = 4;
        fetched.average_systolic = Some(126);
        fetched.last_record_date = Some(Utc::now());
        UserRepositoryTrait::update(&storage, fetched).await.unwrap().unwrap();

        assert_eq!(storage.count_active_since(Utc::now() - Duration::days(7)).await.unwrap(), 1);
        let top = storage.top_by_records(5).await.unwrap();
        assert_eq!(top[0].average_systolic, Some(126));
    }

    #[tokio::test]
    async fn test_ping() {
        assert!(BloodPressureRepositoryTrait::ping(&storage()).await.is_ok());
    }
}
