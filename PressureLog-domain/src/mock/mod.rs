// Mock payloads for the development fallback.
// Served, clearly flagged, when the store cannot be reached in development.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;

use crate::entities::record::{
    normalize_notes, BeforeMeasure, BloodPressureRecord, MeasureContext, NewRecord, Source, TimeOfDay,
};
use crate::entities::user::{User, UserSettings, UserStats};
use crate::services::blood_pressure::{ListQuery, RecordPage, StatsSummary};
use crate::services::statistics::{aggregate, distribution, Stats};
use crate::services::users::{ActiveUser, SystemStats, UserPage};

/// Number of records in a mock listing
pub const MOCK_RECORD_COUNT: usize = 10;

/// One record per day going back from `now`, with plausible random values
pub fn generate_mock_records(count: usize, user_id: &str, now: DateTime<Utc>) -> Vec<BloodPressureRecord> {
    let mut rng = rand::thread_rng();

    (0..count)
        .map(|i| {
            let measure_time = now - Duration::days(i as i64);
            let systolic = rng.gen_range(110..150);
            let diastolic = rng.gen_range(70..95);

            BloodPressureRecord {
                id: format!("mock_bp_{}", i),
                user_id: user_id.to_string(),
                systolic,
                diastolic,
                measure_time,
                context: MeasureContext {
                    time_of_day: TimeOfDay::for_time(&measure_time),
                    before_measure: BeforeMeasure::default(),
                },
                notes: None,
                source: Source::Manual,
                device: None,
                created_at: measure_time,
                updated_at: measure_time,
            }
        })
        .collect()
}

/// Echo a submitted record back as if it had been stored
pub fn mock_record(user_id: &str, input: NewRecord, now: DateTime<Utc>) -> BloodPressureRecord {
    let measure_time = input.measure_time.unwrap_or(now);
    BloodPressureRecord {
        id: format!("mock_bp_{}", now.timestamp_millis()),
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
        source: input.source.unwrap_or_default(),
        device: input.device,
        created_at: now,
        updated_at: now,
    }
}

/// A single mock record carrying the requested ID
pub fn mock_record_with_id(id: &str, user_id: &str, now: DateTime<Utc>) -> BloodPressureRecord {
    let mut record = generate_mock_records(1, user_id, now).remove(0);
    record.id = id.to_string();
    record
}

/// A page of mock records with stats computed over them
pub fn mock_page(user_id: &str, query: &ListQuery, now: DateTime<Utc>) -> RecordPage {
    let query = query.clone().normalized();
    let records = generate_mock_records(MOCK_RECORD_COUNT.min(query.limit as usize), user_id, now);
    let stats = aggregate(&records, query.time_range, now);

    RecordPage {
        total: records.len(),
        total_pages: 1,
        page: query.page,
        limit: query.limit,
        time_range: query.time_range,
        stats,
        records,
    }
}

/// Summary with no records
pub fn empty_summary(time_range: u32) -> StatsSummary {
    StatsSummary {
        time_range,
        stats: Stats::default(),
        distribution: distribution(&[]),
    }
}

/// A plausible active user
pub fn mock_user(id: &str, now: DateTime<Utc>) -> User {
    User {
        id: id.to_string(),
        open_id: format!("mock_openid_{}", id),
        nickname: "Test user".to_string(),
        avatar: String::new(),
        settings: UserSettings::default(),
        stats: UserStats {
            total_records: 25,
            average_systolic: Some(125),
            average_diastolic: Some(80),
            last_record_date: Some(now),
        },
        created_at: now - Duration::days(30),
        updated_at: now,
    }
}

/// A page of mock users
pub fn mock_users(page: u32, limit: u32, now: DateTime<Utc>) -> UserPage {
    let mut rng = rand::thread_rng();
    let users: Vec<User> = (1..=5)
        .map(|i| {
            let mut user = mock_user(&format!("mock_user_{}", i), now);
            user.nickname = format!("Test user {}", i);
            user.stats.total_records = rng.gen_range(0..50);
            user.stats.average_systolic = Some(rng.gen_range(120..140));
            user.stats.average_diastolic = Some(rng.gen_range(80..95));
            user.stats.last_record_date = Some(now - Duration::days(i as i64 - 1));
            user.created_at = now - Duration::days(7 * (i as i64 - 1));
            user
        })
        .collect();

    UserPage {
        total: users.len(),
        total_pages: 1,
        page: page.max(1),
        limit,
        users,
    }
}

/// Plausible system-wide figures
pub fn mock_system_stats(now: DateTime<Utc>) -> SystemStats {
    let top = [("Health enthusiast", 89), ("Morning runner", 76), ("Wellness fan", 65)];

    SystemStats {
        total_users: 156,
        active_users: 89,
        new_users_this_week: 12,
        total_records: 2468,
        records_this_week: 145,
        average_records_per_user: 15.8,
        top_active_users: top
            .iter()
            .map(|(nickname, total_records)| ActiveUser {
                nickname: nickname.to_string(),
                total_records: *total_records,
                last_active: Some(now),
            })
            .collect(),
    }
}
