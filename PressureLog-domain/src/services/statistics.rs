use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::entities::record::BloodPressureRecord;
use crate::entities::user::UserStats;
use crate::services::classification::{classify_level, ClassificationLevel};

/// How many of the most recent records feed a user's running averages
pub const USER_STATS_SAMPLE: usize = 30;

/// Summary statistics over a window of records
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Stats {
    pub total_records: usize,
    pub avg_systolic: Option<f64>,
    pub avg_diastolic: Option<f64>,
    pub min_systolic: Option<i32>,
    pub max_systolic: Option<i32>,
    pub min_diastolic: Option<i32>,
    pub max_diastolic: Option<i32>,
}

/// Aggregate the records measured within `window_days` before `now`.
///
/// Averages are left unrounded. With no records in the window every value
/// other than the count is `None`.
pub fn aggregate(records: &[BloodPressureRecord], window_days: u32, now: DateTime<Utc>) -> Stats {
    let start = now
        .checked_sub_signed(Duration::days(window_days as i64))
        .unwrap_or(DateTime::<Utc>::MIN_UTC);
    let in_window: Vec<&BloodPressureRecord> = records
        .iter()
        .filter(|r| r.measure_time >= start && r.measure_time <= now)
        .collect();

    if in_window.is_empty() {
        return Stats::default();
    }

    let count = in_window.len() as f64;
    let systolic_sum: i64 = in_window.iter().map(|r| r.systolic as i64).sum();
    let diastolic_sum: i64 = in_window.iter().map(|r| r.diastolic as i64).sum();

    Stats {
        total_records: in_window.len(),
        avg_systolic: Some(systolic_sum as f64 / count),
        avg_diastolic: Some(diastolic_sum as f64 / count),
        min_systolic: in_window.iter().map(|r| r.systolic).min(),
        max_systolic: in_window.iter().map(|r| r.systolic).max(),
        min_diastolic: in_window.iter().map(|r| r.diastolic).min(),
        max_diastolic: in_window.iter().map(|r| r.diastolic).max(),
    }
}

/// Count of records per severity tier. Every tier is present, zeros included.
pub fn distribution(records: &[BloodPressureRecord]) -> BTreeMap<ClassificationLevel, usize> {
    let mut counts: BTreeMap<ClassificationLevel, usize> =
        ClassificationLevel::ALL.iter().map(|level| (*level, 0)).collect();

    for record in records {
        *counts.entry(classify_level(record.systolic, record.diastolic)).or_insert(0) += 1;
    }

    counts
}

/// Round an average to the nearest whole mmHg
pub fn round_average(value: Option<f64>) -> Option<i32> {
    value.map(|v| v.round() as i32)
}

/// Rebuild a user's denormalized stats after a record change.
///
/// `recent` holds the user's most recent records (at most
/// [`USER_STATS_SAMPLE`]), `total` the full count. A user left with no
/// records has no last record date.
pub fn recompute_user_stats(total: usize, recent: &[BloodPressureRecord], now: DateTime<Utc>) -> UserStats {
    let sample = &recent[..recent.len().min(USER_STATS_SAMPLE)];

    let (average_systolic, average_diastolic) = if sample.is_empty() {
        (None, None)
    } else {
        let count = sample.len() as f64;
        let systolic: i64 = sample.iter().map(|r| r.systolic as i64).sum();
        let diastolic: i64 = sample.iter().map(|r| r.diastolic as i64).sum();
        (
            round_average(Some(systolic as f64 / count)),
            round_average(Some(diastolic as f64 / count)),
        )
    };

    UserStats {
        total_records: total as i64,
        average_systolic,
        average_diastolic,
        last_record_date: (total > 0).then_some(now),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::record::{BeforeMeasure, MeasureContext, Source, TimeOfDay};

    fn record(systolic: i32, diastolic: i32, measure_time: DateTime<Utc>) -> BloodPressureRecord {
        BloodPressureRecord {
            id: format!("{}-{}", systolic, diastolic),
            user_id: "u1".to_string(),
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
    }

    #[test]
    fn test_aggregate_empty() {
        let stats = aggregate(&[], 30, Utc::now());
        assert_eq!(stats.total_records, 0);
        assert_eq!(stats.avg_systolic, None);
        assert_eq!(stats.avg_diastolic, None);
        assert_eq!(stats.max_systolic, None);
        assert_eq!(stats.min_diastolic, None);
    }

    #[test]
    fn test_aggregate_two_records() {
        let now = Utc::now();
        let records = vec![
            record(120, 80, now - Duration::days(1)),
            record(130, 90, now - Duration::days(2)),
        ];

        let stats = aggregate(&records, 30, now);
        assert_eq!(stats.total_records, 2);
        assert_eq!(stats.avg_systolic, Some(125.0));
        assert_eq!(stats.avg_diastolic, Some(85.0));
        assert_eq!(stats.max_systolic, Some(130));
        assert_eq!(stats.min_systolic, Some(120));
        assert_eq!(stats.min_diastolic, Some(80));
        assert_eq!(stats.max_diastolic, Some(90));
    }

    #[test]
    fn test_aggregate_ignores_records_outside_window() {
        let now = Utc::now();
        let records = vec![
            record(120, 80, now - Duration::days(3)),
            record(170, 105, now - Duration::days(10)),
        ];

        let stats = aggregate(&records, 7, now);
        assert_eq!(stats.total_records, 1);
        assert_eq!(stats.max_systolic, Some(120));
    }

    #[test]
    fn test_averages_are_not_rounded() {
        let now = Utc::now();
        let records = vec![record(121, 80, now), record(122, 81, now)];
        let stats = aggregate(&records, 1, now);
        assert_eq!(stats.avg_systolic, Some(121.5));
        assert_eq!(round_average(stats.avg_systolic), Some(122));
    }

    #[test]
    fn test_aggregate_with_unbounded_window() {
        let now = Utc::now();
        let stats = aggregate(&[record(120, 80, now - Duration::days(3650))], u32::MAX, now);
        assert_eq!(stats.total_records, 1);
    }

    #[test]
    fn test_distribution_includes_every_tier() {
        let now = Utc::now();
        let records = vec![record(110, 70, now), record(115, 75, now), record(150, 95, now)];

        let counts = distribution(&records);
        assert_eq!(counts.len(), 6);
        assert_eq!(counts[&ClassificationLevel::Optimal], 2);
        assert_eq!(counts[&ClassificationLevel::MildHypertension], 1);
        assert_eq!(counts[&ClassificationLevel::SevereHypertension], 0);

        let json = serde_json::to_value(&counts).unwrap();
        assert_eq!(json["high_normal"], 0);
    }

    #[test]
    fn test_recompute_user_stats() {
        let now = Utc::now();
        let records = vec![record(120, 80, now), record(131, 85, now)];

        let stats = recompute_user_stats(12, &records, now);
        assert_eq!(stats.total_records, 12);
        assert_eq!(stats.average_systolic, Some(126));
        assert_eq!(stats.average_diastolic, Some(83));
        assert_eq!(stats.last_record_date, Some(now));

        let cleared = recompute_user_stats(0, &[], now);
        assert_eq!(cleared.average_systolic, None);
        assert_eq!(cleared.last_record_date, None);
    }

    #[test]
    fn test_recompute_uses_at_most_thirty_records() {
        let now = Utc::now();
        let mut records: Vec<_> = (0..30).map(|_| record(120, 80, now)).collect();
        records.push(record(200, 120, now - Duration::days(60)));

        let stats = recompute_user_stats(31, &records, now);
        assert_eq!(stats.average_systolic, Some(120));
    }
}
