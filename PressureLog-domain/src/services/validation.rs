use chrono::{DateTime, Utc};
use serde::Serialize;
use validator::{Validate, ValidationErrors};

use crate::entities::record::NewRecord;

/// Accepted systolic range (mmHg), inclusive
pub const SYSTOLIC_RANGE: (i32, i32) = (60, 300);

/// Accepted diastolic range (mmHg), inclusive
pub const DIASTOLIC_RANGE: (i32, i32) = (30, 200);

/// Outcome of validating a reading. Collects every problem found.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<String>,
}

impl ValidationResult {
    fn from_errors(errors: Vec<String>) -> Self {
        Self {
            is_valid: errors.is_empty(),
            errors,
        }
    }
}

/// Check a pair of readings. Never fails; reports all errors at once.
pub fn validate(systolic: Option<i32>, diastolic: Option<i32>) -> ValidationResult {
    let mut errors = Vec::new();

    match systolic {
        None => errors.push("Systolic pressure is required".to_string()),
        Some(value) if value < SYSTOLIC_RANGE.0 || value > SYSTOLIC_RANGE.1 => errors.push(format!(
            "Systolic must be between {} and {} mmHg",
            SYSTOLIC_RANGE.0, SYSTOLIC_RANGE.1
        )),
        _ => {}
    }

    match diastolic {
        None => errors.push("Diastolic pressure is required".to_string()),
        Some(value) if value < DIASTOLIC_RANGE.0 || value > DIASTOLIC_RANGE.1 => errors.push(format!(
            "Diastolic must be between {} and {} mmHg",
            DIASTOLIC_RANGE.0, DIASTOLIC_RANGE.1
        )),
        _ => {}
    }

    if let (Some(s), Some(d)) = (systolic, diastolic) {
        if s <= d {
            errors.push("Systolic must exceed diastolic".to_string());
        }
    }

    ValidationResult::from_errors(errors)
}

/// Check a complete record as of `now`: the readings, the measure time and
/// the field constraints declared on [`NewRecord`].
pub fn validate_record(record: &NewRecord, now: DateTime<Utc>) -> ValidationResult {
    let mut errors = validate(Some(record.systolic), Some(record.diastolic)).errors;

    if let Some(measure_time) = record.measure_time {
        if measure_time > now {
            errors.push("Measure time cannot be in the future".to_string());
        }
    }

    if let Err(field_errors) = record.validate() {
        errors.extend(format_validation_errors(&field_errors));
    }

    ValidationResult::from_errors(errors)
}

/// Flatten `validator` field errors into readable messages
pub fn format_validation_errors(errors: &ValidationErrors) -> Vec<String> {
    let mut messages = Vec::new();
    for (field, errs) in errors.field_errors() {
        for err in errs.iter() {
            match &err.message {
                Some(msg) => messages.push(msg.to_string()),
                None => messages.push(format!("Invalid {}", field)),
            }
        }
    }
    // field_errors() is a HashMap
    messages.sort();
    messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_valid_reading() {
        let result = validate(Some(120), Some(80));
        assert!(result.is_valid);
        assert!(result.errors.is_empty());
    }

    #[test]
    fn test_range_limits_are_inclusive() {
        assert!(validate(Some(60), Some(30)).is_valid);
        assert!(validate(Some(300), Some(200)).is_valid);
        assert!(!validate(Some(59), Some(40)).is_valid);
        assert!(!validate(Some(301), Some(100)).is_valid);
        assert!(!validate(Some(120), Some(29)).is_valid);
    }

    #[test]
    fn test_systolic_must_exceed_diastolic() {
        let result = validate(Some(90), Some(90));
        assert!(!result.is_valid);
        assert_eq!(result.errors, vec!["Systolic must exceed diastolic".to_string()]);

        assert!(!validate(Some(80), Some(95)).is_valid);
    }

    #[test]
    fn test_errors_accumulate() {
        let result = validate(Some(50), Some(250));
        assert!(!result.is_valid);
        assert_eq!(result.errors.len(), 3);

        let missing = validate(None, None);
        assert_eq!(missing.errors.len(), 2);
        assert!(missing.errors[0].contains("required"));
    }

    #[test]
    fn test_future_measure_time_rejected() {
        let now = Utc::now();
        let mut record = NewRecord::with_values(120, 80);
        record.measure_time = Some(now + Duration::minutes(5));

        let result = validate_record(&record, now);
        assert!(!result.is_valid);
        assert!(result.errors.iter().any(|e| e.contains("future")));

        record.measure_time = Some(now);
        assert!(validate_record(&record, now).is_valid);
    }

    #[test]
    fn test_long_notes_rejected() {
        let mut record = NewRecord::with_values(120, 80);
        record.notes = Some("x".repeat(201));

        let result = validate_record(&record, Utc::now());
        assert_eq!(result.errors, vec!["Notes cannot exceed 200 characters".to_string()]);

        record.notes = Some("x".repeat(200));
        assert!(validate_record(&record, Utc::now()).is_valid);
    }
}
