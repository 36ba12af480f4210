use tracing::warn;

use pressure_log_data::models::{StoredRecord, StoredUser};

use crate::entities::record::{
    Activity, BeforeMeasure, BloodPressureRecord, Device, Emotion, MeasureContext, Source, TimeOfDay,
};
use crate::entities::user::{User, UserSettings, UserStats};

/// Conversion functions between domain entities and storage models.
/// Names follow convert_to_[target_layer]_[model_name].

/// Convert from storage model to domain entity for a blood pressure record
pub fn convert_to_domain_record(stored: StoredRecord) -> BloodPressureRecord {
    let activity = Activity::parse(&stored.activity).unwrap_or_else(|| {
        warn!("Unknown activity '{}' on record {}", stored.activity, stored.id);
        Activity::default()
    });
    let emotion = Emotion::parse(&stored.emotion).unwrap_or_else(|| {
        warn!("Unknown emotion '{}' on record {}", stored.emotion, stored.id);
        Emotion::default()
    });
    let source = Source::parse(&stored.source).unwrap_or_default();

    let device = if stored.device_name.is_some() || stored.device_model.is_some() {
        Some(Device {
            name: stored.device_name,
            model: stored.device_model,
        })
    } else {
        None
    };

    BloodPressureRecord {
        id: stored.id,
        user_id: stored.user_id,
        systolic: stored.systolic,
        diastolic: stored.diastolic,
        measure_time: stored.measure_time,
        context: MeasureContext {
            time_of_day: TimeOfDay::for_time(&stored.measure_time),
            before_measure: BeforeMeasure { activity, emotion },
        },
        notes: stored.notes,
        source,
        device,
        created_at: stored.created_at,
        updated_at: stored.updated_at,
    }
}

/// Convert from domain entity to storage model for a blood pressure record
pub fn convert_to_data_record(record: &BloodPressureRecord) -> StoredRecord {
    let (device_name, device_model) = match &record.device {
        Some(device) => (device.name.clone(), device.model.clone()),
        None => (None, None),
    };

    StoredRecord {
        id: record.id.clone(),
        user_id: record.user_id.clone(),
        systolic: record.systolic,
        diastolic: record.diastolic,
        measure_time: record.measure_time,
        activity: record.context.before_measure.activity.as_str().to_string(),
        emotion: record.context.before_measure.emotion.as_str().to_string(),
        notes: record.notes.clone(),
        source: record.source.as_str().to_string(),
        device_name,
        device_model,
        created_at: record.created_at,
        updated_at: record.updated_at,
    }
}

/// Convert from storage model to domain entity for a user
pub fn convert_to_domain_user(stored: StoredUser) -> User {
    let settings = match serde_json::from_value::<UserSettings>(stored.settings) {
        Ok(settings) => settings,
        Err(e) => {
            warn!("Unreadable settings for user {}, using defaults: {}", stored.id, e);
            UserSettings::default()
        }
    };

    User {
        id: stored.id,
        open_id: stored.open_id,
        nickname: stored.nickname,
        avatar: stored.avatar,
        settings,
        stats: UserStats {
            total_records: stored.total_records,
            average_systolic: stored.average_systolic,
            average_diastolic: stored.average_diastolic,
            last_record_date: stored.last_record_date,
        },
        created_at: stored.created_at,
        updated_at: stored.updated_at,
    }
}

/// Convert from domain entity to storage model for a user
pub fn convert_to_data_user(user: &User) -> Result<StoredUser, serde_json::Error> {
    Ok(StoredUser {
        id: user.id.clone(),
        open_id: user.open_id.clone(),
        nickname: user.nickname.clone(),
        avatar: user.avatar.clone(),
        settings: serde_json::to_value(&user.settings)?,
        total_records: user.stats.total_records,
        average_systolic: user.stats.average_systolic,
        average_diastolic: user.stats.average_diastolic,
        last_record_date: user.stats.last_record_date,
        created_at: user.created_at,
        updated_at: user.updated_at,
    })
}
