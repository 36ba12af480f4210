// Domain entities and value objects
pub mod record;
pub mod user;
pub mod conversions;

// Re-export common types for easier imports
pub use record::{
    Activity, BeforeMeasure, BloodPressureRecord, Device, Emotion, MeasureContext, NewRecord, RecordUpdate, Source,
    TimeOfDay,
};
pub use user::{DataSharing, NormalRange, Reminders, User, UserSettings, UserStats, UserStatus, ValueRange};
