// Storage models
// These mirror what is persisted, not what is served over the wire.

pub mod blood_pressure;
pub mod user;

pub use blood_pressure::{RecordQuery, StoredRecord};
pub use user::StoredUser;
