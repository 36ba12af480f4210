pub mod classification;
pub mod validation;
pub mod statistics;
pub mod blood_pressure;
pub mod users;

// Domain services
// This module contains business logic implementations.

// Re-export service traits and their implementations
pub use blood_pressure::{BloodPressureService, BloodPressureServiceTrait, ListQuery, RecordPage, ServiceError, StatsSummary};
pub use users::{LoginInput, LoginOutcome, SystemStats, UserPage, UserService, UserServiceTrait};
