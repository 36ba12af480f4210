// Public entities for the PressureLog API
// Wire shapes only; every field is camelCase on the wire.

// Response envelope, errors and pagination
pub mod common;

// Blood pressure records and statistics
pub mod blood_pressure;

// Users and system statistics
pub mod user;

// Login and account settings
pub mod auth;

// Service health
pub mod health;
