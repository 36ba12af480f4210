// PressureLog Data
// This crate handles storage of blood pressure records and user documents

// Database connection management
#[cfg(feature = "sqlite")]
pub mod database;

// Repository traits and storage adapters
pub mod repository;

// Data storage models
pub mod models;
