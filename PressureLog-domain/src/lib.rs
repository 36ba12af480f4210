// PressureLog Domain
// This crate contains the business logic for the PressureLog application

// Services that implement business logic
pub mod services;

// Authentication
pub mod auth;

// Domain entities
pub mod entities;

// Health checks and system status
pub mod health;

// Development fallback payloads
pub mod mock;

// Re-export the data layer for convenience
pub use pressure_log_data as data;
