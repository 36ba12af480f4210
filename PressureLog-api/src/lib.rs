// PressureLog-api lib.rs
//
// HTTP surface of the PressureLog service: router, handlers, wire entities,
// configuration and API documentation.

// Public modules
pub mod api;
pub mod config;
pub mod entities;
pub mod openapi;
pub mod state;
