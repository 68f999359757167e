//! SaaStack API server library.
//!
//! Exposes configuration, telemetry, and the HTTP routes so the binary and
//! the integration tests build the same application.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;
pub mod telemetry;
