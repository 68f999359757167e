//! Event-sourcing domain abstractions.
//!
//! This crate defines the aggregate, event and event store contracts that
//! the persistence adapters and command stores build on. It contains no
//! infrastructure code.

pub mod aggregate;
pub mod clock;
pub mod concurrency;
pub mod error;
pub mod event;
pub mod event_store;
pub mod factory;
pub mod identifier;
pub mod migration;
