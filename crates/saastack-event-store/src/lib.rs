//! SaaStack event stores.
//!
//! Adapters implementing [`saastack_core::event_store::EventStore`]: an
//! in-memory store for tests and local development, and a PostgreSQL store.

pub mod memory_event_store;
pub mod pg_event_store;
pub mod schema;
