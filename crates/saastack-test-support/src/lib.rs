//! Shared test doubles and fixtures for the SaaStack backend.

mod clock;
mod counter;
mod event_store;

pub use clock::FixedClock;
pub use counter::{Counter, CounterEvent, counter_factory, stored_counter_event};
pub use event_store::{
    ConflictingEventStore, EmptyEventStore, FailingEventStore, RecordingEventStore,
};
