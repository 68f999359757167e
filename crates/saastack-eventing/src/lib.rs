//! Persistence of event-sourced aggregates.
//!
//! [`command_store::EventSourcingCommandStore`] loads an aggregate by
//! replaying its stream and saves only the changes raised since, then tells
//! subscribers through [`notifications::EventStreamNotifier`].

pub mod command_store;
pub mod notifications;
