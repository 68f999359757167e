//! A minimal event-sourced aggregate for exercising stores in tests.

use chrono::{DateTime, Utc};
use saastack_core::aggregate::{AggregateEvents, EventSourcedAggregate};
use saastack_core::error::DomainError;
use saastack_core::event::{DomainEvent, EventMetadata, EventSourcedChangeEvent};
use saastack_core::factory::{AggregateHydration, DomainFactory};
use saastack_core::identifier::Identifier;
use serde::{Deserialize, Serialize};

/// Events raised by [`Counter`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CounterEvent {
    /// The counter was increased.
    Incremented {
        /// Amount added.
        by: i64,
    },
    /// The counter went back to zero.
    Reset,
}

impl DomainEvent for CounterEvent {
    const SCHEMA: &'static str = "counter_event.v1";

    fn event_type(&self) -> &'static str {
        match self {
            Self::Incremented { .. } => "counter.incremented",
            Self::Reset => "counter.reset",
        }
    }
}

/// A counter whose value is the sum of its increments since the last reset.
#[derive(Debug)]
pub struct Counter {
    events: AggregateEvents,
    value: i64,
}

impl Counter {
    /// Creates a new counter with no history.
    #[must_use]
    pub fn new(id: Identifier) -> Self {
        Self {
            events: AggregateEvents::new(id),
            value: 0,
        }
    }

    /// Rehydrates a counter before its history is replayed.
    #[must_use]
    pub fn rehydrate(hydration: AggregateHydration) -> Self {
        Self {
            events: AggregateEvents::from_hydration(hydration),
            value: 0,
        }
    }

    /// Current value.
    #[must_use]
    pub fn value(&self) -> i64 {
        self.value
    }

    /// Adds `by` to the counter.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if `by` is not positive.
    pub fn increment(&mut self, by: i64) -> Result<(), DomainError> {
        if by <= 0 {
            return Err(DomainError::Validation(format!(
                "increment must be positive, got {by}"
            )));
        }
        self.raise_change(CounterEvent::Incremented { by })
    }

    /// Resets the counter to zero.
    ///
    /// # Errors
    ///
    /// Returns `DomainError` if the event cannot be raised.
    pub fn reset(&mut self) -> Result<(), DomainError> {
        self.raise_change(CounterEvent::Reset)
    }
}

impl EventSourcedAggregate for Counter {
    type Event = CounterEvent;
    const AGGREGATE_TYPE: &'static str = "counter";

    fn events(&self) -> &AggregateEvents {
        &self.events
    }

    fn events_mut(&mut self) -> &mut AggregateEvents {
        &mut self.events
    }

    fn on_state_changed(&mut self, event: &CounterEvent) -> Result<(), DomainError> {
        match event {
            CounterEvent::Incremented { by } => self.value += by,
            CounterEvent::Reset => self.value = 0,
        }
        Ok(())
    }
}

/// A domain factory that can rehydrate [`Counter`].
#[must_use]
pub fn counter_factory() -> DomainFactory {
    DomainFactory::new().with_aggregate(|hydration| Ok(Counter::rehydrate(hydration)))
}

/// A persisted change event for a counter stream.
///
/// # Panics
///
/// Panics if `event` cannot be serialized.
#[must_use]
pub fn stored_counter_event(
    root_id: &str,
    version: i64,
    event: &CounterEvent,
    persisted_at: DateTime<Utc>,
) -> EventSourcedChangeEvent {
    EventSourcedChangeEvent {
        id: format!("{root_id}-{version}"),
        root_id: root_id.to_owned(),
        entity_type: Counter::AGGREGATE_TYPE.to_owned(),
        event_type: event.event_type().to_owned(),
        data: serde_json::to_value(event).expect("CounterEvent serialization is infallible"),
        metadata: EventMetadata::new(CounterEvent::SCHEMA),
        version,
        last_persisted_at_utc: Some(persisted_at),
    }
}
