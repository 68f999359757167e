//! Event-sourced aggregate root abstraction.

use std::mem;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::DomainError;
use crate::event::{
    DomainEvent, EventMetadata, EventSourcedChangeEvent, STREAM_DELETED_EVENT_TYPE,
    STREAM_DELETED_SCHEMA,
};
use crate::factory::AggregateHydration;
use crate::identifier::Identifier;
use crate::migration::EventMigrator;

/// Event bookkeeping shared by every event-sourced aggregate: the history
/// replayed from storage and the changes raised since.
#[derive(Debug, Clone, Default)]
pub struct AggregateEvents {
    id: Identifier,
    last_persisted_at_utc: Option<DateTime<Utc>>,
    loaded: Vec<EventSourcedChangeEvent>,
    pending: Vec<EventSourcedChangeEvent>,
}

impl AggregateEvents {
    /// Bookkeeping for a brand-new aggregate.
    #[must_use]
    pub fn new(id: Identifier) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    /// Bookkeeping for an aggregate about to replay its stored history.
    #[must_use]
    pub fn from_hydration(hydration: AggregateHydration) -> Self {
        Self {
            id: hydration.id,
            last_persisted_at_utc: hydration.last_persisted_at_utc,
            ..Self::default()
        }
    }

    /// The aggregate identifier.
    #[must_use]
    pub fn id(&self) -> &Identifier {
        &self.id
    }

    /// When the newest loaded event was persisted.
    #[must_use]
    pub fn last_persisted_at_utc(&self) -> Option<DateTime<Utc>> {
        self.last_persisted_at_utc
    }

    /// Events replayed from storage (plus any saved since).
    #[must_use]
    pub fn loaded(&self) -> &[EventSourcedChangeEvent] {
        &self.loaded
    }

    /// Events raised but not yet persisted.
    #[must_use]
    pub fn pending(&self) -> &[EventSourcedChangeEvent] {
        &self.pending
    }

    /// The version of the newest event, loaded or pending. Zero for an
    /// aggregate with no events.
    #[allow(clippy::cast_possible_wrap)]
    #[must_use]
    pub fn version(&self) -> i64 {
        let loaded = self.loaded.last().map_or(0, |event| event.version);
        loaded + self.pending.len() as i64
    }

    fn next_version(&self) -> i64 {
        self.version() + 1
    }

    fn push_pending(
        &mut self,
        entity_type: &str,
        event_type: &str,
        metadata: EventMetadata,
        data: serde_json::Value,
    ) {
        let change = EventSourcedChangeEvent {
            id: Uuid::new_v4().to_string(),
            root_id: self.id.to_string(),
            entity_type: entity_type.to_owned(),
            event_type: event_type.to_owned(),
            data,
            metadata,
            version: self.next_version(),
            last_persisted_at_utc: None,
        };
        self.pending.push(change);
    }
}

/// Trait for aggregate roots whose state is derived from an event stream.
///
/// Implementors own an [`AggregateEvents`] and fold their own events in
/// `on_state_changed`; everything else is provided.
pub trait EventSourcedAggregate: Send + Sync + Sized + 'static {
    /// The event type this aggregate produces and consumes.
    type Event: DomainEvent;

    /// Type name recorded on every change event.
    const AGGREGATE_TYPE: &'static str;

    /// Shared event bookkeeping.
    fn events(&self) -> &AggregateEvents;

    /// Mutable access to the shared event bookkeeping.
    fn events_mut(&mut self) -> &mut AggregateEvents;

    /// Apply an event to mutate internal state.
    ///
    /// # Errors
    ///
    /// Returns a `DomainError` if the event is not valid for the current state.
    fn on_state_changed(&mut self, event: &Self::Event) -> Result<(), DomainError>;

    /// Returns the aggregate identifier.
    fn id(&self) -> &Identifier {
        self.events().id()
    }

    /// Returns the history replayed from storage.
    fn loaded_change_events(&self) -> &[EventSourcedChangeEvent] {
        self.events().loaded()
    }

    /// Returns when the newest loaded event was persisted.
    fn last_persisted_at_utc(&self) -> Option<DateTime<Utc>> {
        self.events().last_persisted_at_utc()
    }

    /// Returns the current version.
    fn version(&self) -> i64 {
        self.events().version()
    }

    /// Replays a stored history into this aggregate.
    ///
    /// Tombstones are recorded but not applied.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if an event cannot be migrated
    /// or deserialized, or whatever `on_state_changed` returns.
    fn load_changes(
        &mut self,
        history: Vec<EventSourcedChangeEvent>,
        migrator: &dyn EventMigrator,
    ) -> Result<(), DomainError> {
        for change in history.iter().filter(|change| !change.is_tombstone()) {
            let event = deserialize_change::<Self::Event>(change, migrator)?;
            self.on_state_changed(&event)?;
        }
        self.events_mut().loaded = history;
        Ok(())
    }

    /// Applies a new event and records it as a pending change.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the event cannot be
    /// serialized, or whatever `on_state_changed` returns.
    fn raise_change(&mut self, event: Self::Event) -> Result<(), DomainError> {
        let data = serde_json::to_value(&event)
            .map_err(|e| DomainError::Infrastructure(format!("event serialization failed: {e}")))?;
        self.on_state_changed(&event)?;
        self.events_mut().push_pending(
            Self::AGGREGATE_TYPE,
            event.event_type(),
            EventMetadata::new(<Self::Event as DomainEvent>::SCHEMA),
            data,
        );
        Ok(())
    }

    /// Records a tombstone, marking the aggregate as permanently deleted once
    /// saved.
    fn raise_tombstone(&mut self) {
        self.events_mut().push_pending(
            Self::AGGREGATE_TYPE,
            STREAM_DELETED_EVENT_TYPE,
            EventMetadata::new(STREAM_DELETED_SCHEMA),
            serde_json::json!({}),
        );
    }

    /// Returns the changes raised since the aggregate was loaded or last
    /// saved, in the order they were raised.
    fn get_changes(&self) -> Vec<EventSourcedChangeEvent> {
        self.events().pending().to_vec()
    }

    /// Marks every pending change as persisted.
    fn clear_changes(&mut self) {
        let events = self.events_mut();
        let persisted = mem::take(&mut events.pending);
        events.loaded.extend(persisted);
    }
}

fn deserialize_change<E: DomainEvent>(
    change: &EventSourcedChangeEvent,
    migrator: &dyn EventMigrator,
) -> Result<E, DomainError> {
    let migrated = migrator.migrate(change)?;
    if migrated.metadata.schema() != E::SCHEMA {
        return Err(DomainError::Infrastructure(format!(
            "event {} has schema {}, expected {}",
            change.id,
            migrated.metadata,
            E::SCHEMA
        )));
    }
    serde_json::from_value(migrated.data)
        .map_err(|e| DomainError::Infrastructure(format!("event deserialization failed: {e}")))
}
