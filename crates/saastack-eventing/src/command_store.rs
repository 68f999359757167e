//! Event-sourced command store.
//!
//! Loads an aggregate by replaying its event stream and saves it by
//! appending only the changes raised since it was loaded. Concurrency is
//! left entirely to the event store's version-checked append: a stale
//! aggregate fails to save and must be reloaded by the caller.

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use saastack_core::aggregate::EventSourcedAggregate;
use saastack_core::error::DomainError;
use saastack_core::event_store::EventStore;
use saastack_core::factory::{AggregateHydration, DomainFactory};
use saastack_core::identifier::Identifier;
use saastack_core::migration::EventMigrator;
use tracing::{debug, instrument};

use crate::notifications::{
    EventStreamChanged, EventStreamNotifier, EventStreamObserver, SubscriptionId,
};

/// Loads and saves aggregates of type `A`.
#[async_trait]
pub trait CommandStore<A: EventSourcedAggregate>: Send + Sync {
    /// Loads the aggregate with the given identifier.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::EntityNotFound` if the stream is empty or ends
    /// with a tombstone, or any error from the event store, factory or replay.
    async fn load(&self, id: &Identifier) -> Result<A, DomainError>;

    /// Persists the changes raised on `aggregate` since it was loaded.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::MissingIdentifier` if the aggregate has no
    /// identifier, or any error from the event store (including concurrency
    /// conflicts). On error the aggregate keeps its pending changes.
    async fn save(&self, aggregate: &mut A) -> Result<(), DomainError>;

    /// Removes every stream in the store's container.
    ///
    /// # Errors
    ///
    /// Returns any error from the event store.
    async fn destroy_all(&self) -> Result<(), DomainError>;
}

/// [`CommandStore`] backed by an [`EventStore`].
pub struct EventSourcingCommandStore<A> {
    container_name: String,
    event_store: Arc<dyn EventStore>,
    domain_factory: Arc<DomainFactory>,
    migrator: Arc<dyn EventMigrator>,
    notifier: Arc<EventStreamNotifier>,
    _aggregate: PhantomData<fn() -> A>,
}

impl<A: EventSourcedAggregate> EventSourcingCommandStore<A> {
    /// Creates a store for the streams in `container_name`.
    #[must_use]
    pub fn new(
        container_name: impl Into<String>,
        event_store: Arc<dyn EventStore>,
        domain_factory: Arc<DomainFactory>,
        migrator: Arc<dyn EventMigrator>,
    ) -> Self {
        Self {
            container_name: container_name.into(),
            event_store,
            domain_factory,
            migrator,
            notifier: Arc::new(EventStreamNotifier::new()),
            _aggregate: PhantomData,
        }
    }

    /// Publishes stream changes to a shared notifier instead of a private one.
    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<EventStreamNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// The container this store reads and writes.
    #[must_use]
    pub fn container_name(&self) -> &str {
        &self.container_name
    }

    /// The notifier changes are published to.
    #[must_use]
    pub fn notifier(&self) -> &Arc<EventStreamNotifier> {
        &self.notifier
    }

    /// Registers an observer for changes saved through this store.
    pub fn subscribe(&self, observer: Arc<dyn EventStreamObserver>) -> SubscriptionId {
        self.notifier.subscribe(observer)
    }

    fn not_found(&self, id: &Identifier) -> DomainError {
        DomainError::EntityNotFound {
            container_name: self.container_name.clone(),
            id: id.to_string(),
        }
    }
}

impl<A> std::fmt::Debug for EventSourcingCommandStore<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSourcingCommandStore")
            .field("container_name", &self.container_name)
            .field("aggregate", &std::any::type_name::<A>())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<A: EventSourcedAggregate> CommandStore<A> for EventSourcingCommandStore<A> {
    #[instrument(skip(self), fields(container = %self.container_name, id = %id))]
    async fn load(&self, id: &Identifier) -> Result<A, DomainError> {
        let events = self
            .event_store
            .get_event_stream(&self.container_name, id.as_str())
            .await?;

        let Some(latest) = events.last() else {
            debug!("event stream is empty");
            return Err(self.not_found(id));
        };
        if latest.is_tombstone() {
            debug!(version = latest.version, "event stream is deleted");
            return Err(self.not_found(id));
        }

        let hydration = AggregateHydration {
            id: id.clone(),
            last_persisted_at_utc: events.iter().rev().find_map(|event| event.last_persisted_at_utc),
        };
        let mut aggregate: A = self.domain_factory.rehydrate_aggregate_root(hydration)?;

        let count = events.len();
        aggregate.load_changes(events, self.migrator.as_ref())?;

        debug!(count, "replayed event stream");
        Ok(aggregate)
    }

    #[instrument(skip(self, aggregate), fields(container = %self.container_name, id = %aggregate.id()))]
    async fn save(&self, aggregate: &mut A) -> Result<(), DomainError> {
        if aggregate.id().is_empty() {
            return Err(DomainError::MissingIdentifier {
                container_name: self.container_name.clone(),
            });
        }

        let changes = aggregate.get_changes();
        if changes.is_empty() {
            debug!("no changes to save");
            return Ok(());
        }

        let stream_name = self
            .event_store
            .add_events(&self.container_name, aggregate.id().as_str(), &changes)
            .await?;

        aggregate.clear_changes();
        debug!(stream = %stream_name, count = changes.len(), "saved changes");

        self.notifier.publish(&EventStreamChanged {
            container_name: self.container_name.clone(),
            stream_name,
            events: changes,
        });
        Ok(())
    }

    #[instrument(skip(self), fields(container = %self.container_name))]
    async fn destroy_all(&self) -> Result<(), DomainError> {
        self.event_store.destroy_all(&self.container_name).await
    }
}
