//! Stream-changed notifications.
//!
//! Observers register explicitly with an [`EventStreamNotifier`]; the
//! command store publishes to it after every successful append.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use saastack_core::event::EventSourcedChangeEvent;
use tokio::sync::broadcast;
use tracing::trace;

/// Events that were just appended to one stream.
#[derive(Debug, Clone, PartialEq)]
pub struct EventStreamChanged {
    /// The container the stream belongs to.
    pub container_name: String,
    /// The stream name returned by the event store.
    pub stream_name: String,
    /// The appended events, in version order.
    pub events: Vec<EventSourcedChangeEvent>,
}

/// Receives stream-changed notifications, synchronously, on the saving task.
pub trait EventStreamObserver: Send + Sync {
    /// Called once per successful save.
    fn on_event_stream_changed(&self, change: &EventStreamChanged);
}

/// Handle returned by [`EventStreamNotifier::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Subscriptions = Vec<(SubscriptionId, Arc<dyn EventStreamObserver>)>;

/// Ordered list of observers.
#[derive(Default)]
pub struct EventStreamNotifier {
    observers: RwLock<Subscriptions>,
    next_id: AtomicU64,
}

impl EventStreamNotifier {
    /// Creates a notifier with no observers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an observer. Observers are notified in registration order.
    pub fn subscribe(&self, observer: Arc<dyn EventStreamObserver>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.observers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, observer));
        id
    }

    /// Removes an observer. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut observers = self
            .observers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = observers.len();
        observers.retain(|(existing, _)| *existing != id);
        observers.len() != before
    }

    /// Number of registered observers.
    pub fn observer_count(&self) -> usize {
        self.observers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Delivers `change` to every observer before returning.
    pub fn publish(&self, change: &EventStreamChanged) {
        // Snapshot so observers may subscribe or unsubscribe while notified.
        let observers: Vec<Arc<dyn EventStreamObserver>> = self
            .observers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, observer)| Arc::clone(observer))
            .collect();

        trace!(
            stream = %change.stream_name,
            observers = observers.len(),
            "publishing event stream change"
        );
        for observer in observers {
            observer.on_event_stream_changed(change);
        }
    }
}

impl fmt::Debug for EventStreamNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStreamNotifier")
            .field("observers", &self.observer_count())
            .finish()
    }
}

/// Observer that forwards every change onto a `tokio` broadcast channel, for
/// subscribers that process changes on their own tasks.
#[derive(Debug, Clone)]
pub struct BroadcastObserver {
    sender: broadcast::Sender<EventStreamChanged>,
}

impl BroadcastObserver {
    /// Creates an observer buffering up to `capacity` changes per receiver.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Opens a new receiver that sees every change published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<EventStreamChanged> {
        self.sender.subscribe()
    }
}

impl EventStreamObserver for BroadcastObserver {
    fn on_event_stream_changed(&self, change: &EventStreamChanged) {
        if self.sender.send(change.clone()).is_err() {
            trace!(stream = %change.stream_name, "no broadcast receivers for event stream change");
        }
    }
}
