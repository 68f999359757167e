//! In-memory implementation of the `EventStore` trait.
//!
//! Used by command store tests and local development without a database.
//! Enforces the same concurrency rules as the PostgreSQL store.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use saastack_core::clock::{Clock, SystemClock};
use saastack_core::concurrency::{verify_concurrency_check, verify_contiguous_batch};
use saastack_core::error::DomainError;
use saastack_core::event::EventSourcedChangeEvent;
use saastack_core::event_store::{EventStore, stream_name};

type StreamKey = (String, String);

/// Event store holding every stream in process memory.
pub struct InMemoryEventStore {
    streams: RwLock<HashMap<StreamKey, Vec<EventSourcedChangeEvent>>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryEventStore {
    /// Creates an empty store stamping events with the system time.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Creates an empty store stamping events with `clock`.
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            streams: RwLock::new(HashMap::new()),
            clock,
        }
    }
}

impl Default for InMemoryEventStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for InMemoryEventStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryEventStore").finish_non_exhaustive()
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    #[instrument(skip(self))]
    async fn get_event_stream(
        &self,
        container_name: &str,
        stream_key: &str,
    ) -> Result<Vec<EventSourcedChangeEvent>, DomainError> {
        let streams = self.streams.read().await;
        let events = streams
            .get(&(container_name.to_owned(), stream_key.to_owned()))
            .cloned()
            .unwrap_or_default();
        Ok(events)
    }

    #[instrument(skip(self, events), fields(count = events.len()), err)]
    async fn add_events(
        &self,
        container_name: &str,
        stream_key: &str,
        events: &[EventSourcedChangeEvent],
    ) -> Result<String, DomainError> {
        let name = stream_name(container_name, stream_key);
        let Some(first) = events.first() else {
            return Ok(name);
        };

        let key = (container_name.to_owned(), stream_key.to_owned());
        let mut streams = self.streams.write().await;

        let last_stored = streams
            .get(&key)
            .and_then(|stream| stream.last())
            .map(|event| event.version);
        if let Err(conflict) = verify_concurrency_check(&name, last_stored, first.version)
            .and_then(|()| verify_contiguous_batch(&name, events))
        {
            warn!(stream = %name, error = %conflict, "rejected append to event stream");
            return Err(conflict.into());
        }

        let persisted_at = self.clock.now();
        streams.entry(key).or_default().extend(events.iter().cloned().map(|mut event| {
            event.last_persisted_at_utc = Some(persisted_at);
            event
        }));

        debug!(stream = %name, count = events.len(), "appended events");
        Ok(name)
    }

    #[instrument(skip(self))]
    async fn destroy_all(&self, container_name: &str) -> Result<(), DomainError> {
        self.streams
            .write()
            .await
            .retain(|(container, _), _| container != container_name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use saastack_core::error::ConcurrencyError;
    use saastack_core::event::EventMetadata;
    use saastack_test_support::FixedClock;

    fn make_change_event(root_id: &str, version: i64) -> EventSourcedChangeEvent {
        EventSourcedChangeEvent {
            id: format!("{root_id}-{version}"),
            root_id: root_id.to_owned(),
            entity_type: "car".to_owned(),
            event_type: "car.registered".to_owned(),
            data: serde_json::json!({"key": "value"}),
            metadata: EventMetadata::new("car_event.v1"),
            version,
            last_persisted_at_utc: None,
        }
    }

    fn store() -> InMemoryEventStore {
        let fixed_now = Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap();
        InMemoryEventStore::with_clock(Arc::new(FixedClock(fixed_now)))
    }

    #[tokio::test]
    async fn test_get_event_stream_returns_empty_for_unknown_stream() {
        let store = store();

        let events = store.get_event_stream("cars", "anid").await.unwrap();

        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn test_add_events_stamps_persisted_time_and_preserves_order() {
        // Arrange
        let store = store();
        let events = vec![
            make_change_event("anid", 1),
            make_change_event("anid", 2),
            make_change_event("anid", 3),
        ];

        // Act
        let name = store.add_events("cars", "anid", &events).await.unwrap();

        // Assert
        assert_eq!(name, "cars_anid");
        let loaded = store.get_event_stream("cars", "anid").await.unwrap();
        assert_eq!(loaded.len(), 3);
        let fixed_now = Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap();
        for (i, event) in loaded.iter().enumerate() {
            assert_eq!(event.version, i64::try_from(i + 1).unwrap());
            assert_eq!(event.last_persisted_at_utc, Some(fixed_now));
        }
    }

    #[tokio::test]
    async fn test_add_events_rejects_stream_reset() {
        let store = store();

        let result = store
            .add_events("cars", "anid", &[make_change_event("anid", 2)])
            .await;

        match result {
            Err(DomainError::ConcurrencyConflict(ConcurrencyError::StreamReset {
                attempted, ..
            })) => assert_eq!(attempted, 2),
            other => panic!("expected StreamReset, got {other:?}"),
        }
        assert!(store.get_event_stream("cars", "anid").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rejected_appends_to_unknown_streams_leave_no_entries() {
        // Arrange
        let store = store();

        // Act
        for i in 0..100 {
            let key = format!("k{i}");
            let result = store
                .add_events("cars", &key, &[make_change_event(&key, 2)])
                .await;
            assert!(result.is_err());
        }

        // Assert
        assert!(store.streams.read().await.is_empty());
    }

    #[tokio::test]
    async fn test_add_events_rejects_stale_writer() {
        let store = store();
        store
            .add_events(
                "cars",
                "anid",
                &[make_change_event("anid", 1), make_change_event("anid", 2)],
            )
            .await
            .unwrap();

        let result = store
            .add_events("cars", "anid", &[make_change_event("anid", 2)])
            .await;

        match result {
            Err(DomainError::ConcurrencyConflict(ConcurrencyError::AlreadyUpdated {
                stored,
                attempted,
                ..
            })) => {
                assert_eq!(stored, 2);
                assert_eq!(attempted, 2);
            }
            other => panic!("expected AlreadyUpdated, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_add_events_rejects_gap_and_writes_nothing() {
        let store = store();
        store
            .add_events("cars", "anid", &[make_change_event("anid", 1)])
            .await
            .unwrap();

        let result = store
            .add_events(
                "cars",
                "anid",
                &[make_change_event("anid", 2), make_change_event("anid", 4)],
            )
            .await;

        assert!(matches!(
            result,
            Err(DomainError::ConcurrencyConflict(
                ConcurrencyError::MissingUpdates { .. }
            ))
        ));
        assert_eq!(store.get_event_stream("cars", "anid").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_add_empty_batch_is_noop() {
        let store = store();

        let name = store.add_events("cars", "anid", &[]).await.unwrap();

        assert_eq!(name, "cars_anid");
        assert!(store.get_event_stream("cars", "anid").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_destroy_all_only_clears_named_container() {
        let store = store();
        store
            .add_events("cars", "anid", &[make_change_event("anid", 1)])
            .await
            .unwrap();
        store
            .add_events("boats", "anid", &[make_change_event("anid", 1)])
            .await
            .unwrap();

        store.destroy_all("cars").await.unwrap();

        assert!(store.get_event_stream("cars", "anid").await.unwrap().is_empty());
        assert_eq!(store.get_event_stream("boats", "anid").await.unwrap().len(), 1);
    }
}
