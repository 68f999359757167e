//! Mock `EventStore` implementations for tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use saastack_core::error::{ConcurrencyError, DomainError};
use saastack_core::event::EventSourcedChangeEvent;
use saastack_core::event_store::{EventStore, stream_name};

/// One recorded `add_events` call: container, stream key and the batch.
pub type AppendedBatch = (String, String, Vec<EventSourcedChangeEvent>);

/// An event store that records every call. Returns the configured stream
/// from every `get_event_stream` call and always accepts `add_events`.
#[derive(Debug)]
pub struct RecordingEventStore {
    stream: Vec<EventSourcedChangeEvent>,
    loads: Mutex<Vec<(String, String)>>,
    appended: Mutex<Vec<AppendedBatch>>,
    destroyed: Mutex<Vec<String>>,
}

impl RecordingEventStore {
    /// Create a recording store that returns `stream` from every load.
    #[must_use]
    pub fn new(stream: Vec<EventSourcedChangeEvent>) -> Self {
        Self {
            stream,
            loads: Mutex::new(Vec::new()),
            appended: Mutex::new(Vec::new()),
            destroyed: Mutex::new(Vec::new()),
        }
    }

    /// Returns every `(container, stream key)` that was loaded.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn loads(&self) -> Vec<(String, String)> {
        self.loads.lock().unwrap().clone()
    }

    /// Returns a snapshot of every batch that was appended.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn appended_events(&self) -> Vec<AppendedBatch> {
        self.appended.lock().unwrap().clone()
    }

    /// Returns every container passed to `destroy_all`.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn destroyed(&self) -> Vec<String> {
        self.destroyed.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventStore for RecordingEventStore {
    async fn get_event_stream(
        &self,
        container_name: &str,
        stream_key: &str,
    ) -> Result<Vec<EventSourcedChangeEvent>, DomainError> {
        self.loads
            .lock()
            .unwrap()
            .push((container_name.to_owned(), stream_key.to_owned()));
        Ok(self.stream.clone())
    }

    async fn add_events(
        &self,
        container_name: &str,
        stream_key: &str,
        events: &[EventSourcedChangeEvent],
    ) -> Result<String, DomainError> {
        self.appended.lock().unwrap().push((
            container_name.to_owned(),
            stream_key.to_owned(),
            events.to_vec(),
        ));
        Ok(stream_name(container_name, stream_key))
    }

    async fn destroy_all(&self, container_name: &str) -> Result<(), DomainError> {
        self.destroyed.lock().unwrap().push(container_name.to_owned());
        Ok(())
    }
}

/// An event store whose streams are always empty and which silently accepts
/// appends. Useful for "entity not found" scenarios.
#[derive(Debug)]
pub struct EmptyEventStore;

#[async_trait]
impl EventStore for EmptyEventStore {
    async fn get_event_stream(
        &self,
        _container_name: &str,
        _stream_key: &str,
    ) -> Result<Vec<EventSourcedChangeEvent>, DomainError> {
        Ok(vec![])
    }

    async fn add_events(
        &self,
        container_name: &str,
        stream_key: &str,
        _events: &[EventSourcedChangeEvent],
    ) -> Result<String, DomainError> {
        Ok(stream_name(container_name, stream_key))
    }

    async fn destroy_all(&self, _container_name: &str) -> Result<(), DomainError> {
        Ok(())
    }
}

/// An event store that always returns an infrastructure error. Useful for
/// testing error-handling paths.
#[derive(Debug)]
pub struct FailingEventStore;

#[async_trait]
impl EventStore for FailingEventStore {
    async fn get_event_stream(
        &self,
        _container_name: &str,
        _stream_key: &str,
    ) -> Result<Vec<EventSourcedChangeEvent>, DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }

    async fn add_events(
        &self,
        _container_name: &str,
        _stream_key: &str,
        _events: &[EventSourcedChangeEvent],
    ) -> Result<String, DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }

    async fn destroy_all(&self, _container_name: &str) -> Result<(), DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }
}

/// An event store that loads normally but rejects every append as if another
/// writer had already advanced the stream.
#[derive(Debug)]
pub struct ConflictingEventStore {
    stream: Vec<EventSourcedChangeEvent>,
    attempts: AtomicUsize,
}

impl ConflictingEventStore {
    /// Create a store that returns `stream` from every load.
    #[must_use]
    pub fn new(stream: Vec<EventSourcedChangeEvent>) -> Self {
        Self {
            stream,
            attempts: AtomicUsize::new(0),
        }
    }

    /// Number of rejected appends.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EventStore for ConflictingEventStore {
    async fn get_event_stream(
        &self,
        _container_name: &str,
        _stream_key: &str,
    ) -> Result<Vec<EventSourcedChangeEvent>, DomainError> {
        Ok(self.stream.clone())
    }

    async fn add_events(
        &self,
        container_name: &str,
        stream_key: &str,
        events: &[EventSourcedChangeEvent],
    ) -> Result<String, DomainError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let attempted = events.first().map_or(0, |event| event.version);
        Err(ConcurrencyError::AlreadyUpdated {
            stream_name: stream_name(container_name, stream_key),
            stored: attempted,
            attempted,
        }
        .into())
    }

    async fn destroy_all(&self, _container_name: &str) -> Result<(), DomainError> {
        Ok(())
    }
}
