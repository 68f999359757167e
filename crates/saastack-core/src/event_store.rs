//! Event store abstraction.

use async_trait::async_trait;

use crate::error::DomainError;
use crate::event::EventSourcedChangeEvent;

/// Returns the name of the stream holding `stream_key` within `container_name`.
#[must_use]
pub fn stream_name(container_name: &str, stream_key: &str) -> String {
    format!("{container_name}_{stream_key}")
}

/// Append-only store of versioned event streams.
///
/// Implementations must be safe for concurrent use and must reject a batch
/// atomically when it does not continue the stream (see
/// [`crate::concurrency::verify_concurrency_check`]).
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Loads every event in the stream, ordered by version. An unknown stream
    /// yields an empty list.
    async fn get_event_stream(
        &self,
        container_name: &str,
        stream_key: &str,
    ) -> Result<Vec<EventSourcedChangeEvent>, DomainError>;

    /// Appends `events` to the stream and returns the stream name.
    ///
    /// The version of the first event is checked against the last stored
    /// version before anything is written.
    async fn add_events(
        &self,
        container_name: &str,
        stream_key: &str,
        events: &[EventSourcedChangeEvent],
    ) -> Result<String, DomainError>;

    /// Removes every stream in the container. Intended for tests and
    /// administration only.
    async fn destroy_all(&self, container_name: &str) -> Result<(), DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_name_joins_container_and_key() {
        assert_eq!(stream_name("acontainername", "anid"), "acontainername_anid");
    }
}
