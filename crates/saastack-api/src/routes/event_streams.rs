//! Read-only inspection of stored event streams.

use axum::extract::{Path, State};
use axum::{Json, Router, routing::get};
use saastack_core::error::DomainError;
use saastack_core::event::EventSourcedChangeEvent;
use saastack_core::event_store::stream_name;
use serde::Serialize;
use tracing::instrument;

use crate::error::ApiError;
use crate::state::AppState;

/// A stored stream as returned by `GET /api/v1/streams/{container}/{stream_key}`.
#[derive(Debug, Serialize)]
pub struct EventStreamResponse {
    pub stream_name: String,
    /// Version of the last stored event.
    pub version: i64,
    /// Whether the stream ends in a tombstone.
    pub deleted: bool,
    pub events: Vec<EventSourcedChangeEvent>,
}

#[instrument(skip(state))]
async fn get_event_stream(
    State(state): State<AppState>,
    Path((container_name, stream_key)): Path<(String, String)>,
) -> Result<Json<EventStreamResponse>, ApiError> {
    let events = state
        .event_store
        .get_event_stream(&container_name, &stream_key)
        .await?;

    let Some(last) = events.last() else {
        return Err(DomainError::EntityNotFound {
            container_name,
            id: stream_key,
        }
        .into());
    };

    Ok(Json(EventStreamResponse {
        stream_name: stream_name(&container_name, &stream_key),
        version: last.version,
        deleted: last.is_tombstone(),
        events,
    }))
}

/// Returns the event stream router.
pub fn router() -> Router<AppState> {
    Router::new().route("/{container}/{stream_key}", get(get_event_stream))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use chrono::{TimeZone, Utc};
    use http_body_util::BodyExt;
    use saastack_core::event_store::EventStore;
    use saastack_event_store::memory_event_store::InMemoryEventStore;
    use saastack_test_support::{CounterEvent, FailingEventStore, stored_counter_event};
    use tower::ServiceExt;

    use crate::routes;
    use crate::state::AppState;

    async fn get(state: AppState, uri: &str) -> (StatusCode, serde_json::Value) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let response = routes::router(state).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_returns_stored_events_in_order() {
        // Arrange
        let store = Arc::new(InMemoryEventStore::new());
        let at = Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap();
        store
            .add_events(
                "counters",
                "anid",
                &[
                    stored_counter_event("anid", 1, &CounterEvent::Incremented { by: 2 }, at),
                    stored_counter_event("anid", 2, &CounterEvent::Reset, at),
                ],
            )
            .await
            .unwrap();

        // Act
        let (status, json) = get(AppState::new(store), "/api/v1/streams/counters/anid").await;

        // Assert
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["stream_name"], "counters_anid");
        assert_eq!(json["version"], 2);
        assert_eq!(json["deleted"], false);
        assert_eq!(json["events"][0]["event_type"], "counter.incremented");
        assert_eq!(json["events"][1]["event_type"], "counter.reset");
    }

    #[tokio::test]
    async fn test_unknown_stream_returns_404() {
        let state = AppState::new(Arc::new(InMemoryEventStore::new()));

        let (status, json) = get(state, "/api/v1/streams/counters/missing").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"], "entity_not_found");
    }

    #[tokio::test]
    async fn test_store_failure_returns_500() {
        let state = AppState::new(Arc::new(FailingEventStore));

        let (status, json) = get(state, "/api/v1/streams/counters/anid").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"], "unexpected_error");
    }
}
