//! Shared test helpers for API integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use saastack_core::clock::Clock;
use saastack_event_store::memory_event_store::InMemoryEventStore;
use saastack_test_support::FixedClock;
use tower::ServiceExt;

use saastack_api::routes;
use saastack_api::state::AppState;

/// Fixed timestamp used across all integration tests.
fn fixed_clock() -> Arc<dyn Clock> {
    Arc::new(FixedClock(
        chrono::TimeZone::with_ymd_and_hms(&chrono::Utc, 2026, 1, 15, 10, 0, 0).unwrap(),
    ))
}

/// An in-memory event store stamped by the fixed clock.
pub fn event_store() -> Arc<InMemoryEventStore> {
    Arc::new(InMemoryEventStore::with_clock(fixed_clock()))
}

/// Build the full app router over `event_store`. Uses the same route
/// structure as `main.rs`.
pub fn build_test_app(event_store: Arc<InMemoryEventStore>) -> Router {
    routes::router(AppState::new(event_store))
}

/// Send a GET request and return the response.
pub async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();

    (status, json)
}
