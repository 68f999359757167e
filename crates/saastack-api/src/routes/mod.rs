//! HTTP routes.

use axum::Router;

use crate::state::AppState;

pub mod event_streams;
pub mod health;

/// Builds the application router with every route mounted.
pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(health::router())
        .nest("/api/v1/streams", event_streams::router())
        .with_state(state)
}
