//! Shared application state.

use std::fmt;
use std::sync::Arc;

use saastack_core::event_store::EventStore;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// The event store backing every container.
    pub event_store: Arc<dyn EventStore>,
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(event_store: Arc<dyn EventStore>) -> Self {
        Self { event_store }
    }
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState").finish_non_exhaustive()
    }
}
