//! `PostgreSQL` implementation of the `EventStore` trait.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::{debug, instrument, warn};

use saastack_core::clock::{Clock, SystemClock};
use saastack_core::concurrency::{verify_concurrency_check, verify_contiguous_batch};
use saastack_core::error::{ConcurrencyError, DomainError};
use saastack_core::event::{EventMetadata, EventSourcedChangeEvent};
use saastack_core::event_store::{EventStore, stream_name};

use crate::schema;

/// PostgreSQL-backed event store.
///
/// Appends run in a single transaction holding an advisory lock on the
/// stream, so the version check and the inserts cannot interleave with
/// another writer. Dropping an append before it commits rolls it back.
#[derive(Clone)]
pub struct PgEventStore {
    pool: PgPool,
    clock: Arc<dyn Clock>,
}

impl PgEventStore {
    /// Creates a new `PgEventStore` stamping events with the system time.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self::with_clock(pool, Arc::new(SystemClock))
    }

    /// Creates a new `PgEventStore` stamping events with `clock`.
    #[must_use]
    pub fn with_clock(pool: PgPool, clock: Arc<dyn Clock>) -> Self {
        Self { pool, clock }
    }
}

impl fmt::Debug for PgEventStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PgEventStore")
            .field("pool", &self.pool)
            .finish_non_exhaustive()
    }
}

#[derive(sqlx::FromRow)]
struct EventRow {
    id: String,
    root_id: String,
    entity_type: String,
    event_type: String,
    data: serde_json::Value,
    metadata: String,
    version: i64,
    last_persisted_at_utc: DateTime<Utc>,
}

impl From<EventRow> for EventSourcedChangeEvent {
    fn from(row: EventRow) -> Self {
        Self {
            id: row.id,
            root_id: row.root_id,
            entity_type: row.entity_type,
            event_type: row.event_type,
            data: row.data,
            metadata: EventMetadata::new(row.metadata),
            version: row.version,
            last_persisted_at_utc: Some(row.last_persisted_at_utc),
        }
    }
}

fn infrastructure(context: &str, err: &sqlx::Error) -> DomainError {
    DomainError::Infrastructure(format!("{context}: {err}"))
}

#[async_trait]
impl EventStore for PgEventStore {
    #[instrument(skip(self), err)]
    async fn get_event_stream(
        &self,
        container_name: &str,
        stream_key: &str,
    ) -> Result<Vec<EventSourcedChangeEvent>, DomainError> {
        let rows: Vec<EventRow> = sqlx::query_as(schema::SELECT_STREAM)
            .bind(container_name)
            .bind(stream_key)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| infrastructure("failed to load event stream", &e))?;

        debug!(count = rows.len(), "loaded event stream");
        Ok(rows.into_iter().map(EventSourcedChangeEvent::from).collect())
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

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| infrastructure("failed to begin transaction", &e))?;

        sqlx::query(schema::LOCK_STREAM)
            .bind(&name)
            .execute(&mut *tx)
            .await
            .map_err(|e| infrastructure("failed to lock stream", &e))?;

        let last_stored: Option<i64> = sqlx::query_scalar(schema::SELECT_LAST_VERSION)
            .bind(container_name)
            .bind(stream_key)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| infrastructure("failed to read stream version", &e))?;

        if let Err(conflict) = verify_concurrency_check(&name, last_stored, first.version)
            .and_then(|()| verify_contiguous_batch(&name, events))
        {
            warn!(error = %conflict, "rejected append to event stream");
            return Err(conflict.into());
        }

        let persisted_at = self.clock.now();
        for event in events {
            sqlx::query(schema::INSERT_EVENT)
                .bind(&event.id)
                .bind(container_name)
                .bind(stream_key)
                .bind(&event.root_id)
                .bind(&event.entity_type)
                .bind(&event.event_type)
                .bind(&event.data)
                .bind(event.metadata.schema())
                .bind(event.version)
                .bind(persisted_at)
                .execute(&mut *tx)
                .await
                .map_err(|e| match &e {
                    sqlx::Error::Database(db)
                        if db.is_unique_violation()
                            && db.constraint() == Some(schema::STREAM_VERSION_CONSTRAINT) =>
                    {
                        DomainError::from(ConcurrencyError::AlreadyUpdated {
                            stream_name: name.clone(),
                            stored: event.version,
                            attempted: event.version,
                        })
                    }
                    _ => infrastructure("failed to append event", &e),
                })?;
        }

        tx.commit()
            .await
            .map_err(|e| infrastructure("failed to commit events", &e))?;

        debug!(stream = %name, version = first.version, "appended events");
        Ok(name)
    }

    #[instrument(skip(self), err)]
    async fn destroy_all(&self, container_name: &str) -> Result<(), DomainError> {
        let result = sqlx::query(schema::DELETE_CONTAINER)
            .bind(container_name)
            .execute(&self.pool)
            .await
            .map_err(|e| infrastructure("failed to destroy container", &e))?;

        debug!(deleted = result.rows_affected(), "destroyed event streams");
        Ok(())
    }
}
