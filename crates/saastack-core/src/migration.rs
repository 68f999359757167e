//! Migration of stored events written under older payload schemas.

use std::collections::HashMap;

use crate::error::DomainError;
use crate::event::{EventMetadata, EventSourcedChangeEvent};

/// An event payload translated to its current schema.
#[derive(Debug, Clone, PartialEq)]
pub struct MigratedEvent {
    /// The schema the payload now conforms to.
    pub metadata: EventMetadata,
    /// The payload.
    pub data: serde_json::Value,
}

/// Translates stored events into the shape the current code understands.
pub trait EventMigrator: Send + Sync {
    /// Returns the payload of `event` in its current schema.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the event cannot be migrated.
    fn migrate(&self, event: &EventSourcedChangeEvent) -> Result<MigratedEvent, DomainError>;
}

/// Migrator that returns every event unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEventMigrator;

impl EventMigrator for NoopEventMigrator {
    fn migrate(&self, event: &EventSourcedChangeEvent) -> Result<MigratedEvent, DomainError> {
        Ok(MigratedEvent {
            metadata: event.metadata.clone(),
            data: event.data.clone(),
        })
    }
}

/// Migrator that renames payload schemas, for events whose type was renamed
/// without changing its serialized fields.
#[derive(Debug, Clone, Default)]
pub struct ChangeEventTypeMigrator {
    renames: HashMap<String, String>,
}

impl ChangeEventTypeMigrator {
    /// Creates a migrator with no renames.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Maps events stored under `old_schema` to `new_schema`.
    #[must_use]
    pub fn with_rename(mut self, old_schema: impl Into<String>, new_schema: impl Into<String>) -> Self {
        self.renames.insert(old_schema.into(), new_schema.into());
        self
    }
}

impl EventMigrator for ChangeEventTypeMigrator {
    fn migrate(&self, event: &EventSourcedChangeEvent) -> Result<MigratedEvent, DomainError> {
        let metadata = match self.renames.get(event.metadata.schema()) {
            Some(renamed) => {
                tracing::debug!(
                    event_id = %event.id,
                    from = %event.metadata,
                    to = %renamed,
                    "migrating renamed event schema"
                );
                EventMetadata::new(renamed.clone())
            }
            None => event.metadata.clone(),
        };
        Ok(MigratedEvent {
            metadata,
            data: event.data.clone(),
        })
    }
}
