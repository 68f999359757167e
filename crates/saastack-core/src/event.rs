//! Domain event abstractions and the persisted change-event envelope.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Reserved event type marking a stream as permanently deleted.
pub const STREAM_DELETED_EVENT_TYPE: &str = "stream.deleted";

/// Schema name recorded for tombstone events.
pub const STREAM_DELETED_SCHEMA: &str = "saastack.stream_deleted.v1";

/// Declared schema of an event payload, used to pick a deserializer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventMetadata(String);

impl EventMetadata {
    /// Creates metadata for the given schema name.
    #[must_use]
    pub fn new(schema: impl Into<String>) -> Self {
        Self(schema.into())
    }

    /// The schema name.
    #[must_use]
    pub fn schema(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Envelope around a single domain event, as stored in an event stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventSourcedChangeEvent {
    /// Unique event identifier.
    pub id: String,
    /// Aggregate this event belongs to.
    pub root_id: String,
    /// Type name of the aggregate that raised the event.
    pub entity_type: String,
    /// Logical event type name.
    pub event_type: String,
    /// Serialized event payload.
    pub data: serde_json::Value,
    /// Declared payload schema.
    pub metadata: EventMetadata,
    /// 1-based position within the stream.
    pub version: i64,
    /// When the event was durably stored; `None` until appended.
    pub last_persisted_at_utc: Option<DateTime<Utc>>,
}

impl EventSourcedChangeEvent {
    /// Returns `true` if this event marks its stream as deleted.
    #[must_use]
    pub fn is_tombstone(&self) -> bool {
        self.event_type == STREAM_DELETED_EVENT_TYPE
    }
}

/// Trait that all domain events implement.
///
/// Events are usually an enum per aggregate; `SCHEMA` names that enum's
/// current serialized shape so older shapes can be migrated on replay.
pub trait DomainEvent: Serialize + DeserializeOwned + Send + Sync + fmt::Debug {
    /// Schema name written into [`EventMetadata`].
    const SCHEMA: &'static str;

    /// Returns the logical event type name.
    fn event_type(&self) -> &'static str;
}
