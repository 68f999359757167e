//! SQL used by the PostgreSQL event store.
//!
//! The table itself is created by `migrations/` at the workspace root.

/// Unique constraint on `(container_name, stream_key, version)`.
pub const STREAM_VERSION_CONSTRAINT: &str = "event_streams_stream_version_key";

/// Serializes writers of one stream for the rest of the transaction.
pub const LOCK_STREAM: &str = "SELECT pg_advisory_xact_lock(hashtext($1))";

/// Highest stored version of a stream, `NULL` when the stream is empty.
pub const SELECT_LAST_VERSION: &str = r"
SELECT MAX(version)
FROM event_streams
WHERE container_name = $1 AND stream_key = $2
";

/// Every event of a stream in version order.
pub const SELECT_STREAM: &str = r"
SELECT id, root_id, entity_type, event_type, data, metadata, version, last_persisted_at_utc
FROM event_streams
WHERE container_name = $1 AND stream_key = $2
ORDER BY version ASC
";

/// Appends one event.
pub const INSERT_EVENT: &str = r"
INSERT INTO event_streams (
    id, container_name, stream_key, root_id, entity_type, event_type,
    data, metadata, version, last_persisted_at_utc
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
";

/// Removes every stream in a container.
pub const DELETE_CONTAINER: &str = "DELETE FROM event_streams WHERE container_name = $1";
