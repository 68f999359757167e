//! Domain error types.

use thiserror::Error;

/// Rejection raised when an append would not continue a stream in sequence.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConcurrencyError {
    /// The stream has no history, so it may only begin at the first version.
    #[error("stream {stream_name} has no events and cannot start at version {attempted}")]
    StreamReset {
        /// The stream that was written to.
        stream_name: String,
        /// The version of the first event in the rejected batch.
        attempted: i64,
    },

    /// Another writer has already advanced the stream to or past the
    /// attempted version.
    #[error(
        "stream {stream_name} was already updated to version {stored}, cannot append version {attempted}"
    )]
    AlreadyUpdated {
        /// The stream that was written to.
        stream_name: String,
        /// The last version currently stored.
        stored: i64,
        /// The version of the first event in the rejected batch.
        attempted: i64,
    },

    /// The attempted version leaves a gap after the stored version.
    #[error(
        "stream {stream_name} is missing updates between stored version {stored} and version {attempted}"
    )]
    MissingUpdates {
        /// The stream that was written to.
        stream_name: String,
        /// The last version currently stored.
        stored: i64,
        /// The version that would have created the gap.
        attempted: i64,
    },
}

/// Coarse classification of a [`DomainError`], used by outer layers to pick
/// a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The entity does not exist or has been deleted.
    EntityNotFound,
    /// The write conflicts with what is already stored.
    EntityExists,
    /// Input failed domain validation.
    Validation,
    /// Anything raised by infrastructure.
    Unexpected,
}

/// Top-level domain error type.
#[derive(Debug, Error)]
pub enum DomainError {
    /// No live event stream exists for the aggregate.
    #[error("entity not found: {container_name} {id}")]
    EntityNotFound {
        /// The container (stream family) that was searched.
        container_name: String,
        /// The aggregate identifier.
        id: String,
    },

    /// An aggregate without an identifier cannot be persisted.
    #[error("aggregate in {container_name} has no identifier")]
    MissingIdentifier {
        /// The container the aggregate was to be saved to.
        container_name: String,
    },

    /// Optimistic concurrency conflict.
    #[error("concurrency conflict: {0}")]
    ConcurrencyConflict(#[from] ConcurrencyError),

    /// A validation error in domain logic.
    #[error("validation error: {0}")]
    Validation(String),

    /// An infrastructure/persistence error.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}

impl DomainError {
    /// Returns the classification of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::EntityNotFound { .. } => ErrorKind::EntityNotFound,
            Self::MissingIdentifier { .. } | Self::ConcurrencyConflict(_) => ErrorKind::EntityExists,
            Self::Validation(_) => ErrorKind::Validation,
            Self::Infrastructure(_) => ErrorKind::Unexpected,
        }
    }
}
