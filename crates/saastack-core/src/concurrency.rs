//! Optimistic concurrency checks for event streams.
//!
//! Every adapter runs these before committing a batch. They are the only
//! guard against lost updates between writers of the same stream.

use crate::error::ConcurrencyError;
use crate::event::EventSourcedChangeEvent;

/// Version of the first event in every stream.
pub const FIRST_VERSION: i64 = 1;

/// Verifies that a batch starting at `first_version_to_append` continues the
/// stream exactly after `last_stored_version`.
///
/// # Errors
///
/// - [`ConcurrencyError::StreamReset`] if the stream is empty and the batch
///   does not start at [`FIRST_VERSION`].
/// - [`ConcurrencyError::AlreadyUpdated`] if the stream already holds the
///   attempted version.
/// - [`ConcurrencyError::MissingUpdates`] if the attempted version would
///   leave a gap.
pub fn verify_concurrency_check(
    stream_name: &str,
    last_stored_version: Option<i64>,
    first_version_to_append: i64,
) -> Result<(), ConcurrencyError> {
    let Some(stored) = last_stored_version else {
        if first_version_to_append != FIRST_VERSION {
            return Err(ConcurrencyError::StreamReset {
                stream_name: stream_name.to_owned(),
                attempted: first_version_to_append,
            });
        }
        return Ok(());
    };

    if first_version_to_append <= stored {
        return Err(ConcurrencyError::AlreadyUpdated {
            stream_name: stream_name.to_owned(),
            stored,
            attempted: first_version_to_append,
        });
    }

    if first_version_to_append > stored + 1 {
        return Err(ConcurrencyError::MissingUpdates {
            stream_name: stream_name.to_owned(),
            stored,
            attempted: first_version_to_append,
        });
    }

    Ok(())
}

/// Verifies that the versions within a batch are consecutive.
///
/// # Errors
///
/// Returns [`ConcurrencyError::MissingUpdates`] at the first event whose
/// version does not follow its predecessor.
pub fn verify_contiguous_batch(
    stream_name: &str,
    events: &[EventSourcedChangeEvent],
) -> Result<(), ConcurrencyError> {
    for pair in events.windows(2) {
        let (previous, next) = (&pair[0], &pair[1]);
        if next.version != previous.version + 1 {
            return Err(ConcurrencyError::MissingUpdates {
                stream_name: stream_name.to_owned(),
                stored: previous.version,
                attempted: next.version,
            });
        }
    }
    Ok(())
}
