//! Error types for the API server.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use saastack_core::error::{DomainError, ErrorKind};
use serde::Serialize;
use thiserror::Error;

/// Startup and runtime errors for the API server.
#[derive(Debug, Error)]
pub enum AppError {
    /// A required environment variable is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// Database connection or pool error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Schema migration error.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Tracing or OpenTelemetry setup error.
    #[error("telemetry error: {0}")]
    Telemetry(String),

    /// Network binding or I/O error.
    #[error("server error: {0}")]
    Server(#[from] std::io::Error),
}

/// JSON body returned for error responses.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error code.
    pub error: &'static str,
    /// Human-readable error message.
    pub message: String,
}

/// HTTP-layer wrapper around `DomainError` that implements `IntoResponse`.
#[derive(Debug)]
pub struct ApiError(pub DomainError);

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Conflicts tell the client to reload and retry.
        let (status, error_code) = match self.0.kind() {
            ErrorKind::EntityNotFound => (StatusCode::NOT_FOUND, "entity_not_found"),
            ErrorKind::EntityExists => (StatusCode::CONFLICT, "entity_exists"),
            ErrorKind::Validation => (StatusCode::BAD_REQUEST, "validation_error"),
            ErrorKind::Unexpected => (StatusCode::INTERNAL_SERVER_ERROR, "unexpected_error"),
        };

        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }

        let body = ErrorBody {
            error: error_code,
            message: self.0.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use saastack_core::error::ConcurrencyError;

    fn status_of(err: DomainError) -> StatusCode {
        let response = ApiError(err).into_response();
        response.status()
    }

    #[test]
    fn test_entity_not_found_maps_to_404() {
        assert_eq!(
            status_of(DomainError::EntityNotFound {
                container_name: "cars".into(),
                id: "anid".into(),
            }),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_concurrency_conflicts_map_to_409() {
        let conflicts = [
            ConcurrencyError::StreamReset {
                stream_name: "cars_anid".into(),
                attempted: 2,
            },
            ConcurrencyError::AlreadyUpdated {
                stream_name: "cars_anid".into(),
                stored: 2,
                attempted: 2,
            },
            ConcurrencyError::MissingUpdates {
                stream_name: "cars_anid".into(),
                stored: 2,
                attempted: 4,
            },
        ];
        for conflict in conflicts {
            assert_eq!(status_of(conflict.into()), StatusCode::CONFLICT);
        }
    }

    #[test]
    fn test_missing_identifier_maps_to_409() {
        assert_eq!(
            status_of(DomainError::MissingIdentifier {
                container_name: "cars".into(),
            }),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_validation_maps_to_400() {
        assert_eq!(
            status_of(DomainError::Validation("bad input".into())),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_infrastructure_maps_to_500() {
        assert_eq!(
            status_of(DomainError::Infrastructure("db down".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
