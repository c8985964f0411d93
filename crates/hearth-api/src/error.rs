use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// API failure taxonomy. Every store operation surfaces one of these to
/// the caller instead of raising across the component boundary, so the
/// UI can render a localized message and stay usable.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Rejected before any write: a required field was empty or a value
    /// was out of range.
    #[error("{0}")]
    Validation(String),

    /// Wrong admin name/password, missing/expired token, or a role the
    /// caller does not hold.
    #[error("{0}")]
    Unauthorized(String),

    /// The household is full; no record was created.
    #[error("{0}")]
    Capacity(String),

    #[error("{0}")]
    NotFound(String),

    /// Backend failure on a write path. Read paths that can degrade
    /// return empty results instead (see the rules listing).
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl ApiError {
    fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Unauthorized(_) => "unauthorized",
            Self::Capacity(_) => "capacity",
            Self::NotFound(_) => "not_found",
            Self::Storage(_) => "storage",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Capacity(_) => StatusCode::CONFLICT,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = match &self {
            // log the cause, keep the body generic
            Self::Storage(e) => {
                error!("storage error: {e:#}");
                "internal storage error".to_string()
            }
            other => other.to_string(),
        };

        (
            self.status(),
            Json(json!({ "error": message, "kind": self.kind() })),
        )
            .into_response()
    }
}

/// A blocking DB task that failed to join is a storage failure.
pub(crate) fn join_error(e: tokio::task::JoinError) -> ApiError {
    ApiError::Storage(anyhow::anyhow!("blocking task failed: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_and_statuses_line_up() {
        let cases: [(ApiError, StatusCode, &str); 4] = [
            (
                ApiError::Validation("x".into()),
                StatusCode::BAD_REQUEST,
                "validation",
            ),
            (
                ApiError::Unauthorized("x".into()),
                StatusCode::UNAUTHORIZED,
                "unauthorized",
            ),
            (
                ApiError::Capacity("x".into()),
                StatusCode::CONFLICT,
                "capacity",
            ),
            (
                ApiError::NotFound("x".into()),
                StatusCode::NOT_FOUND,
                "not_found",
            ),
        ];

        for (err, status, kind) in cases {
            assert_eq!(err.status(), status);
            assert_eq!(err.kind(), kind);
        }
    }
}
