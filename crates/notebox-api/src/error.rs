use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use notebox_types::api::ErrorBody;

/// Failures of the note service. Each kind maps to exactly one HTTP status.
#[derive(Debug, Error)]
pub enum NoteError {
    /// The authenticated caller has no backing user record.
    #[error("User not found with username: {0}")]
    IdentityNotFound(String),

    /// The note does not exist or has been soft-deleted.
    #[error("Note not found with id: {0}")]
    NotFound(i64),

    /// The note exists but belongs to someone else.
    #[error("You are not allowed to access note {0}")]
    Forbidden(i64),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// Everything a handler can fail with.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Unauthenticated(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Conflict(String),

    /// An extractor refused the request (bad path segment, malformed body).
    /// Keeps the status axum chose for it.
    #[error("{message}")]
    Rejected { status: StatusCode, message: String },

    #[error(transparent)]
    Note(#[from] NoteError),

    #[error("{0}")]
    ServiceUnavailable(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn unauthenticated(message: impl Into<String>) -> Self {
        ApiError::Unauthenticated(message.into())
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::Internal(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Rejected { status, .. } => *status,
            ApiError::Note(NoteError::IdentityNotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Note(NoteError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Note(NoteError::Forbidden(_)) => StatusCode::FORBIDDEN,
            ApiError::Note(NoteError::Storage(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-safe message. Storage errors are logged, never echoed.
    fn public_message(&self) -> String {
        match self {
            ApiError::Note(NoteError::Storage(e)) => {
                error!("Storage error: {:#}", e);
                "An error occurred while processing your request".to_string()
            }
            ApiError::Internal(msg) => {
                error!("Internal error: {}", msg);
                "An error occurred while processing your request".to_string()
            }
            other => other.to_string(),
        }
    }

    pub fn body(&self) -> ErrorBody {
        let status = self.status();
        ErrorBody {
            timestamp: chrono::Utc::now(),
            status: status.as_u16(),
            error: status.canonical_reason().unwrap_or("Unknown").to_string(),
            message: self.public_message(),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Note(NoteError::Storage(err))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.body())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn note_errors_map_to_one_status_each() {
        let cases = [
            (NoteError::IdentityNotFound("ghost".into()), StatusCode::NOT_FOUND),
            (NoteError::NotFound(1), StatusCode::NOT_FOUND),
            (NoteError::Forbidden(1), StatusCode::FORBIDDEN),
            (
                NoteError::Storage(anyhow::anyhow!("disk on fire")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).status(), expected);
        }
    }

    #[test]
    fn body_carries_reason_phrase() {
        let body = ApiError::from(NoteError::Forbidden(3)).body();
        assert_eq!(body.status, 403);
        assert_eq!(body.error, "Forbidden");
        assert_eq!(body.message, "You are not allowed to access note 3");
    }

    #[test]
    fn rejection_keeps_its_status() {
        let err = ApiError::Rejected {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            message: "missing field `content`".into(),
        };
        let body = err.body();
        assert_eq!(body.status, 422);
        assert_eq!(body.error, "Unprocessable Entity");
        assert_eq!(body.message, "missing field `content`");
    }

    #[test]
    fn storage_details_are_not_exposed() {
        let body = ApiError::from(NoteError::Storage(anyhow::anyhow!("SQLITE_BUSY at /var/db"))).body();
        assert_eq!(body.status, 500);
        assert!(!body.message.contains("SQLITE_BUSY"));
    }
}
