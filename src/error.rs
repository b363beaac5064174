//! Error types for testimonial operations
//!
//! Errors are classified by who can fix them:
//! - Client errors: malformed ids or bodies, missing fields, missing session
//! - Not found: the id does not exist or belongs to another principal
//! - Server faults: store or runtime failures, safe to retry by resubmitting

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use crate::db::DbError;

/// Error type for testimonial services and HTTP handlers
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Not signed in")]
    Unauthorized,

    // Wrong owner and missing id are deliberately indistinguishable.
    #[error("Testimonial {0} not found")]
    NotFound(i64),

    #[error("Database error: {0}")]
    Db(#[from] DbError),

    #[error("Background task failed: {0}")]
    Task(String),
}

impl ServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServiceError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ServiceError::Unauthorized => StatusCode::UNAUTHORIZED,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Db(_) | ServiceError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::BadRequest(_) => ErrorKind::BadRequest,
            ServiceError::Validation(_) => ErrorKind::Validation,
            ServiceError::Unauthorized => ErrorKind::Unauthorized,
            ServiceError::NotFound(_) => ErrorKind::NotFound,
            ServiceError::Db(_) | ServiceError::Task(_) => ErrorKind::Internal,
        }
    }

    /// Returns true if resubmitting the same request may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, ServiceError::Db(_) | ServiceError::Task(_))
    }
}

/// Serializable error body returned by every failing endpoint
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub error: String,
    pub kind: ErrorKind,
    pub can_retry: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    BadRequest,
    Validation,
    Unauthorized,
    NotFound,
    Internal,
}

impl From<&ServiceError> for ErrorBody {
    fn from(err: &ServiceError) -> Self {
        // Store and runtime details stay in the server log.
        let error = match err.kind() {
            ErrorKind::Internal => "Internal server error".to_string(),
            _ => err.to_string(),
        };
        ErrorBody {
            error,
            kind: err.kind(),
            can_retry: err.is_retryable(),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            log::error!("Request failed: {}", self);
        } else {
            log::warn!("Request rejected ({}): {}", status.as_u16(), self);
        }
        (status, Json(ErrorBody::from(&self))).into_response()
    }
}
