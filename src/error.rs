use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use thiserror::Error;

use crate::models::ErrorResponse;

/// Request-level error taxonomy.
///
/// Conflicts that resolve by re-reading (duplicate like under race) surface
/// as `AlreadyExists` with a 400, so callers can tell "already done" apart
/// from "not allowed" (`Policy`/`Forbidden`) and "not found". Storage
/// corruption after a conflict re-read is `Internal` and is never masked.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    AlreadyExists(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Policy(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    fn kind(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "validation_failed",
            ApiError::AlreadyExists(_) => "already_exists",
            ApiError::NotFound(_) => "not_found",
            ApiError::Forbidden(_) => "forbidden",
            ApiError::Policy(_) => "policy_violation",
            ApiError::Internal(_) => "internal_error",
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::AlreadyExists(_) | ApiError::Policy(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("request failed: {}", self);
        }

        HttpResponse::build(status).json(ErrorResponse {
            error: self.kind().to_string(),
            message: self.to_string(),
            status_code: status.as_u16(),
        })
    }
}

impl From<crate::services::store::StoreError> for ApiError {
    fn from(err: crate::services::store::StoreError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<crate::services::directory::DirectoryError> for ApiError {
    fn from(err: crate::services::directory::DirectoryError) -> Self {
        match err {
            crate::services::directory::DirectoryError::NotFound(msg) => ApiError::NotFound(msg),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<crate::services::coordinator::CoordinatorError> for ApiError {
    fn from(err: crate::services::coordinator::CoordinatorError) -> Self {
        use crate::services::coordinator::CoordinatorError;
        match err {
            CoordinatorError::SelfLike => {
                ApiError::Policy("you cannot like yourself".to_string())
            }
            CoordinatorError::AlreadyLiked => {
                ApiError::AlreadyExists("you already liked this user".to_string())
            }
            CoordinatorError::MatchLost { .. } => ApiError::Internal(err.to_string()),
            CoordinatorError::Store(inner) => ApiError::Internal(inner.to_string()),
        }
    }
}
