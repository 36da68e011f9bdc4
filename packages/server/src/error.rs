use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use common::storage::StorageError;
use serde::Serialize;
use thiserror::Error;

use crate::activity::ActivityError;
use crate::store::StoreError;

/// Failure of a bag lifecycle operation.
///
/// An integrity mismatch is not an error; `validate` reports it through
/// [`crate::service::Validation`].
#[derive(Debug, Error)]
pub enum BagError {
    /// A record or container that must exist does not, or a unique lookup
    /// matched several records.
    #[error("not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Storage(StorageError),

    #[error(transparent)]
    Store(StoreError),

    #[error("activity: {0}")]
    Activity(#[from] ActivityError),

    #[error("{0}")]
    Unhandled(String),
}

impl BagError {
    /// Stable tag for logs and error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            BagError::NotFound(_) => "not_found",
            BagError::Storage(_) => "storage_failure",
            BagError::Store(_) => "store_failure",
            BagError::Activity(_) => "activity_failure",
            BagError::Unhandled(_) => "unhandled",
        }
    }
}

impl From<StoreError> for BagError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(key) => BagError::NotFound(format!("bag for {key}")),
            StoreError::Ambiguous { key, count } => {
                BagError::NotFound(format!("no unique bag for {key} ({count} records)"))
            }
            other => BagError::Store(other),
        }
    }
}

impl From<StorageError> for BagError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::SourceNotFound(id) => BagError::NotFound(format!("file {id}")),
            StorageError::ContainerNotFound(id) => BagError::NotFound(format!("bag container {id}")),
            other => BagError::Storage(other),
        }
    }
}

pub type BagResult<T> = Result<T, BagError>;

/// Structured error response returned by all endpoints on failure.
#[derive(Serialize)]
pub struct ErrorBody {
    /// Machine-readable error code. One of: `VALIDATION_ERROR`, `TOKEN_MISSING`,
    /// `TOKEN_INVALID`, `NOT_FOUND`, `INTERNAL_ERROR`.
    pub code: &'static str,
    /// Human-readable error description.
    pub message: String,
}

/// Application-level error type.
#[derive(Debug)]
pub enum AppError {
    Validation(String),
    TokenMissing,
    TokenInvalid,
    NotFound(String),
    Internal(String),
}

impl AppError {
    fn status_and_body(self) -> (StatusCode, ErrorBody) {
        match self {
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    code: "VALIDATION_ERROR",
                    message: msg,
                },
            ),
            AppError::TokenMissing => (
                StatusCode::UNAUTHORIZED,
                ErrorBody {
                    code: "TOKEN_MISSING",
                    message: "Authentication required".into(),
                },
            ),
            AppError::TokenInvalid => (
                StatusCode::UNAUTHORIZED,
                ErrorBody {
                    code: "TOKEN_INVALID",
                    message: "Invalid or expired token".into(),
                },
            ),
            AppError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                ErrorBody {
                    code: "NOT_FOUND",
                    message: msg,
                },
            ),
            AppError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        code: "INTERNAL_ERROR",
                        message: "An unexpected error occurred".into(),
                    },
                )
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = self.status_and_body();
        (status, Json(body)).into_response()
    }
}

impl From<BagError> for AppError {
    fn from(err: BagError) -> Self {
        match err {
            BagError::NotFound(msg) => AppError::NotFound(msg),
            BagError::Storage(StorageError::SizeLimitExceeded { actual, limit }) => {
                AppError::Validation(format!(
                    "Source is {actual} bytes, larger than the {limit} byte limit"
                ))
            }
            BagError::Storage(StorageError::UnsupportedAlgorithm(name)) => {
                AppError::Validation(format!("Unsupported hash algorithm '{name}'"))
            }
            BagError::Storage(StorageError::InvalidUser(_)) => AppError::TokenInvalid,
            other => AppError::Internal(format!("{}: {other}", other.kind())),
        }
    }
}
