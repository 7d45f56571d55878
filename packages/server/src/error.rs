use std::fmt;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use common::storage::StorageError;
use sea_orm::DbErr;
use serde::Serialize;

/// Structured error response returned by all endpoints on failure.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    /// Machine-readable error code. One of: `VALIDATION_ERROR`,
    /// `INVALID_ARGUMENT`, `INVALID_CONTENT_TYPE`, `AUTH_MISSING`,
    /// `PERMISSION_DENIED`, `NOT_FOUND`, `CONFLICT`, `STORAGE_UNAVAILABLE`,
    /// `TRANSACTION_FAILURE`, `STREAM_FAILURE`, `INTERNAL_ERROR`.
    #[schema(example = "INVALID_CONTENT_TYPE")]
    pub code: &'static str,
    /// Human-readable error description.
    #[schema(example = "content type text/plain is not allowed")]
    pub message: String,
}

/// Application-level error type.
#[derive(Debug)]
pub enum AppError {
    /// Malformed request body or multipart structure.
    Validation(String),
    /// A parameter value outside its valid range (e.g. `page < 1`).
    InvalidArgument(String),
    /// Declared content type matches no allowed category prefix.
    InvalidContentType(String),
    /// The resolved caller identity header is absent.
    AuthMissing,
    NotFound(String),
    PermissionDenied,
    /// Duplicate identifier on insert. Defensive only; identifiers are
    /// server-generated.
    Conflict(String),
    /// Connection or pool failure before any statement ran.
    StorageUnavailable(String),
    /// Commit or rollback level failure.
    TransactionFailure(String),
    /// A byte relay was interrupted partway.
    StreamFailure(String),
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
            AppError::InvalidArgument(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    code: "INVALID_ARGUMENT",
                    message: msg,
                },
            ),
            AppError::InvalidContentType(content_type) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    code: "INVALID_CONTENT_TYPE",
                    message: format!("content type {content_type} is not allowed"),
                },
            ),
            AppError::AuthMissing => (
                StatusCode::UNAUTHORIZED,
                ErrorBody {
                    code: "AUTH_MISSING",
                    message: "Caller identity required".into(),
                },
            ),
            AppError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                ErrorBody {
                    code: "NOT_FOUND",
                    message: msg,
                },
            ),
            AppError::PermissionDenied => (
                StatusCode::FORBIDDEN,
                ErrorBody {
                    code: "PERMISSION_DENIED",
                    message: "You do not have permission".into(),
                },
            ),
            AppError::Conflict(msg) => (
                StatusCode::CONFLICT,
                ErrorBody {
                    code: "CONFLICT",
                    message: msg,
                },
            ),
            AppError::StorageUnavailable(detail) => {
                tracing::error!("Storage unavailable: {}", detail);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    ErrorBody {
                        code: "STORAGE_UNAVAILABLE",
                        message: "Storage is temporarily unavailable".into(),
                    },
                )
            }
            AppError::TransactionFailure(detail) => {
                tracing::error!("Transaction failure: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        code: "TRANSACTION_FAILURE",
                        message: "Failed to complete the operation".into(),
                    },
                )
            }
            AppError::StreamFailure(detail) => {
                tracing::error!("Stream failure: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        code: "STREAM_FAILURE",
                        message: "Blob stream was interrupted".into(),
                    },
                )
            }
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

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Validation(msg) => write!(f, "{msg}"),
            AppError::InvalidArgument(msg) => write!(f, "{msg}"),
            AppError::InvalidContentType(content_type) => {
                write!(f, "content type {content_type} is not allowed")
            }
            AppError::AuthMissing => write!(f, "caller identity required"),
            AppError::NotFound(msg) => write!(f, "{msg}"),
            AppError::PermissionDenied => write!(f, "permission denied"),
            AppError::Conflict(msg) => write!(f, "{msg}"),
            AppError::StorageUnavailable(detail) => {
                write!(f, "storage unavailable: {detail}")
            }
            AppError::TransactionFailure(detail) => write!(f, "transaction failed: {detail}"),
            AppError::StreamFailure(detail) => write!(f, "stream interrupted: {detail}"),
            AppError::Internal(detail) => write!(f, "internal error: {detail}"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = self.status_and_body();
        (status, Json(body)).into_response()
    }
}

impl From<DbErr> for AppError {
    fn from(err: DbErr) -> Self {
        match err {
            DbErr::ConnectionAcquire(e) => AppError::StorageUnavailable(e.to_string()),
            DbErr::Conn(e) => AppError::StorageUnavailable(e.to_string()),
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Unavailable(detail) => AppError::StorageUnavailable(detail),
            StorageError::NotFound(oid) => {
                AppError::NotFound(format!("content object {oid} not found"))
            }
            StorageError::Stream(detail) => AppError::StreamFailure(detail),
            StorageError::Db(e) => e.into(),
        }
    }
}
