use sea_orm::DbErr;
use thiserror::Error;

/// Errors that can occur during content-object storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The connection or transaction backing the store is broken.
    #[error("object storage unavailable: {0}")]
    Unavailable(String),

    /// No large object exists for the given OID.
    #[error("large object {0} not found")]
    NotFound(i64),

    /// A relay between a byte stream and a large object was interrupted.
    #[error("stream interrupted: {0}")]
    Stream(String),

    /// Any other database-level failure.
    #[error("database error: {0}")]
    Db(#[from] DbErr),
}
