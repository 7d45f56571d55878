use std::future::Future;
use std::pin::Pin;

use sea_orm::{DatabaseConnection, DatabaseTransaction, TransactionTrait};

use crate::error::AppError;

/// Run `op` inside a transaction on a pooled connection.
///
/// Commits when `op` returns `Ok`; a failing commit is surfaced as
/// [`AppError::TransactionFailure`] and must not be mistaken for success.
/// Rolls back and propagates the error when `op` fails. The connection
/// returns to the pool on every exit path (an un-committed transaction is
/// rolled back on drop).
pub async fn with_transaction<T, F>(db: &DatabaseConnection, op: F) -> Result<T, AppError>
where
    T: Send,
    F: for<'c> FnOnce(
            &'c DatabaseTransaction,
        ) -> Pin<Box<dyn Future<Output = Result<T, AppError>> + Send + 'c>>
        + Send,
{
    let txn = db.begin().await.map_err(AppError::from)?;

    match op(&txn).await {
        Ok(value) => match txn.commit().await {
            Ok(()) => Ok(value),
            Err(e) => Err(AppError::TransactionFailure(format!(
                "failed to commit transaction: {e}"
            ))),
        },
        Err(err) => {
            if let Err(rollback_err) = txn.rollback().await {
                tracing::warn!("Rollback failed: {}", rollback_err);
            }
            Err(err)
        }
    }
}
