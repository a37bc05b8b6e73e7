use std::{fmt::Display, future::Future, pin::Pin};

use sea_orm::{DatabaseConnection, DatabaseTransaction, DbErr, TransactionTrait};

/// Runs `op` inside a transaction: commit on `Ok`, rollback on `Err`.
/// The error returned by `op` is handed back unchanged after the rollback.
pub async fn transactional<T, E, F>(conn: &DatabaseConnection, label: &str, op: F) -> Result<T, E>
where
    F: for<'c> FnOnce(
        &'c DatabaseTransaction,
    ) -> Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'c>>,
    E: From<DbErr> + Display,
{
    let txn = conn.begin().await?;
    match op(&txn).await {
        Ok(value) => {
            txn.commit().await?;
            Ok(value)
        }
        Err(err) => {
            tracing::warn!(transaction = label, error = %err, "transaction rolled back");
            if let Err(rollback_err) = txn.rollback().await {
                tracing::error!(transaction = label, error = %rollback_err, "rollback failed");
            }
            Err(err)
        }
    }
}
