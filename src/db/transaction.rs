/*!
 * Transaction Helper Utilities
 *
 * Scoped transactions: commit when the body succeeds, roll back on every other exit path.
 */

use sea_orm::{DatabaseConnection, DatabaseTransaction, DbErr, TransactionError, TransactionTrait};
use std::future::Future;
use std::pin::Pin;

/// Type alias for boxed future used in transactions
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Execute a function within a database transaction
///
/// The body's own error type is returned unchanged, so callers can still tell a
/// constraint violation from a missing row after the rollback.
///
/// # Example
///
/// ```rust,ignore
/// use crate::db::transaction::with_transaction;
///
/// let product = with_transaction(&db, |txn| {
///     Box::pin(async move {
///         let product = new_product.insert(txn).await?;
///         opening_stock.insert(txn).await?;
///         Ok::<_, ServiceError>(product)
///     })
/// }).await?;
/// ```
pub async fn with_transaction<F, T, E>(db: &DatabaseConnection, f: F) -> Result<T, E>
where
    F: for<'c> FnOnce(&'c DatabaseTransaction) -> BoxFuture<'c, Result<T, E>> + Send,
    T: Send,
    E: std::error::Error + From<DbErr> + Send,
{
    db.transaction(f).await.map_err(|e| match e {
        TransactionError::Connection(db_err) => E::from(db_err),
        TransactionError::Transaction(err) => err,
    })
}
