//! Database transaction utilities
//!
//! Helper for multi-step operations that need atomicity. The closure runs
//! inside a transaction which is committed on `Ok` and rolled back on
//! `Err`, so callers cannot leave partial state behind on early returns.

use shopyard_core::AppError;
use sqlx::{PgPool, Postgres, Transaction};
use std::future::Future;
use std::pin::Pin;

type TxFuture<'a, R> = Pin<Box<dyn Future<Output = Result<R, AppError>> + Send + 'a>>;

/// Execute a closure within a database transaction.
///
/// # Example
///
/// ```ignore
/// with_transaction(&pool, |tx| {
///     Box::pin(async move {
///         sqlx::query("INSERT INTO ...").execute(&mut **tx).await?;
///         sqlx::query("UPDATE ...").execute(&mut **tx).await?;
///         Ok(())
///     })
/// })
/// .await
/// ```
pub async fn with_transaction<F, R>(pool: &PgPool, f: F) -> Result<R, AppError>
where
    F: for<'a> FnOnce(&'a mut Transaction<'_, Postgres>) -> TxFuture<'a, R>,
{
    let mut tx = pool.begin().await?;

    match f(&mut tx).await {
        Ok(result) => {
            tx.commit().await?;
            Ok(result)
        }
        Err(e) => {
            // Rollback failures are ignored; the original error is what the
            // caller needs to see.
            tx.rollback().await.ok();
            Err(e)
        }
    }
}
