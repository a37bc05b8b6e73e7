use std::{future::Future, pin::Pin, time::Instant};

use sqlx::{PgConnection, PgPool};

/// Logs the query before awaiting it and its latency afterwards.
pub async fn logged<T, Fut>(label: &str, sql: &str, fut: Fut) -> T
where
    Fut: Future<Output = T>,
{
    tracing::debug!(query = label, sql = %sql.trim(), "executing query");
    let started = Instant::now();
    let out = fut.await;
    tracing::debug!(
        query = label,
        ms = started.elapsed().as_millis() as u64,
        "query finished"
    );
    out
}

/// Runs `op` on a single pooled connection. The connection goes back to the
/// pool when this returns, whatever the outcome of `op`.
pub async fn with_connection<T, E, F>(pool: &PgPool, op: F) -> Result<T, E>
where
    F: for<'c> FnOnce(&'c mut PgConnection) -> Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'c>>,
    E: From<sqlx::Error>,
{
    let mut conn = pool.acquire().await?;
    let result = op(&mut *conn).await;
    drop(conn);
    result
}
