use std::{
    future::Future,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use moka::future::Cache;

/// Bounded, expiring cache for query results keyed by the query text.
///
/// Keys are scoped to a generation that `invalidate_all` bumps, so a load
/// that was already running when the cache was flushed stores its result
/// under a generation nobody reads any more.
#[derive(Clone)]
pub struct QueryCache<V> {
    inner: Cache<String, V>,
    generation: Arc<AtomicU64>,
}

impl<V> QueryCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new(max_entries: u64, ttl: Duration) -> Self {
        let inner = Cache::builder()
            .max_capacity(max_entries)
            .time_to_live(ttl)
            .build();
        Self {
            inner,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Returns the cached value for `key`, or awaits `load` and caches its
    /// result. Concurrent misses on one key share a single load. Errors are
    /// not cached and come back shared between the waiting callers.
    pub async fn get_or_load<E, Fut>(
        &self,
        key: impl Into<String>,
        load: Fut,
    ) -> Result<V, Arc<E>>
    where
        Fut: Future<Output = Result<V, E>>,
        E: Send + Sync + 'static,
    {
        let generation = self.generation.load(Ordering::Acquire);
        let key = format!("{generation}:{}", key.into());
        if let Some(hit) = self.inner.get(&key).await {
            tracing::debug!(key = %key, "query cache hit");
            return Ok(hit);
        }
        self.inner.try_get_with(key, load).await
    }

    pub fn invalidate_all(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.inner.invalidate_all();
    }

    pub async fn entry_count(&self) -> u64 {
        self.inner.run_pending_tasks().await;
        self.inner.entry_count()
    }
}
