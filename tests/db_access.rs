use std::{
    convert::Infallible,
    fmt,
    sync::atomic::{AtomicU32, Ordering},
    time::Duration,
};

use bridal_api::db_access::{QueryCache, RetryPolicy, Retryable, retry};

#[derive(Debug)]
enum TestError {
    Transient,
    Fatal,
}

impl fmt::Display for TestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

impl Retryable for TestError {
    fn is_transient(&self) -> bool {
        matches!(self, TestError::Transient)
    }
}

fn instant_policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        base_delay: Duration::ZERO,
        max_delay: Duration::ZERO,
    }
}

#[tokio::test]
async fn retry_recovers_from_transient_failures() {
    let calls = AtomicU32::new(0);
    let result = retry(&instant_policy(3), "flaky", || {
        let n = calls.fetch_add(1, Ordering::SeqCst);
        async move {
            if n < 2 {
                Err(TestError::Transient)
            } else {
                Ok(n)
            }
        }
    })
    .await;

    assert_eq!(result.unwrap(), 2);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn retry_stops_on_fatal_errors() {
    let calls = AtomicU32::new(0);
    let result: Result<(), TestError> = retry(&instant_policy(5), "fatal", || {
        calls.fetch_add(1, Ordering::SeqCst);
        async { Err(TestError::Fatal) }
    })
    .await;

    assert!(matches!(result, Err(TestError::Fatal)));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn retry_gives_up_after_budget() {
    let calls = AtomicU32::new(0);
    let result: Result<(), TestError> = retry(&instant_policy(3), "down", || {
        calls.fetch_add(1, Ordering::SeqCst);
        async { Err(TestError::Transient) }
    })
    .await;

    assert!(matches!(result, Err(TestError::Transient)));
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn zero_attempt_budget_still_runs_once() {
    let calls = AtomicU32::new(0);
    let result: Result<(), TestError> = retry(&instant_policy(0), "zero", || {
        calls.fetch_add(1, Ordering::SeqCst);
        async { Err(TestError::Transient) }
    })
    .await;

    assert!(matches!(result, Err(TestError::Transient)));
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let ok = retry(&instant_policy(0), "zero_ok", || async { Ok::<_, TestError>(9) }).await;
    assert_eq!(ok.unwrap(), 9);
}

#[test]
fn backoff_doubles_and_caps() {
    let policy = RetryPolicy {
        max_attempts: 5,
        base_delay: Duration::from_millis(100),
        max_delay: Duration::from_millis(300),
    };
    assert_eq!(policy.delay_for(1), Duration::from_millis(100));
    assert_eq!(policy.delay_for(2), Duration::from_millis(200));
    assert_eq!(policy.delay_for(3), Duration::from_millis(300));
    assert_eq!(policy.delay_for(10), Duration::from_millis(300));
}

async fn count_load(cache: &QueryCache<u32>, key: &str, loads: &AtomicU32, value: u32) -> u32 {
    cache
        .get_or_load(key, async {
            loads.fetch_add(1, Ordering::SeqCst);
            Ok::<_, Infallible>(value)
        })
        .await
        .unwrap()
}

#[tokio::test]
async fn cache_serves_hits_without_reloading() {
    let cache: QueryCache<u32> = QueryCache::new(10, Duration::from_secs(60));
    let loads = AtomicU32::new(0);

    for _ in 0..3 {
        assert_eq!(count_load(&cache, "answer", &loads, 42).await, 42);
    }

    assert_eq!(loads.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn cache_does_not_store_errors() {
    let cache: QueryCache<u32> = QueryCache::new(10, Duration::from_secs(60));

    let failed = cache
        .get_or_load("key", async { Err::<u32, _>("boom") })
        .await;
    assert_eq!(*failed.unwrap_err(), "boom");

    let loads = AtomicU32::new(0);
    assert_eq!(count_load(&cache, "key", &loads, 7).await, 7);
    assert_eq!(loads.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn invalidate_all_empties_the_cache() {
    let cache: QueryCache<u32> = QueryCache::new(10, Duration::from_secs(60));
    let loads = AtomicU32::new(0);
    count_load(&cache, "a", &loads, 1).await;
    assert_eq!(cache.entry_count().await, 1);

    cache.invalidate_all();
    assert_eq!(count_load(&cache, "a", &loads, 2).await, 2);
    assert_eq!(loads.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn concurrent_misses_share_one_load() {
    let cache: QueryCache<u32> = QueryCache::new(10, Duration::from_secs(60));
    let loads = AtomicU32::new(0);
    let loads = &loads;

    let slow_load = move || async move {
        loads.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        Ok::<_, Infallible>(5)
    };
    let (a, b) = tokio::join!(
        cache.get_or_load("page", slow_load()),
        cache.get_or_load("page", slow_load()),
    );

    assert_eq!(a.unwrap(), 5);
    assert_eq!(b.unwrap(), 5);
    assert_eq!(loads.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn load_racing_an_invalidation_is_not_served_afterwards() {
    let cache: QueryCache<u32> = QueryCache::new(10, Duration::from_secs(60));
    let (started_tx, started_rx) = tokio::sync::oneshot::channel::<()>();
    let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();

    let stale = {
        let cache = cache.clone();
        tokio::spawn(async move {
            cache
                .get_or_load("page", async move {
                    let _ = started_tx.send(());
                    let _ = release_rx.await;
                    Ok::<_, Infallible>(1)
                })
                .await
        })
    };

    started_rx.await.unwrap();
    cache.invalidate_all();
    release_tx.send(()).unwrap();
    assert_eq!(stale.await.unwrap().unwrap(), 1);

    let loads = AtomicU32::new(0);
    assert_eq!(count_load(&cache, "page", &loads, 2).await, 2);
    assert_eq!(loads.load(Ordering::SeqCst), 1);
}
