use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::{join_all, BoxFuture};
use sqlx::sqlite::SqlitePoolOptions;

use cache::{CacheStore, QueryCache};
use common::{Error, Result};

async fn test_cache() -> QueryCache {
    // One connection: every pooled connection to `sqlite::memory:` would
    // otherwise open its own empty database.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    sqlx::migrate!("../../migrations").run(&pool).await.unwrap();
    QueryCache::new(CacheStore::new(pool))
}

fn counting_fetch(
    calls: &Arc<AtomicUsize>,
    value: u64,
) -> impl Fn() -> BoxFuture<'static, Result<u64>> + Clone {
    let calls = Arc::clone(calls);
    move || -> BoxFuture<'static, Result<u64>> {
        let calls = Arc::clone(&calls);
        Box::pin(async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(value)
        })
    }
}

#[tokio::test]
async fn second_query_within_ttl_hits_cache() {
    let cache = test_cache().await;
    let calls = Arc::new(AtomicUsize::new(0));
    let fetch = counting_fetch(&calls, 41);

    let first: u64 = cache
        .query("k", Duration::from_secs(60), fetch.clone())
        .await
        .unwrap();
    let second: u64 = cache.query("k", Duration::from_secs(60), fetch).await.unwrap();

    assert_eq!(first, 41);
    assert_eq!(second, 41);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn concurrent_queries_share_one_fetch() {
    let cache = test_cache().await;
    let calls = Arc::new(AtomicUsize::new(0));

    let futures: Vec<_> = (0..8)
        .map(|_| {
            let cache = cache.clone();
            let calls = Arc::clone(&calls);
            async move {
                cache
                    .query("btc", Duration::from_secs(60), move || {
                        let calls = Arc::clone(&calls);
                        async move {
                            calls.fetch_add(1, Ordering::SeqCst);
                            // Slow enough that every caller joins the flight.
                            tokio::time::sleep(Duration::from_millis(50)).await;
                            Ok(7_u64)
                        }
                    })
                    .await
            }
        })
        .collect();

    let results = join_all(futures).await;
    for result in results {
        assert_eq!(result.unwrap(), 7);
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn expired_entry_triggers_exactly_one_refetch() {
    let cache = test_cache().await;
    let calls = Arc::new(AtomicUsize::new(0));
    let fetch = counting_fetch(&calls, 5);

    let _: u64 = cache
        .query("k", Duration::from_millis(20), fetch.clone())
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(60)).await;

    assert!(cache.store().get::<u64>("k").await.unwrap().is_none());

    let _: u64 = cache
        .query("k", Duration::from_millis(20), fetch)
        .await
        .unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn failure_reaches_every_waiter_and_writes_nothing() {
    let cache = test_cache().await;
    let calls = Arc::new(AtomicUsize::new(0));

    let futures: Vec<_> = (0..4)
        .map(|_| {
            let cache = cache.clone();
            let calls = Arc::clone(&calls);
            async move {
                cache
                    .query::<u64, _, _>("down", Duration::from_secs(60), move || {
                        let calls = Arc::clone(&calls);
                        async move {
                            calls.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(30)).await;
                            Err(Error::Network("connection refused".to_string()))
                        }
                    })
                    .await
            }
        })
        .collect();

    let results = join_all(futures).await;
    for result in results {
        assert!(matches!(result, Err(Error::Network(_))));
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(cache.store().get::<u64>("down").await.unwrap().is_none());
}

#[tokio::test]
async fn abandoned_caller_does_not_cancel_the_fetch() {
    let cache = test_cache().await;
    let calls = Arc::new(AtomicUsize::new(0));

    let fetch = {
        let calls = Arc::clone(&calls);
        move || {
            let calls = Arc::clone(&calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(80)).await;
                Ok(99_u64)
            }
        }
    };
    let slow = cache.query("slow", Duration::from_secs(60), fetch);

    // Give up on the caller long before the fetch completes.
    assert!(
        tokio::time::timeout(Duration::from_millis(10), slow)
            .await
            .is_err()
    );

    tokio::time::sleep(Duration::from_millis(120)).await;
    let entry = cache.store().get::<u64>("slow").await.unwrap().unwrap();
    assert_eq!(entry.value, 99);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn subscription_receives_background_refreshes() {
    let cache = test_cache().await;
    let calls = Arc::new(AtomicUsize::new(0));

    let mut sub = {
        let calls = Arc::clone(&calls);
        cache.subscribe::<u64, _, _>(
            "ticker",
            Duration::from_secs(60),
            Duration::from_millis(25),
            move || {
                let calls = Arc::clone(&calls);
                async move { Ok(calls.fetch_add(1, Ordering::SeqCst) as u64) }
            },
        )
    };

    let first = tokio::time::timeout(Duration::from_secs(2), sub.recv())
        .await
        .expect("no refresh arrived")
        .expect("subscription closed");
    let second = tokio::time::timeout(Duration::from_secs(2), sub.recv())
        .await
        .expect("no refresh arrived")
        .expect("subscription closed");
    assert!(second > first);

    // Revalidation writes through even though nothing ever queried this key.
    assert!(cache.store().get::<u64>("ticker").await.unwrap().is_some());
}

#[tokio::test]
async fn dropping_last_subscription_stops_the_timer() {
    let cache = test_cache().await;
    let calls = Arc::new(AtomicUsize::new(0));

    let mut sub = {
        let calls = Arc::clone(&calls);
        cache.subscribe::<u64, _, _>(
            "ticker",
            Duration::from_secs(60),
            Duration::from_millis(20),
            move || {
                let calls = Arc::clone(&calls);
                async move { Ok(calls.fetch_add(1, Ordering::SeqCst) as u64) }
            },
        )
    };

    let _ = tokio::time::timeout(Duration::from_secs(2), sub.recv()).await;
    drop(sub);

    let at_drop = calls.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(150)).await;
    // At most one tick can already be in flight when the timer is torn down.
    assert!(calls.load(Ordering::SeqCst) <= at_drop + 1);
}
