use std::collections::HashMap;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use common::{Error, Result};

use crate::store::CacheStore;

type SharedResult = Result<Value>;
type FetchFn = Box<dyn Fn() -> BoxFuture<'static, SharedResult> + Send + Sync>;

/// Cache-or-fetch front end over [`CacheStore`] with per-key single-flight
/// dedupe and background revalidation for subscribed keys.
///
/// One in-flight fetch exists per key at any moment; concurrent callers for
/// the same key share its outcome. Different keys fetch fully in parallel.
/// A failed fetch reaches every waiter and leaves the store untouched;
/// staleness is never silently substituted for a surfaced error.
#[derive(Clone)]
pub struct QueryCache {
    store: CacheStore,
    in_flight: Arc<Mutex<HashMap<String, broadcast::Sender<SharedResult>>>>,
    refreshers: Arc<Mutex<HashMap<String, Refresher>>>,
}

struct Refresher {
    subscribers: usize,
    update_tx: broadcast::Sender<Value>,
    task: JoinHandle<()>,
}

impl QueryCache {
    pub fn new(store: CacheStore) -> Self {
        Self {
            store,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            refreshers: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    /// Cache-or-fetch.
    ///
    /// Returns the stored value when an unexpired entry exists; otherwise
    /// joins the key's in-flight fetch, or dispatches one and writes the
    /// result through with `ttl`. Errors propagate to every waiter with no
    /// cache write.
    pub async fn query<T, F, Fut>(&self, key: &str, ttl: Duration, fetch: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        if let Some(entry) = self.store.get::<T>(key).await? {
            debug!(key, "cache hit");
            return Ok(entry.value);
        }

        let fut = fetch();
        let value = self
            .fetch_shared(
                key,
                ttl,
                Box::pin(async move {
                    let value = fut.await?;
                    serde_json::to_value(value).map_err(|e| Error::Decode(e.to_string()))
                }),
            )
            .await?;
        serde_json::from_value(value).map_err(|e| Error::Decode(e.to_string()))
    }

    /// Subscribe to push-style refreshes of `key`.
    ///
    /// Spawns (or joins) the key's background revalidation task, which
    /// re-fetches every `refresh_interval` and replaces the cache entry even
    /// when the payload is identical, so `fetched_at`/`expires_at` advance.
    /// The task is torn down when the last subscription for the key drops;
    /// a fetch already dispatched at that point still completes and commits
    /// to the store.
    pub fn subscribe<T, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        refresh_interval: Duration,
        fetch: F,
    ) -> Subscription<T>
    where
        T: Serialize + DeserializeOwned,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let mut refreshers = self.refreshers.lock().expect("refresher registry poisoned");
        let refresher = refreshers.entry(key.to_string()).or_insert_with(|| {
            let (update_tx, _) = broadcast::channel(16);
            let fetch: FetchFn = Box::new(move || {
                let fut = fetch();
                Box::pin(async move {
                    let value = fut.await?;
                    serde_json::to_value(value).map_err(|e| Error::Decode(e.to_string()))
                })
            });
            let task = tokio::spawn(Self::refresh_loop(
                self.clone(),
                key.to_string(),
                ttl,
                refresh_interval,
                fetch,
                update_tx.clone(),
            ));
            Refresher {
                subscribers: 0,
                update_tx,
                task,
            }
        });
        refresher.subscribers += 1;

        Subscription {
            rx: refresher.update_tx.subscribe(),
            _guard: SubscriptionGuard {
                key: key.to_string(),
                refreshers: Arc::clone(&self.refreshers),
            },
            _marker: PhantomData,
        }
    }

    /// Run one fetch for `key`, deduplicating against any already in flight.
    ///
    /// The fetch itself runs on a spawned task: dropping a waiting caller
    /// never aborts a dispatched request, and its result still lands in the
    /// store for future readers.
    async fn fetch_shared(
        &self,
        key: &str,
        ttl: Duration,
        fetch: BoxFuture<'static, SharedResult>,
    ) -> SharedResult {
        let mut rx = {
            let mut in_flight = self.in_flight.lock().expect("in-flight registry poisoned");
            if let Some(tx) = in_flight.get(key) {
                debug!(key, "joining in-flight fetch");
                tx.subscribe()
            } else {
                let (tx, rx) = broadcast::channel(1);
                in_flight.insert(key.to_string(), tx.clone());

                let store = self.store.clone();
                let registry = Arc::clone(&self.in_flight);
                let key = key.to_string();
                tokio::spawn(async move {
                    let result = match fetch.await {
                        Ok(value) => store.set_value(&key, &value, ttl).await.map(|()| value),
                        Err(e) => Err(e),
                    };
                    // Deregister before fanning out so late arrivals start a
                    // fresh fetch instead of waiting on a closed channel.
                    registry
                        .lock()
                        .expect("in-flight registry poisoned")
                        .remove(&key);
                    let _ = tx.send(result);
                });
                rx
            }
        };

        rx.recv()
            .await
            .map_err(|_| Error::Network("in-flight fetch was dropped".to_string()))?
    }

    async fn refresh_loop(
        cache: QueryCache,
        key: String,
        ttl: Duration,
        refresh_interval: Duration,
        fetch: FetchFn,
        update_tx: broadcast::Sender<Value>,
    ) {
        let mut interval = tokio::time::interval(refresh_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The subscriber got its initial value through `query`; consume the
        // interval's immediate first tick.
        interval.tick().await;

        loop {
            interval.tick().await;
            match cache.fetch_shared(&key, ttl, fetch()).await {
                Ok(value) => {
                    debug!(key = %key, "revalidated");
                    let _ = update_tx.send(value);
                }
                Err(e) => {
                    // Cache untouched: a still-unexpired entry keeps serving.
                    warn!(key = %key, error = %e, "background revalidation failed");
                }
            }
        }
    }
}

/// A live subscription to one key's background refreshes.
///
/// Dropping it releases the key's refresh timer once no subscriber remains.
pub struct Subscription<T> {
    rx: broadcast::Receiver<Value>,
    _guard: SubscriptionGuard,
    _marker: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned> Subscription<T> {
    /// Receive the next refreshed value. Returns `None` once the refresh
    /// task is gone. Lagged refreshes are skipped, not replayed.
    pub async fn recv(&mut self) -> Option<T> {
        loop {
            match self.rx.recv().await {
                Ok(value) => match serde_json::from_value(value) {
                    Ok(decoded) => return Some(decoded),
                    Err(e) => {
                        warn!(error = %e, "discarding refresh payload with unexpected shape");
                    }
                },
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(dropped = n, "subscription lagged — dropped refreshes");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

struct SubscriptionGuard {
    key: String,
    refreshers: Arc<Mutex<HashMap<String, Refresher>>>,
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        let Ok(mut refreshers) = self.refreshers.lock() else {
            return;
        };
        if let Some(refresher) = refreshers.get_mut(&self.key) {
            refresher.subscribers -= 1;
            if refresher.subscribers == 0 {
                if let Some(refresher) = refreshers.remove(&self.key) {
                    refresher.task.abort();
                }
            }
        }
    }
}
