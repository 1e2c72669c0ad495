//! Per-key TTL cache with single-flight refresh.
//!
//! Each key owns a slot guarded by its own async mutex. A stale slot is
//! refreshed by a spawned task that holds the slot lock for the whole fetch,
//! so concurrent callers for the same key wait for that fetch instead of
//! issuing their own. The task is detached from the caller: a caller that
//! stops waiting does not abort the fetch, and its result is still stored.
//! Slots are never evicted; expiry is checked lazily on access.

use parking_lot::Mutex;
use std::{collections::HashMap, future::Future, sync::Arc, time::Duration};
use thiserror::Error;
use tokio::time::Instant;
use tracing::debug;

/// A cached value and when it was fetched
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    pub fetched_at: Instant,
}

impl<V> CacheEntry<V> {
    pub fn is_fresh(&self, ttl: Duration, now: Instant) -> bool {
        now.saturating_duration_since(self.fetched_at) < ttl
    }
}

/// The refresh task was cancelled before producing a value (runtime shutdown)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cache refresh task was cancelled")]
pub struct FetchAborted;

type Slot<V> = Arc<tokio::sync::Mutex<Option<CacheEntry<V>>>>;

pub struct TtlCache<V> {
    ttl: Duration,
    slots: Mutex<HashMap<String, Slot<V>>>,
}

impl<V: Clone + Send + 'static> TtlCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slots: Mutex::new(HashMap::new()),
        }
    }

    fn slot(&self, key: &str) -> Slot<V> {
        self.slots.lock().entry(key.to_string()).or_default().clone()
    }

    /// Fresh value for `key`, if any. Expired entries read as absent.
    #[cfg(test)]
    pub async fn get(&self, key: &str) -> Option<V> {
        let slot = self.slot(key);
        let guard = slot.lock().await;
        guard
            .as_ref()
            .filter(|e| e.is_fresh(self.ttl, Instant::now()))
            .map(|e| e.value.clone())
    }

    /// Return the fresh value for `key` or run `fetch` and store its result.
    ///
    /// Failed fetches leave the slot as it was.
    pub async fn get_or_try_fetch<F, Fut, E>(&self, key: &str, fetch: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
        E: From<FetchAborted> + Send + 'static,
    {
        let slot = self.slot(key);
        let ttl = self.ttl;

        {
            let guard = slot.lock().await;
            if let Some(entry) = guard.as_ref().filter(|e| e.is_fresh(ttl, Instant::now())) {
                debug!(key, "cache hit");
                return Ok(entry.value.clone());
            }
        }

        let refresh = tokio::spawn(async move {
            let mut guard = slot.lock_owned().await;
            // Refreshed by another caller while we waited for the lock
            if let Some(entry) = guard.as_ref().filter(|e| e.is_fresh(ttl, Instant::now())) {
                return Ok(entry.value.clone());
            }

            let value = fetch().await?;
            *guard = Some(CacheEntry {
                value: value.clone(),
                fetched_at: Instant::now(),
            });
            Ok::<V, E>(value)
        });

        match refresh.await {
            Ok(result) => result,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(_) => Err(FetchAborted.into()),
        }
    }
}
