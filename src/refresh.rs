//! Background refresh scheduler -- per-key interval timers.
//!
//! Owns one tokio task per registered key. Each task sleeps on its interval
//! and forces a cache refresh; the stale-while-revalidate rules in the cache
//! keep those refreshes silent (no loading flicker). Unregistering a key
//! aborts its timer; an already in-flight read is allowed to finish but its
//! result is discarded by the cache's generation check if the key has been
//! invalidated since.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::{FetchOptions, QueryCache};
use crate::query::CacheKey;

#[derive(Default)]
pub struct RefreshScheduler {
    tasks: Mutex<HashMap<CacheKey, JoinHandle<()>>>,
}

impl RefreshScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<CacheKey, JoinHandle<()>>> {
        self.tasks.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Start refreshing `key` every `every`, replacing any existing timer for
    /// the same key.
    pub fn register<T, F, Fut>(
        &self,
        cache: &QueryCache<T>,
        key: CacheKey,
        every: Duration,
        opts: FetchOptions,
        loader: F,
    ) where
        T: Send + Sync + 'static,
        F: Fn() -> Fut + Clone + Send + Sync + 'static,
        Fut: Future<Output = Result<T, crate::api::ApiError>> + Send + 'static,
    {
        let cache = cache.clone();
        let task_key = key.clone();
        let handle = tokio::spawn(async move {
            loop {
                tokio::time::sleep(every).await;
                debug!(key = %task_key, "background refresh");
                let _ = cache.refresh(&task_key, &opts, loader.clone()).await;
            }
        });

        info!(%key, interval_secs = every.as_secs(), "refresh timer registered");
        if let Some(old) = self.lock().insert(key, handle) {
            old.abort();
        }
    }

    /// Stop refreshing `key`. No-op if the key was never registered.
    pub fn unregister(&self, key: &CacheKey) {
        if let Some(handle) = self.lock().remove(key) {
            handle.abort();
            info!(%key, "refresh timer unregistered");
        }
    }

    /// Abort all timers.
    pub fn shutdown(&self) {
        let mut tasks = self.lock();
        for (_, handle) in tasks.drain() {
            handle.abort();
        }
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}
