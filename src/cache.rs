//! Fetch & cache orchestrator -- deduplicated, stale-while-revalidate reads.
//!
//! Each logical query (a [`CacheKey`]) owns one entry. At most one network
//! read is in flight per key: concurrent resolves for an uninitialized key
//! attach to the running read, and stale entries serve their last good
//! payload while a silent background refresh runs. Results are applied
//! last-request-wins: every read captures the entry's generation at start and
//! a completed read whose generation is no longer current is discarded, so a
//! slow response for an abandoned query can never clobber fresher data.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tracing::{debug, warn};

use crate::api::ApiError;
use crate::query::CacheKey;

/// Lifecycle state of a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// Created or invalidated, nothing fetched yet.
    Idle,
    /// First fetch in flight with no payload to show.
    Loading,
    Success,
    Error,
}

/// Per-resolve tuning.
#[derive(Debug, Clone, Copy)]
pub struct FetchOptions {
    /// Age after which a successful entry is eligible for background refresh.
    pub ttl: Duration,
    /// Immediate retries for transport failures. Server errors always get
    /// exactly one retry, client/decode errors none.
    pub transport_retries: u32,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(30),
            transport_retries: 2,
        }
    }
}

/// Snapshot handed to a consumer. `data` is the last good payload for the
/// key, which may be retained alongside an `Error` status (stale-data-shown
/// degraded state). All four UI states are representable:
/// loading (`Loading`, no data), error without data (`Error`, no data),
/// error with stale data (`Error`, data), success (`Success`, data).
#[derive(Debug, Clone)]
pub struct FetchState<T> {
    pub status: CacheStatus,
    pub data: Option<Arc<T>>,
    pub error: Option<String>,
}

struct Entry<T> {
    status: CacheStatus,
    payload: Option<Arc<T>>,
    fetched_at: Option<Instant>,
    last_error: Option<String>,
    /// Bumped on every initiated read and on invalidation; stale completions
    /// compare against it and are discarded on mismatch.
    generation: u64,
    /// Present while a read is in flight. Waiters clone the receiver; the
    /// sender is dropped on completion, which wakes them race-free.
    inflight: Option<watch::Receiver<()>>,
}

impl<T> Default for Entry<T> {
    fn default() -> Self {
        Self {
            status: CacheStatus::Idle,
            payload: None,
            fetched_at: None,
            last_error: None,
            generation: 0,
            inflight: None,
        }
    }
}

impl<T> Entry<T> {
    fn is_fresh(&self, ttl: Duration) -> bool {
        self.status == CacheStatus::Success
            && self
                .fetched_at
                .map(|at| at.elapsed() < ttl)
                .unwrap_or(false)
    }

    fn snapshot(&self) -> FetchState<T> {
        FetchState {
            status: self.status,
            data: self.payload.clone(),
            error: self.last_error.clone(),
        }
    }
}

/// Deduplicating query cache for one payload type.
pub struct QueryCache<T> {
    inner: Arc<Mutex<HashMap<CacheKey, Entry<T>>>>,
}

impl<T> Clone for QueryCache<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Default for QueryCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

enum Step<T> {
    Serve(FetchState<T>),
    Wait(watch::Receiver<()>),
    /// Run the read on the caller, then apply.
    Fetch {
        generation: u64,
        done: watch::Sender<()>,
    },
    /// Serve the stale snapshot now and apply the read off the caller's back.
    Revalidate {
        generation: u64,
        done: watch::Sender<()>,
        stale: FetchState<T>,
    },
}

impl<T> QueryCache<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<CacheKey, Entry<T>>> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Snapshot a key without triggering any read.
    pub fn peek(&self, key: &CacheKey) -> Option<FetchState<T>> {
        self.lock().get(key).map(Entry::snapshot)
    }

    /// Discard a key's payload and supersede any in-flight read for it. The
    /// next resolve is a fresh network read, not a cache hit.
    pub fn invalidate(&self, key: &CacheKey) {
        let mut map = self.lock();
        if let Some(entry) = map.get_mut(key) {
            entry.generation += 1;
            entry.status = CacheStatus::Idle;
            entry.payload = None;
            entry.fetched_at = None;
            entry.last_error = None;
            entry.inflight = None;
            debug!(%key, "cache entry invalidated");
        }
    }

    /// Mark every entry stale while keeping payloads, so list views refetch
    /// on their next read without blanking. In-flight reads are superseded.
    pub fn mark_stale_all(&self) {
        let mut map = self.lock();
        for entry in map.values_mut() {
            entry.generation += 1;
            entry.fetched_at = None;
            entry.inflight = None;
        }
        debug!(entries = map.len(), "cache marked stale");
    }
}

impl<T: Send + Sync + 'static> QueryCache<T> {
    /// Resolve a key against the cache, reading over the network only when
    /// the entry is missing, stale, or errored. See the module docs for the
    /// coherence rules this upholds.
    pub async fn resolve<F, Fut>(
        &self,
        key: &CacheKey,
        opts: &FetchOptions,
        loader: F,
    ) -> FetchState<T>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
    {
        self.resolve_inner(key, opts, loader, false).await
    }

    /// Force a read regardless of freshness, keeping the no-flicker rule: a
    /// key with a payload never flips to `Loading`. Used by the background
    /// refresh scheduler; runs the read to completion on the caller.
    pub async fn refresh<F, Fut>(
        &self,
        key: &CacheKey,
        opts: &FetchOptions,
        loader: F,
    ) -> FetchState<T>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
    {
        self.resolve_inner(key, opts, loader, true).await
    }

    async fn resolve_inner<F, Fut>(
        &self,
        key: &CacheKey,
        opts: &FetchOptions,
        loader: F,
        force: bool,
    ) -> FetchState<T>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
    {
        let mut waited = false;
        loop {
            let step = {
                let mut map = self.lock();
                let entry = map.entry(key.clone()).or_default();
                if let Some(rx) = &entry.inflight {
                    if !force && entry.payload.is_some() {
                        // A refresh is already running; serve stale.
                        Step::Serve(entry.snapshot())
                    } else {
                        Step::Wait(rx.clone())
                    }
                } else if waited || (!force && entry.is_fresh(opts.ttl)) {
                    Step::Serve(entry.snapshot())
                } else {
                    let (done, rx) = watch::channel(());
                    entry.generation += 1;
                    entry.inflight = Some(rx);
                    if entry.payload.is_none() {
                        // Only an uninitialized key shows a loading state.
                        entry.status = CacheStatus::Loading;
                        Step::Fetch {
                            generation: entry.generation,
                            done,
                        }
                    } else if force {
                        Step::Fetch {
                            generation: entry.generation,
                            done,
                        }
                    } else {
                        Step::Revalidate {
                            generation: entry.generation,
                            done,
                            stale: entry.snapshot(),
                        }
                    }
                }
            };

            match step {
                Step::Serve(state) => return state,
                Step::Wait(mut rx) => {
                    // Wakes when the sender drops, even if that already
                    // happened before we got here.
                    let _ = rx.changed().await;
                    waited = true;
                }
                Step::Fetch { generation, done } => {
                    let result = load_with_retry(&loader, opts).await;
                    let state = self.apply(key, generation, result);
                    drop(done);
                    return state;
                }
                Step::Revalidate {
                    generation,
                    done,
                    stale,
                } => {
                    let cache = self.clone();
                    let key = key.clone();
                    let opts = *opts;
                    tokio::spawn(async move {
                        let result = load_with_retry(&loader, &opts).await;
                        cache.apply(&key, generation, result);
                        drop(done);
                    });
                    return stale;
                }
            }
        }
    }

    /// Apply a completed read if its generation is still current; otherwise
    /// drop it (last-request-wins).
    fn apply(&self, key: &CacheKey, generation: u64, result: Result<T, ApiError>) -> FetchState<T> {
        let mut map = self.lock();
        let entry = map.entry(key.clone()).or_default();
        if entry.generation != generation {
            debug!(%key, "discarding superseded response");
            return entry.snapshot();
        }
        entry.inflight = None;
        match result {
            Ok(payload) => {
                entry.payload = Some(Arc::new(payload));
                entry.fetched_at = Some(Instant::now());
                entry.status = CacheStatus::Success;
                entry.last_error = None;
            }
            Err(err) => {
                // Keep the last good payload so the view can degrade to
                // stale-data-shown instead of blanking.
                entry.status = CacheStatus::Error;
                entry.last_error = Some(err.to_string());
                warn!(%key, error = %err, "read failed");
            }
        }
        entry.snapshot()
    }
}

/// Immediate, non-exponential retry driven by the error's class.
async fn load_with_retry<F, Fut, T>(loader: &F, opts: &FetchOptions) -> Result<T, ApiError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    let mut attempt = 0u32;
    loop {
        match loader().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if attempt >= err.retry_budget(opts.transport_retries) {
                    return Err(err);
                }
                attempt += 1;
                warn!(attempt, error = %err, "retrying failed read");
            }
        }
    }
}
