//! Key/value cache with TTLs and per-key locks.
//!
//! Managers use the cache to memoize ledger lookups and as a soft
//! at-most-once guard around offer and request creation: the first task to
//! [`acquire`](Cache::acquire) a key computes and stores the value while
//! holding the key's lock, later tasks find the stored result.

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheError {
    #[error("cache backend error: {0}")]
    Backend(String),
}

type Release = Box<dyn FnOnce() + Send>;

/// Exclusive hold on one cache key, with the value cached when the lock
/// was taken. Dropping it releases the key.
pub struct CacheLock {
    pub result: Option<Value>,
    guard: Option<OwnedMutexGuard<()>>,
    release: Option<Release>,
}

impl CacheLock {
    pub fn new(result: Option<Value>, guard: OwnedMutexGuard<()>) -> Self {
        CacheLock {
            result,
            guard: Some(guard),
            release: None,
        }
    }

    /// Run `release` after the guard is dropped, so a backend can forget
    /// the key's lock once nobody waits on it.
    pub fn on_release(mut self, release: impl FnOnce() + Send + 'static) -> Self {
        self.release = Some(Box::new(release));
        self
    }
}

impl Drop for CacheLock {
    fn drop(&mut self) {
        drop(self.guard.take());
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl fmt::Debug for CacheLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheLock")
            .field("result", &self.result)
            .finish_non_exhaustive()
    }
}

#[async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>, CacheError>;

    /// Store `value`; `None` ttl means no expiry.
    async fn set(&self, key: &str, value: Value, ttl: Option<Duration>) -> Result<(), CacheError>;

    async fn invalidate(&self, key: &str) -> Result<(), CacheError>;

    /// Wait for exclusive use of `key`.
    async fn acquire(&self, key: &str) -> Result<CacheLock, CacheError>;
}

/// Return the cached value for `key`, or run `create` under the key's lock
/// and cache its result for `ttl`.
pub async fn get_or_create<E, F, Fut>(
    cache: &dyn Cache,
    key: &str,
    ttl: Option<Duration>,
    create: F,
) -> Result<Value, E>
where
    E: From<CacheError>,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Value, E>>,
{
    let lock = cache.acquire(key).await?;
    if let Some(hit) = lock.result.clone() {
        debug!(key, "cache hit");
        return Ok(hit);
    }
    let value = create().await?;
    cache.set(key, value.clone(), ttl).await?;
    drop(lock);
    Ok(value)
}

// ── In-memory backend ──────────────────────────────────────────────

#[derive(Debug)]
struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|t| Instant::now() >= t)
    }
}

/// Expired entries are swept from the map once every this many writes.
const SWEEP_EVERY: usize = 64;

type LockTable = DashMap<String, Arc<Mutex<()>>>;

/// Process-local cache backed by `DashMap`.
///
/// A key's lock lives only while some task holds or waits on it, and
/// expired entries are swept on write, so the maps stay bounded by the
/// live working set.
#[derive(Debug, Default)]
pub struct InMemoryCache {
    entries: DashMap<String, Entry>,
    locks: Arc<LockTable>,
    writes: AtomicUsize,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop expired entries and locks nobody holds.
    pub fn prune(&self) {
        self.entries.retain(|_, e| !e.is_expired());
        self.locks.retain(|_, lock| Arc::strong_count(lock) > 1);
    }
}

#[async_trait]
impl Cache for InMemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Value>, CacheError> {
        let hit = self
            .entries
            .get(key)
            .map(|e| (e.value.clone(), e.is_expired()));
        match hit {
            Some((_, true)) => {
                self.entries.remove_if(key, |_, e| e.is_expired());
                Ok(None)
            }
            Some((value, false)) => Ok(Some(value)),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: Value, ttl: Option<Duration>) -> Result<(), CacheError> {
        if self.writes.fetch_add(1, Ordering::Relaxed) % SWEEP_EVERY == SWEEP_EVERY - 1 {
            self.entries.retain(|_, e| !e.is_expired());
        }
        self.entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: ttl.map(|d| Instant::now() + d),
            },
        );
        Ok(())
    }

    async fn invalidate(&self, key: &str) -> Result<(), CacheError> {
        self.entries.remove(key);
        Ok(())
    }

    async fn acquire(&self, key: &str) -> Result<CacheLock, CacheError> {
        let lock = self
            .locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let guard = lock.lock_owned().await;
        let result = self.get(key).await?;
        let locks = Arc::clone(&self.locks);
        let key = key.to_string();
        Ok(CacheLock::new(result, guard).on_release(move || {
            // the table's own reference is the only one left
            locks.remove_if(&key, |_, lock| Arc::strong_count(lock) == 1);
        }))
    }
}
