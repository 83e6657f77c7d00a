//! Keyed memoization with TTL, LRU capacity bound and load coalescing

use super::singleflight::{Singleflight, SingleflightGuard, Slot};
use super::{CacheConfig, CacheStats};
use crate::error::{AuthzError, Result};

use dashmap::DashMap;
use lru::LruCache;
use parking_lot::Mutex;
use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Cached value with its expiry deadline
struct CacheEntry<V> {
    value: Arc<V>,
    expires_at: Instant,
}

impl<V> CacheEntry<V> {
    fn new(value: Arc<V>, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: Instant::now() + ttl,
        }
    }

    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// Memoizing cache keyed by caller-supplied keys
///
/// On a miss (or an expired entry) the loader passed to [`get_with`] runs
/// once per key no matter how many callers are waiting: concurrent callers
/// for the same key subscribe to the in-flight load and receive the same
/// value or the same error. Errors are never cached.
///
/// Entries are replaced whole on reload and evicted least-recently-used once
/// the capacity is reached.
///
/// [`get_with`]: MemoizedCache::get_with
pub struct MemoizedCache<K, V>
where
    K: Hash + Eq,
{
    /// Cache name used in logs
    name: &'static str,

    entries: Mutex<LruCache<K, CacheEntry<V>>>,

    in_flight: Singleflight<K, Result<Arc<V>>>,

    ttl: Duration,

    capacity: NonZeroUsize,

    /// Bumped by `invalidate` and `clear`; loads started under an older
    /// generation are returned to their callers but not stored
    generation: AtomicU64,

    stats: DashMap<&'static str, usize>,
}

impl<K, V> MemoizedCache<K, V>
where
    K: Hash + Eq + Clone + Debug,
{
    /// Create a cache; a zero capacity is raised to one entry
    pub fn new(name: &'static str, config: CacheConfig) -> Self {
        let capacity = NonZeroUsize::new(config.capacity).unwrap_or(NonZeroUsize::MIN);

        Self {
            name,
            entries: Mutex::new(LruCache::new(capacity)),
            in_flight: Singleflight::new(),
            ttl: config.ttl,
            capacity,
            generation: AtomicU64::new(0),
            stats: DashMap::new(),
        }
    }

    /// Return the cached value for `key`, loading it with `load` if absent
    /// or expired
    ///
    /// # Errors
    ///
    /// Returns the loader's error unchanged. Every caller coalesced onto the
    /// failed load receives a clone of the same error, and the next call
    /// retries the load.
    pub async fn get_with<F, Fut>(&self, key: K, load: F) -> Result<Arc<V>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>>,
    {
        let mut load = Some(load);

        loop {
            if let Some(value) = self.lookup(&key) {
                self.increment_stat("hits");
                debug!(cache = self.name, key = ?key, "cache hit");
                return Ok(value);
            }

            match self.in_flight.acquire(key.clone()) {
                Slot::Leader(tx) => {
                    let guard = SingleflightGuard::new(&self.in_flight, key.clone());
                    let generation = self.generation.load(Ordering::Acquire);

                    // The previous leader may have stored a value after our lookup
                    let result = match self.lookup(&key) {
                        Some(value) => Ok(value),
                        None => {
                            let Some(load) = load.take() else {
                                return Err(AuthzError::Internal(format!(
                                    "{} cache loader already consumed",
                                    self.name
                                )));
                            };
                            self.load_and_store(&key, generation, load).await
                        }
                    };

                    guard.complete();
                    // No subscribers is not an error
                    let _ = tx.send(result.clone());
                    return result;
                }
                Slot::Follower(mut rx) => {
                    self.increment_stat("coalesced");
                    debug!(cache = self.name, key = ?key, "joining in-flight load");

                    match rx.recv().await {
                        Ok(result) => return result,
                        Err(_) => {
                            debug!(
                                cache = self.name,
                                key = ?key,
                                "in-flight load abandoned, retrying"
                            );
                        }
                    }
                }
            }
        }
    }

    async fn load_and_store<F, Fut>(&self, key: &K, generation: u64, load: F) -> Result<Arc<V>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>>,
    {
        self.increment_stat("misses");
        self.increment_stat("loads");
        debug!(cache = self.name, key = ?key, "cache miss, loading");

        match load().await {
            Ok(value) => {
                let value = Arc::new(value);
                self.insert(key.clone(), value.clone(), generation);
                Ok(value)
            }
            Err(err) => {
                warn!(cache = self.name, key = ?key, error = %err, "cache load failed");
                Err(err)
            }
        }
    }

    /// Returns a live entry, dropping it if expired
    fn lookup(&self, key: &K) -> Option<Arc<V>> {
        let mut entries = self.entries.lock();

        let expired = match entries.get(key) {
            Some(entry) if !entry.is_expired() => return Some(entry.value.clone()),
            Some(_) => true,
            None => false,
        };

        if expired {
            entries.pop(key);
            drop(entries);
            self.increment_stat("expirations");
        }

        None
    }

    fn insert(&self, key: K, value: Arc<V>, generation: u64) {
        let mut entries = self.entries.lock();

        if self.generation.load(Ordering::Acquire) != generation {
            drop(entries);
            debug!(cache = self.name, key = ?key, "cache invalidated during load, not storing");
            return;
        }

        let displaced = entries.push(key.clone(), CacheEntry::new(value, self.ttl));
        drop(entries);

        if let Some((old_key, _)) = displaced {
            if old_key != key {
                self.increment_stat("evictions");
                debug!(cache = self.name, key = ?old_key, "evicted least recently used entry");
            }
        }
    }

    /// Drop the entry for `key`; the next access reloads it
    ///
    /// Loads already in flight still answer their callers, but their result
    /// is not stored.
    pub fn invalidate(&self, key: &K) {
        let mut entries = self.entries.lock();
        self.generation.fetch_add(1, Ordering::AcqRel);
        entries.pop(key);
    }

    /// Drop every entry, including results of loads still in flight
    pub fn clear(&self) {
        let mut entries = self.entries.lock();
        self.generation.fetch_add(1, Ordering::AcqRel);
        entries.clear();
    }

    /// Number of stored entries, including ones not yet noticed as expired
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of loads currently in flight
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.get_stat("hits"),
            misses: self.get_stat("misses"),
            expirations: self.get_stat("expirations"),
            loads: self.get_stat("loads"),
            coalesced: self.get_stat("coalesced"),
            evictions: self.get_stat("evictions"),
            entries: self.len(),
            capacity: self.capacity.get(),
        }
    }

    fn increment_stat(&self, key: &'static str) {
        self.stats
            .entry(key)
            .and_modify(|count| *count += 1)
            .or_insert(1);
    }

    fn get_stat(&self, key: &'static str) -> usize {
        self.stats.get(key).map(|v| *v).unwrap_or(0)
    }
}
