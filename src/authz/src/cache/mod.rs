//! Caching for store and directory collections
//!
//! [`MemoizedCache`] is the generic building block: a bounded, TTL-expiring
//! map whose concurrent misses for one key share a single load.
//! [`DataCache`] wires one memoized cache per collection the resolvers read
//! (groups, applications, connections) and is constructed once per process,
//! then shared by `Arc`.

mod data;
mod memoized;
mod singleflight;

pub use data::{DataCache, DataCacheStats};
pub use memoized::MemoizedCache;

use std::time::Duration;

/// Default number of keys per cache
pub const DEFAULT_CAPACITY: usize = 100;

/// Default time-to-live for cached collections
pub const DEFAULT_TTL: Duration = Duration::from_secs(60);

/// Cache configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum number of keys held before LRU eviction
    pub capacity: usize,

    /// Age after which an entry is reloaded
    pub ttl: Duration,
}

impl CacheConfig {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self { capacity, ttl }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            ttl: DEFAULT_TTL,
        }
    }
}

/// Cache statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
    /// Entries found expired on access
    pub expirations: usize,
    /// Loader invocations
    pub loads: usize,
    /// Callers that waited on another caller's load
    pub coalesced: usize,
    pub evictions: usize,
    pub entries: usize,
    pub capacity: usize,
}

impl CacheStats {
    /// Calculate cache hit rate
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_rate() {
        assert_eq!(CacheStats::default().hit_rate(), 0.0);

        let stats = CacheStats {
            hits: 3,
            misses: 1,
            ..Default::default()
        };
        assert!((stats.hit_rate() - 0.75).abs() < f64::EPSILON);
    }
}
