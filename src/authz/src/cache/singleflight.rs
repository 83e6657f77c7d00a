//! In-flight load table used to coalesce concurrent cache misses

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::hash::Hash;
use tokio::sync::broadcast;

/// Result of trying to claim a load for a key
pub(crate) enum Slot<T> {
    /// This caller runs the load and broadcasts its result
    Leader(broadcast::Sender<T>),
    /// Another caller is loading; wait for its result
    Follower(broadcast::Receiver<T>),
}

/// Table of loads currently in flight, keyed like the cache itself
pub(crate) struct Singleflight<K, T>
where
    K: Hash + Eq,
{
    in_flight: DashMap<K, broadcast::Sender<T>>,
}

impl<K, T> Singleflight<K, T>
where
    K: Hash + Eq + Clone,
    T: Clone,
{
    pub(crate) fn new() -> Self {
        Self {
            in_flight: DashMap::new(),
        }
    }

    /// Atomically become the leader for `key` or subscribe to the current one
    pub(crate) fn acquire(&self, key: K) -> Slot<T> {
        match self.in_flight.entry(key) {
            Entry::Occupied(entry) => Slot::Follower(entry.get().subscribe()),
            Entry::Vacant(entry) => {
                let (tx, _rx) = broadcast::channel(1);
                entry.insert(tx.clone());
                Slot::Leader(tx)
            }
        }
    }

    /// Drop the in-flight record for `key`
    ///
    /// Must run before the leader broadcasts, so every subscriber attached
    /// to the record receives the result.
    pub(crate) fn complete(&self, key: &K) {
        self.in_flight.remove(key);
    }

    pub(crate) fn len(&self) -> usize {
        self.in_flight.len()
    }
}

/// Removes the in-flight record if the leader is dropped mid-load
///
/// Followers then observe a closed channel and retry.
pub(crate) struct SingleflightGuard<'a, K, T>
where
    K: Hash + Eq + Clone,
    T: Clone,
{
    singleflight: &'a Singleflight<K, T>,
    key: K,
    completed: bool,
}

impl<'a, K, T> SingleflightGuard<'a, K, T>
where
    K: Hash + Eq + Clone,
    T: Clone,
{
    pub(crate) fn new(singleflight: &'a Singleflight<K, T>, key: K) -> Self {
        Self {
            singleflight,
            key,
            completed: false,
        }
    }

    pub(crate) fn complete(mut self) {
        self.singleflight.complete(&self.key);
        self.completed = true;
    }
}

impl<K, T> Drop for SingleflightGuard<'_, K, T>
where
    K: Hash + Eq + Clone,
    T: Clone,
{
    fn drop(&mut self) {
        if !self.completed {
            self.singleflight.complete(&self.key);
        }
    }
}
