//! Cache Store Module
//!
//! The shared read-through / write-through cache: an [`LruCache`] plus
//! hit/miss/eviction accounting. The coordinator holds it behind a single
//! mutex, so each method here runs as one critical section.

use tracing::trace;

use crate::cache::{CacheCounters, CacheStats, LruCache};

// == Cache Store ==
/// LRU cache with statistics.
#[derive(Debug)]
pub struct CacheStore {
    lru: LruCache,
    counters: CacheCounters,
}

impl CacheStore {
    // == Constructor ==
    /// Creates an empty store holding at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            lru: LruCache::new(capacity),
            counters: CacheCounters::default(),
        }
    }

    // == Get ==
    /// Looks up `key`, promoting it on a hit.
    ///
    /// A miss is a normal outcome and is counted, not reported as an error.
    pub fn get(&mut self, key: &str) -> Option<String> {
        let value = self.lru.get(key).map(str::to_string);
        self.counters.record_lookup(value.is_some());
        value
    }

    // == Put ==
    /// Inserts or overwrites `key`, evicting the least recently used entry
    /// when full.
    pub fn put(&mut self, key: impl Into<String>, value: impl Into<String>) {
        if let Some((evicted, _)) = self.lru.put(key.into(), value.into()) {
            trace!(key = %evicted, "evicted least recently used entry");
            self.counters.record_eviction();
        }
    }

    // == Delete ==
    /// Invalidates `key`. Returns true if an entry was removed.
    pub fn delete(&mut self, key: &str) -> bool {
        self.lru.delete(key).is_some()
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        self.counters.snapshot(self.lru.len(), self.lru.capacity())
    }

    /// Returns the cached value without affecting recency or statistics.
    pub fn peek(&self, key: &str) -> Option<&str> {
        self.lru.peek(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lru.contains(key)
    }

    pub fn len(&self) -> usize {
        self.lru.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lru.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.lru.capacity()
    }

    /// Keys from most to least recently used.
    pub fn keys(&self) -> Vec<&str> {
        self.lru.keys()
    }
}
