//! Cache accounting.
//!
//! [`CacheCounters`] accumulate inside the store while it is locked;
//! [`CacheStats`] is the copy handed out to `/stats`.

use serde::Serialize;

// == Counters ==
/// Running lookup and eviction totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheCounters {
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl CacheCounters {
    pub fn record_lookup(&mut self, hit: bool) {
        if hit {
            self.hits += 1;
        } else {
            self.misses += 1;
        }
    }

    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    pub fn lookups(&self) -> u64 {
        self.hits + self.misses
    }

    /// Freezes the totals together with the cache's current occupancy.
    pub fn snapshot(&self, total_entries: usize, capacity: usize) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            evictions: self.evictions,
            total_entries,
            capacity,
        }
    }
}

// == Snapshot ==
/// Point-in-time cache statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStats {
    /// Lookups answered from the cache
    pub hits: u64,
    /// Lookups that fell through to the database
    pub misses: u64,
    /// Entries pushed out by the LRU policy
    pub evictions: u64,
    pub total_entries: usize,
    pub capacity: usize,
}

impl CacheStats {
    /// Fraction of lookups that hit, 0.0 before the first lookup.
    pub fn hit_rate(&self) -> f64 {
        match self.hits + self.misses {
            0 => 0.0,
            lookups => self.hits as f64 / lookups as f64,
        }
    }
}
