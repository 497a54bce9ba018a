//! Cache Module
//!
//! Provides the in-memory LRU cache that shadows the database.

mod entry;
mod lru;
mod stats;
mod store;


// Re-export public types
pub use entry::CacheEntry;
pub use lru::LruCache;
pub use stats::{CacheCounters, CacheStats};
pub use store::CacheStore;
