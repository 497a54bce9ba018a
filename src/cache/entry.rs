//! Cache Entry Module
//!
//! Defines the slot type stored in the LRU recency list.

// == Cache Entry ==
/// A cached record plus its links in the recency list.
///
/// Links are slot indices into the owning [`LruCache`](super::LruCache).
/// `prev == None` marks the head (most recently used), `next == None` the tail.
#[derive(Debug, Clone, Default)]
pub struct CacheEntry {
    /// The record key
    pub key: String,
    /// The record value
    pub value: String,
    pub(crate) prev: Option<usize>,
    pub(crate) next: Option<usize>,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates an unlinked entry.
    pub fn new(key: String, value: String) -> Self {
        Self {
            key,
            value,
            prev: None,
            next: None,
        }
    }

    // == Is Linked ==
    /// Returns true if the entry has a neighbour on either side.
    pub fn is_linked(&self) -> bool {
        self.prev.is_some() || self.next.is_some()
    }
}
