//! LRU Cache Module
//!
//! Bounded key-value map with least-recently-used eviction.
//!
//! Entries live in a slab (`Vec<CacheEntry>`) and are threaded into a doubly
//! linked recency list by index. A `HashMap` maps each key to its slot, so
//! lookup, promotion, insertion and removal are all O(1).
//!
//! ```text
//!   head (MRU) ──► [a] ◄──► [c] ◄──► [b] ◄── tail (LRU)
//! ```

use std::collections::HashMap;
use std::mem;

use crate::cache::CacheEntry;

// == LRU Cache ==
/// Fixed-capacity LRU map from `String` keys to `String` values.
#[derive(Debug)]
pub struct LruCache {
    /// Entry storage; freed slots are recycled through `free`
    slots: Vec<CacheEntry>,
    /// Indices of unused slots
    free: Vec<usize>,
    /// Key to slot index
    index: HashMap<String, usize>,
    /// Most recently used slot
    head: Option<usize>,
    /// Least recently used slot
    tail: Option<usize>,
    capacity: usize,
}

impl LruCache {
    // == Constructor ==
    /// Creates an empty cache holding at most `capacity` entries.
    ///
    /// A zero-capacity cache accepts writes but never stores anything.
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
            index: HashMap::with_capacity(capacity),
            head: None,
            tail: None,
            capacity,
        }
    }

    // == Put ==
    /// Inserts or overwrites `key`, leaving it at the head.
    ///
    /// Returns the evicted `(key, value)` pair when a new key pushed the
    /// cache past capacity.
    pub fn put(&mut self, key: String, value: String) -> Option<(String, String)> {
        if self.capacity == 0 {
            return None;
        }

        if let Some(&idx) = self.index.get(&key) {
            self.slots[idx].value = value;
            self.promote(idx);
            return None;
        }

        let evicted = if self.index.len() >= self.capacity {
            self.pop_lru()
        } else {
            None
        };

        let entry = CacheEntry::new(key.clone(), value);
        let idx = match self.free.pop() {
            Some(idx) => {
                self.slots[idx] = entry;
                idx
            }
            None => {
                self.slots.push(entry);
                self.slots.len() - 1
            }
        };
        self.attach_front(idx);
        self.index.insert(key, idx);

        evicted
    }

    // == Get ==
    /// Returns the value for `key` and promotes it to most recently used.
    pub fn get(&mut self, key: &str) -> Option<&str> {
        let idx = *self.index.get(key)?;
        self.promote(idx);
        Some(self.slots[idx].value.as_str())
    }

    // == Delete ==
    /// Removes `key`, returning its value if it was present.
    pub fn delete(&mut self, key: &str) -> Option<String> {
        let idx = self.index.remove(key)?;
        let (_, value) = self.release_slot(idx);
        Some(value)
    }

    // == Peek ==
    /// Returns the value for `key` without touching recency order.
    pub fn peek(&self, key: &str) -> Option<&str> {
        self.index
            .get(key)
            .map(|&idx| self.slots[idx].value.as_str())
    }

    // == Peek LRU ==
    /// Returns the least recently used entry without removing it.
    pub fn peek_lru(&self) -> Option<(&str, &str)> {
        self.tail.map(|idx| {
            let entry = &self.slots[idx];
            (entry.key.as_str(), entry.value.as_str())
        })
    }

    // == Pop LRU ==
    /// Removes and returns the least recently used entry.
    pub fn pop_lru(&mut self) -> Option<(String, String)> {
        let idx = self.tail?;
        let (key, value) = self.release_slot(idx);
        self.index.remove(&key);
        Some((key, value))
    }

    /// Checks membership without touching recency order.
    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    // == Keys ==
    /// Returns keys ordered from most to least recently used. O(n).
    pub fn keys(&self) -> Vec<&str> {
        let mut keys = Vec::with_capacity(self.len());
        let mut cursor = self.head;
        while let Some(idx) = cursor {
            keys.push(self.slots[idx].key.as_str());
            cursor = self.slots[idx].next;
        }
        keys
    }

    // == Internal List Operations ==

    fn promote(&mut self, idx: usize) {
        if self.head == Some(idx) {
            return;
        }
        self.detach(idx);
        self.attach_front(idx);
    }

    fn detach(&mut self, idx: usize) {
        let (prev, next) = {
            let entry = &self.slots[idx];
            (entry.prev, entry.next)
        };

        match prev {
            Some(p) => self.slots[p].next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.slots[n].prev = prev,
            None => self.tail = prev,
        }

        let entry = &mut self.slots[idx];
        entry.prev = None;
        entry.next = None;
    }

    fn attach_front(&mut self, idx: usize) {
        let old_head = self.head;
        {
            let entry = &mut self.slots[idx];
            entry.prev = None;
            entry.next = old_head;
        }
        match old_head {
            Some(h) => self.slots[h].prev = Some(idx),
            None => self.tail = Some(idx),
        }
        self.head = Some(idx);
    }

    /// Unlinks a slot, moves its strings out and marks it free.
    fn release_slot(&mut self, idx: usize) -> (String, String) {
        self.detach(idx);
        self.free.push(idx);
        let entry = &mut self.slots[idx];
        (mem::take(&mut entry.key), mem::take(&mut entry.value))
    }
}
