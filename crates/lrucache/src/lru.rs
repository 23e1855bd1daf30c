//! LRU bookkeeping without locking
//!
//! `LruCore` pairs an AHash index with a [`RecencyList`]. The index maps each
//! key to the handle of the list node holding its entry; the list keeps the
//! entries ordered from most to least recently used.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;

use ahash::RandomState;
use recency::{NodeId, RecencyList};
use tracing::trace;

/// Upper bound on slots reserved up front; larger caches grow on demand
const MAX_PREALLOC: usize = 1 << 16;

/// Entry stored as the list payload
struct Entry<K, V> {
    key: K,
    value: V,
}

/// LRU index and recency list with fixed capacity
pub(crate) struct LruCore<K, V> {
    map: HashMap<K, NodeId, RandomState>,
    list: RecencyList<Entry<K, V>>,
    capacity: usize,
}

impl<K, V> LruCore<K, V>
where
    K: Hash + Eq + Clone,
{
    /// Create an empty core holding at most `capacity` entries
    pub(crate) fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "Capacity must be greater than 0");

        let reserved = capacity.min(MAX_PREALLOC);
        Self {
            map: HashMap::with_capacity_and_hasher(reserved, RandomState::new()),
            list: RecencyList::with_capacity(reserved),
            capacity,
        }
    }

    /// Look up `key` and mark it most recently used
    pub(crate) fn get<Q>(&mut self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let id = *self.map.get(key)?;
        if !self.list.move_to_front(id) {
            out_of_sync();
        }

        match self.list.get(id) {
            Some(entry) => Some(&entry.value),
            None => out_of_sync(),
        }
    }

    /// Insert or overwrite `key`; returns `true` if it was already present
    pub(crate) fn put(&mut self, key: K, value: V) -> bool {
        if let Some(&id) = self.map.get(&key) {
            // Update existing
            if !self.list.move_to_front(id) {
                out_of_sync();
            }
            match self.list.get_mut(id) {
                Some(entry) => entry.value = value,
                None => out_of_sync(),
            }
            return true;
        }

        if self.list.len() >= self.capacity {
            self.evict();
        }

        let id = self.list.push_front(Entry {
            key: key.clone(),
            value,
        });
        self.map.insert(key, id);
        false
    }

    /// Check membership without touching recency
    pub(crate) fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.map.contains_key(key)
    }

    pub(crate) fn len(&self) -> usize {
        self.map.len()
    }

    /// Drop every entry; returns how many were dropped
    pub(crate) fn clear(&mut self) -> usize {
        let dropped = self.map.len();
        self.map.clear();
        self.list.clear();
        dropped
    }

    fn evict(&mut self) {
        // len == capacity >= 1, so the tail exists
        let Some(entry) = self.list.pop_back() else {
            out_of_sync();
        };
        if self.map.remove(&entry.key).is_none() {
            out_of_sync();
        }
        trace!(capacity = self.capacity, "evicted least recently used entry");
    }

    /// Panic if the index and list disagree or capacity is exceeded
    pub(crate) fn debug_validate_invariants(&self) {
        self.list.debug_validate_invariants();
        assert_eq!(
            self.list.len(),
            self.map.len(),
            "index and list sizes differ"
        );
        assert!(self.map.len() <= self.capacity, "capacity exceeded");

        for (key, &id) in &self.map {
            let Some(entry) = self.list.get(id) else {
                panic!("index points at a vacant node");
            };
            assert!(entry.key == *key, "index points at another key's node");
        }
    }
}

/// Index and list no longer describe the same entries. Continuing would hand
/// out wrong values, so stop here.
#[cold]
#[inline(never)]
fn out_of_sync() -> ! {
    panic!("lrucache: index and recency list out of sync");
}
