//! LruCache: thread-safe LRU cache

use std::borrow::Borrow;
use std::fmt;
use std::hash::Hash;

use parking_lot::RwLock;
use tracing::debug;

use crate::error::{Error, Result};
use crate::lru::LruCore;

/// Fixed-capacity cache that evicts the least recently used entry when full
///
/// Share between threads with `Arc<LruCache<K, V>>`. `get`, `set` and `clear`
/// hold the write lock for O(1) work; `len`, `capacity` and `contains` only
/// read and take the shared lock.
pub struct LruCache<K, V> {
    /// Index and recency list, locked as one unit
    inner: RwLock<LruCore<K, V>>,

    /// Maximum number of entries
    capacity: usize,
}

impl<K, V> LruCache<K, V>
where
    K: Hash + Eq + Clone,
{
    /// Create an empty cache holding at most `capacity` entries
    ///
    /// # Panics
    /// If `capacity` is 0. Use [`LruCache::try_new`] when the capacity comes
    /// from user input.
    pub fn new(capacity: usize) -> Self {
        debug!(capacity, "creating LRU cache");

        Self {
            inner: RwLock::new(LruCore::new(capacity)),
            capacity,
        }
    }

    /// Create an empty cache, rejecting a zero capacity
    ///
    /// # Returns
    /// * `Result<LruCache<K, V>>` - `Error::ZeroCapacity` if `capacity` is 0
    pub fn try_new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::ZeroCapacity);
        }
        Ok(Self::new(capacity))
    }

    /// Insert or overwrite a value and mark it most recently used
    ///
    /// Inserting a new key into a full cache first evicts the least recently
    /// used entry.
    ///
    /// # Returns
    /// * `bool` - `true` if `key` was already cached
    pub fn set(&self, key: K, value: V) -> bool {
        self.inner.write().put(key, value)
    }

    /// Get a copy of the cached value and mark it most recently used
    ///
    /// Takes the write lock: a hit moves the entry to the front of the
    /// recency list.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: Clone,
    {
        self.inner.write().get(key).cloned()
    }

    /// Remove every entry
    pub fn clear(&self) {
        let dropped = self.inner.write().clear();
        debug!(dropped, "cleared LRU cache");
    }

    /// Check if `key` is cached, without marking it used
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.read().contains(key)
    }

    /// Get current number of entries
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get cache capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Panic if the index and recency list disagree
    ///
    /// O(n) under the shared lock; meant for tests and debug checks.
    pub fn debug_validate_invariants(&self) {
        self.inner.read().debug_validate_invariants();
    }
}

impl<K, V> fmt::Debug for LruCache<K, V>
where
    K: Hash + Eq + Clone,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LruCache")
            .field("len", &self.len())
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}
