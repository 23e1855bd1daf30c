//! # lrucache
//!
//! Bounded, thread-safe LRU cache.
//!
//! ## Architecture
//! - **HashMap**: AHash index from key to list node (O(1) lookup)
//! - **Recency list**: arena-backed doubly linked list, most recently used
//!   at the front (O(1) reorder and eviction)
//! - **Locking**: one `parking_lot::RwLock` guards index and list together;
//!   `get`, `set` and `clear` all take the write lock because every hit
//!   reorders the list
//!
//! ```
//! use lrucache::LruCache;
//!
//! let cache = LruCache::new(2);
//! assert!(!cache.set("a", 1));
//! assert!(!cache.set("b", 2));
//! assert_eq!(cache.get("a"), Some(1));
//!
//! // "b" is now least recently used and makes room for "c"
//! cache.set("c", 3);
//! assert_eq!(cache.get("b"), None);
//! ```

#![warn(missing_docs)]

mod cache;
mod error;
mod lru;

pub use cache::LruCache;
pub use error::{Error, Result};
