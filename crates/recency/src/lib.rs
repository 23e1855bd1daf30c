//! # recency
//!
//! Doubly linked list used to track access order inside the LRU cache.
//!
//! ## Architecture
//! - **Arena**: nodes live in a `Vec` of slots, recycled through a free list
//! - **Links**: `prev`/`next` are [`NodeId`] indices, not pointers
//! - **Handles**: every [`NodeId`] carries a generation, so a handle to a
//!   removed node is rejected instead of aliasing whatever reuses its slot
//!
//! All operations except iteration are O(1). The list does no locking; the
//! owner serializes access.

#![warn(missing_docs)]

mod list;

pub use list::{Iter, NodeId, RecencyList};
