//! Arena-backed doubly linked list
//!
//! ```text
//!   slots: Vec<Slot<T>>            free_list: [3]
//!   ┌───┬─────┬──────────────────────────────────────┐
//!   │ 0 │ g=0 │ Node { payload: A, prev: -, next: 2 } │ ◄── head
//!   │ 1 │ g=0 │ Node { payload: C, prev: 2, next: - } │ ◄── tail
//!   │ 2 │ g=0 │ Node { payload: B, prev: 0, next: 1 } │
//!   │ 3 │ g=1 │ (vacant)                              │
//!   └───┴─────┴──────────────────────────────────────┘
//! ```
//!
//! A slot's generation is bumped whenever its node is released, so a stale
//! [`NodeId`] never resolves to a node pushed later into the same slot.

use std::fmt;
use std::iter::FusedIterator;

/// Handle to a node linked into a [`RecencyList`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    index: usize,
    generation: u32,
}

struct Node<T> {
    payload: T,
    prev: Option<NodeId>,
    next: Option<NodeId>,
}

struct Slot<T> {
    generation: u32,
    node: Option<Node<T>>,
}

/// Doubly linked list ordered from most recently used (front) to least
/// recently used (back)
pub struct RecencyList<T> {
    slots: Vec<Slot<T>>,
    free_list: Vec<usize>,
    head: Option<NodeId>,
    tail: Option<NodeId>,
    len: usize,
}

impl<T> RecencyList<T> {
    /// Create an empty list
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create an empty list with room for `capacity` nodes
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free_list: Vec::new(),
            head: None,
            tail: None,
            len: 0,
        }
    }

    /// Number of linked nodes
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if the list has no nodes
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Handle of the head (most recently pushed or moved) node
    pub fn front(&self) -> Option<NodeId> {
        self.head
    }

    /// Handle of the tail node
    pub fn back(&self) -> Option<NodeId> {
        self.tail
    }

    /// Check if `id` refers to a node currently linked in this list
    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    /// Payload of the node behind `id`
    pub fn get(&self, id: NodeId) -> Option<&T> {
        self.node(id).map(|node| &node.payload)
    }

    /// Mutable payload of the node behind `id`
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut T> {
        self.node_mut(id).map(|node| &mut node.payload)
    }

    /// Handle of the node after `id` (towards the back)
    pub fn next(&self, id: NodeId) -> Option<NodeId> {
        self.node(id)?.next
    }

    /// Handle of the node before `id` (towards the front)
    pub fn prev(&self, id: NodeId) -> Option<NodeId> {
        self.node(id)?.prev
    }

    /// Link a new node holding `payload` as the head
    pub fn push_front(&mut self, payload: T) -> NodeId {
        let id = self.alloc(payload);
        self.attach_front(id);
        id
    }

    /// Link a new node holding `payload` as the tail
    pub fn push_back(&mut self, payload: T) -> NodeId {
        let id = self.alloc(payload);
        self.attach_back(id);
        id
    }

    /// Unlink the node behind `id` and hand back its payload
    ///
    /// Returns `None` if `id` is stale (already removed, or cleared).
    pub fn remove(&mut self, id: NodeId) -> Option<T> {
        self.detach(id)?;
        let slot = &mut self.slots[id.index];
        let node = slot.node.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free_list.push(id.index);
        Some(node.payload)
    }

    /// Unlink the tail node and hand back its payload
    pub fn pop_back(&mut self) -> Option<T> {
        let id = self.tail?;
        self.remove(id)
    }

    /// Relink an existing node as the head, keeping its handle and payload
    ///
    /// Returns `false` if `id` is stale.
    pub fn move_to_front(&mut self, id: NodeId) -> bool {
        if !self.contains(id) {
            return false;
        }
        if self.head == Some(id) {
            return true;
        }

        self.detach(id);
        self.attach_front(id);
        true
    }

    /// Drop every node; all outstanding handles become stale
    pub fn clear(&mut self) {
        self.free_list.clear();
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.node.take().is_some() {
                slot.generation = slot.generation.wrapping_add(1);
            }
            self.free_list.push(index);
        }
        self.head = None;
        self.tail = None;
        self.len = 0;
    }

    /// Iterate payloads from front to back
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            list: self,
            current: self.head,
            remaining: self.len,
        }
    }

    /// Walk the chain and panic if any structural invariant is broken
    ///
    /// O(n); meant for tests and debug checks.
    pub fn debug_validate_invariants(&self) {
        if self.head.is_none() || self.tail.is_none() {
            assert!(self.head.is_none(), "head set on an empty list");
            assert!(self.tail.is_none(), "tail set on an empty list");
            assert_eq!(self.len, 0, "empty chain with non-zero len");
        }

        let mut count = 0usize;
        let mut prev = None;
        let mut current = self.head;
        while let Some(id) = current {
            let Some(node) = self.node(id) else {
                panic!("link points at a vacant slot");
            };
            assert_eq!(node.prev, prev, "broken back link");
            prev = Some(id);
            current = node.next;
            count += 1;
            assert!(count <= self.len, "chain longer than len (cycle?)");
        }

        assert_eq!(prev, self.tail, "chain does not end at tail");
        assert_eq!(count, self.len);

        let occupied = self.slots.iter().filter(|slot| slot.node.is_some()).count();
        assert_eq!(occupied, self.len, "unlinked node left in the arena");
        assert_eq!(occupied + self.free_list.len(), self.slots.len());
    }

    fn alloc(&mut self, payload: T) -> NodeId {
        let node = Node {
            payload,
            prev: None,
            next: None,
        };

        if let Some(index) = self.free_list.pop() {
            let slot = &mut self.slots[index];
            slot.node = Some(node);
            NodeId {
                index,
                generation: slot.generation,
            }
        } else {
            let index = self.slots.len();
            self.slots.push(Slot {
                generation: 0,
                node: Some(node),
            });
            NodeId {
                index,
                generation: 0,
            }
        }
    }

    fn node(&self, id: NodeId) -> Option<&Node<T>> {
        self.slots
            .get(id.index)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node<T>> {
        self.slots
            .get_mut(id.index)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
    }

    fn detach(&mut self, id: NodeId) -> Option<()> {
        let (prev, next) = {
            let node = self.node(id)?;
            (node.prev, node.next)
        };

        match prev {
            Some(prev_id) => {
                if let Some(prev_node) = self.node_mut(prev_id) {
                    prev_node.next = next;
                }
            }
            None => self.head = next,
        }

        match next {
            Some(next_id) => {
                if let Some(next_node) = self.node_mut(next_id) {
                    next_node.prev = prev;
                }
            }
            None => self.tail = prev,
        }

        if let Some(node) = self.node_mut(id) {
            node.prev = None;
            node.next = None;
        }
        self.len -= 1;
        Some(())
    }

    fn attach_front(&mut self, id: NodeId) {
        let old_head = self.head;
        match self.node_mut(id) {
            Some(node) => {
                node.prev = None;
                node.next = old_head;
            }
            None => return,
        }

        match old_head {
            Some(head_id) => {
                if let Some(head) = self.node_mut(head_id) {
                    head.prev = Some(id);
                }
            }
            None => self.tail = Some(id),
        }

        self.head = Some(id);
        self.len += 1;
    }

    fn attach_back(&mut self, id: NodeId) {
        let old_tail = self.tail;
        match self.node_mut(id) {
            Some(node) => {
                node.next = None;
                node.prev = old_tail;
            }
            None => return,
        }

        match old_tail {
            Some(tail_id) => {
                if let Some(tail) = self.node_mut(tail_id) {
                    tail.next = Some(id);
                }
            }
            None => self.head = Some(id),
        }

        self.tail = Some(id);
        self.len += 1;
    }
}

impl<T> Default for RecencyList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for RecencyList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

/// Front-to-back iterator over list payloads
pub struct Iter<'a, T> {
    list: &'a RecencyList<T>,
    current: Option<NodeId>,
    remaining: usize,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.current?;
        let node = self.list.node(id)?;
        self.current = node.next;
        self.remaining = self.remaining.saturating_sub(1);
        Some(&node.payload)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

impl<T> FusedIterator for Iter<'_, T> {}

impl<'a, T> IntoIterator for &'a RecencyList<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect<T: Clone>(list: &RecencyList<T>) -> Vec<T> {
        list.iter().cloned().collect()
    }

    #[test]
    fn test_empty_list() {
        let list: RecencyList<i32> = RecencyList::new();

        assert_eq!(list.len(), 0);
        assert!(list.is_empty());
        assert!(list.front().is_none());
        assert!(list.back().is_none());
        list.debug_validate_invariants();
    }

    #[test]
    fn test_push_onto_empty_sets_both_ends() {
        let mut list = RecencyList::new();
        let id = list.push_back(1);

        assert_eq!(list.front(), Some(id));
        assert_eq!(list.back(), Some(id));
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_mixed_operations() {
        let mut list = RecencyList::new();

        list.push_front(10); // [10]
        list.push_back(20); // [10, 20]
        list.push_back(30); // [10, 20, 30]
        assert_eq!(list.len(), 3);

        let middle = list.next(list.front().unwrap()).unwrap();
        assert_eq!(list.remove(middle), Some(20)); // [10, 30]
        assert_eq!(list.len(), 2);

        for (i, v) in [40, 50, 60, 70, 80].into_iter().enumerate() {
            if i % 2 == 0 {
                list.push_front(v);
            } else {
                list.push_back(v);
            }
        } // [80, 60, 40, 10, 30, 50, 70]

        assert_eq!(list.len(), 7);
        assert_eq!(list.get(list.front().unwrap()), Some(&80));
        assert_eq!(list.get(list.back().unwrap()), Some(&70));

        assert!(list.move_to_front(list.front().unwrap())); // unchanged
        assert!(list.move_to_front(list.back().unwrap())); // [70, 80, 60, 40, 10, 30, 50]

        assert_eq!(collect(&list), vec![70, 80, 60, 40, 10, 30, 50]);
        list.debug_validate_invariants();
    }

    #[test]
    fn test_payloads_of_different_shapes() {
        #[derive(Debug, Clone, PartialEq)]
        enum Payload {
            Text(&'static str),
            Int(i64),
            Float(f64),
            Pair(&'static str, u8),
        }

        let mut list = RecencyList::new();
        list.push_back(Payload::Text("123"));
        list.push_back(Payload::Int(123));
        list.push_back(Payload::Float(123.123));
        list.push_back(Payload::Pair("asd", 1));

        assert_eq!(list.pop_front_for_test(), Some(Payload::Text("123")));
        assert_eq!(list.pop_front_for_test(), Some(Payload::Int(123)));
        assert_eq!(list.pop_front_for_test(), Some(Payload::Float(123.123)));
        assert_eq!(list.pop_front_for_test(), Some(Payload::Pair("asd", 1)));
        assert!(list.is_empty());
    }

    impl<T> RecencyList<T> {
        fn pop_front_for_test(&mut self) -> Option<T> {
            let id = self.front()?;
            self.remove(id)
        }
    }

    #[test]
    fn test_remove_sole_element() {
        let mut list = RecencyList::new();
        let id = list.push_front("only");

        assert_eq!(list.remove(id), Some("only"));
        assert!(list.front().is_none());
        assert!(list.back().is_none());
        assert_eq!(list.len(), 0);
        list.debug_validate_invariants();
    }

    #[test]
    fn test_remove_head_and_tail() {
        let mut list = RecencyList::new();
        let a = list.push_back('a');
        let b = list.push_back('b');
        let c = list.push_back('c');

        assert_eq!(list.remove(a), Some('a'));
        assert_eq!(list.front(), Some(b));
        assert_eq!(list.prev(b), None);

        assert_eq!(list.remove(c), Some('c'));
        assert_eq!(list.back(), Some(b));
        assert_eq!(list.next(b), None);

        assert_eq!(collect(&list), vec!['b']);
        list.debug_validate_invariants();
    }

    #[test]
    fn test_move_to_front_keeps_identity() {
        let mut list = RecencyList::new();
        let a = list.push_back("a");
        list.push_back("b");
        let c = list.push_back("c");

        assert!(list.move_to_front(c));
        assert_eq!(list.front(), Some(c));
        assert_eq!(list.get(c), Some(&"c"));
        assert_eq!(list.back().and_then(|id| list.get(id)), Some(&"b"));
        assert_eq!(list.len(), 3);

        assert!(list.move_to_front(a));
        assert_eq!(collect(&list), vec!["a", "c", "b"]);
        list.debug_validate_invariants();
    }

    #[test]
    fn test_stale_handle_rejected() {
        let mut list = RecencyList::new();
        let old = list.push_front(1);
        list.remove(old);

        // Reuses the freed slot
        let new = list.push_front(2);

        assert_ne!(old, new);
        assert!(!list.contains(old));
        assert_eq!(list.get(old), None);
        assert_eq!(list.remove(old), None);
        assert!(!list.move_to_front(old));
        assert_eq!(list.get(new), Some(&2));
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_clear_invalidates_handles() {
        let mut list = RecencyList::new();
        let a = list.push_back(1);
        let b = list.push_back(2);

        list.clear();

        assert!(list.is_empty());
        assert!(!list.contains(a));
        assert!(!list.contains(b));
        list.debug_validate_invariants();

        let c = list.push_back(3);
        assert!(!list.contains(a));
        assert!(!list.contains(b));
        assert_eq!(list.get(c), Some(&3));
        list.debug_validate_invariants();
    }

    #[test]
    fn test_pop_back() {
        let mut list = RecencyList::new();
        list.push_front(1);
        list.push_front(2);

        assert_eq!(list.pop_back(), Some(1));
        assert_eq!(list.pop_back(), Some(2));
        assert_eq!(list.pop_back(), None);
    }

    #[test]
    fn test_get_mut_updates_in_place() {
        let mut list = RecencyList::new();
        let id = list.push_back(String::from("old"));

        if let Some(payload) = list.get_mut(id) {
            payload.push_str("-new");
        }

        assert_eq!(list.get(id).map(String::as_str), Some("old-new"));
    }

    #[test]
    fn test_iter_len() {
        let mut list = RecencyList::new();
        for i in 0..5 {
            list.push_back(i);
        }

        let iter = list.iter();
        assert_eq!(iter.len(), 5);
        assert_eq!(format!("{:?}", list), "[0, 1, 2, 3, 4]");
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::VecDeque;

    #[derive(Debug, Clone)]
    enum Op {
        PushFront,
        PushBack,
        Remove(usize),
        MoveToFront(usize),
        PopBack,
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            Just(Op::PushFront),
            Just(Op::PushBack),
            any::<usize>().prop_map(Op::Remove),
            any::<usize>().prop_map(Op::MoveToFront),
            Just(Op::PopBack),
        ]
    }

    proptest! {
        /// The list matches a VecDeque model after any sequence of operations.
        #[test]
        fn prop_matches_model(ops in prop::collection::vec(op_strategy(), 0..200)) {
            let mut list = RecencyList::new();
            let mut model: VecDeque<(NodeId, u32)> = VecDeque::new();
            let mut next_value = 0u32;

            for op in ops {
                match op {
                    Op::PushFront => {
                        let id = list.push_front(next_value);
                        model.push_front((id, next_value));
                        next_value += 1;
                    }
                    Op::PushBack => {
                        let id = list.push_back(next_value);
                        model.push_back((id, next_value));
                        next_value += 1;
                    }
                    Op::Remove(pick) if !model.is_empty() => {
                        let (id, value) = model.remove(pick % model.len()).unwrap();
                        prop_assert_eq!(list.remove(id), Some(value));
                        prop_assert!(!list.contains(id));
                    }
                    Op::MoveToFront(pick) if !model.is_empty() => {
                        let entry = model.remove(pick % model.len()).unwrap();
                        prop_assert!(list.move_to_front(entry.0));
                        model.push_front(entry);
                    }
                    Op::PopBack => {
                        let expected = model.pop_back().map(|(_, value)| value);
                        prop_assert_eq!(list.pop_back(), expected);
                    }
                    _ => {}
                }

                list.debug_validate_invariants();
                prop_assert_eq!(list.len(), model.len());
                prop_assert_eq!(list.front(), model.front().map(|(id, _)| *id));
                prop_assert_eq!(list.back(), model.back().map(|(id, _)| *id));
            }

            let actual: Vec<u32> = list.iter().copied().collect();
            let expected: Vec<u32> = model.iter().map(|(_, value)| *value).collect();
            prop_assert_eq!(actual, expected);
        }
    }
}
