//! Bounded memory of ids that were removed during a session.
//!
//! # Invariants
//! - Holds at most `capacity` ids; inserting past that forgets the oldest.
//! - Re-inserting a remembered id does not refresh its age.

use std::collections::{HashSet, VecDeque};
use std::hash::Hash;

#[derive(Debug)]
pub struct TombstoneSet<K> {
    capacity: usize,
    members: HashSet<K>,
    order: VecDeque<K>,
}

impl<K: Copy + Eq + Hash> TombstoneSet<K> {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            members: HashSet::new(),
            order: VecDeque::new(),
        }
    }

    /// Remembers `id`; returns the id evicted to make room, if any.
    pub fn insert(&mut self, id: K) -> Option<K> {
        if self.capacity == 0 || !self.members.insert(id) {
            return None;
        }
        self.order.push_back(id);
        if self.order.len() <= self.capacity {
            return None;
        }
        let evicted = self.order.pop_front()?;
        self.members.remove(&evicted);
        Some(evicted)
    }

    pub fn contains(&self, id: &K) -> bool {
        self.members.contains(id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn clear(&mut self) {
        self.members.clear();
        self.order.clear();
    }
}
