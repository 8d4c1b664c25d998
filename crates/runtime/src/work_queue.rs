//! Deduplicating FIFO work queue.
//!
//! Key properties:
//! - Items are popped in insertion order.
//! - At most one item per key is queued at any time; pushing a key that is
//!   already queued is a no-op.
//! - Once an item is popped its key may be queued again.
//!
//! The key set is kept alongside the `VecDeque` so membership checks stay
//! O(1) regardless of queue length.

use std::collections::{HashSet, VecDeque};
use std::hash::Hash;

#[derive(Debug)]
pub struct WorkQueue<K, T> {
    items: VecDeque<(K, T)>,
    queued: HashSet<K>,
}

impl<K, T> Default for WorkQueue<K, T> {
    fn default() -> Self {
        Self {
            items: VecDeque::new(),
            queued: HashSet::new(),
        }
    }
}

impl<K, T> WorkQueue<K, T>
where
    K: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.queued.contains(key)
    }

    /// Appends `payload` under `key`.
    ///
    /// Returns `false` (and drops `payload`) when the key is already queued.
    pub fn push(&mut self, key: K, payload: T) -> bool {
        if !self.queued.insert(key.clone()) {
            return false;
        }
        self.items.push_back((key, payload));
        true
    }

    /// Pops the oldest item and releases its key.
    pub fn pop(&mut self) -> Option<(K, T)> {
        let (key, payload) = self.items.pop_front()?;
        self.queued.remove(&key);
        Some((key, payload))
    }
}
