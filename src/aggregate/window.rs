use std::collections::HashSet;
use std::hash::Hash;

use serde::{Deserialize, Serialize};

pub const DEFAULT_WINDOW_CAPACITY: usize = 50;

/// Fixed-capacity, most-recent-first collection.
///
/// New batches go to the front; anything past `capacity` falls off the back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollingWindow<T> {
    capacity: usize,
    items: Vec<T>,
}

impl<T> RollingWindow<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            items: Vec::new(),
        }
    }

    /// Restore a window from previously persisted items (newest first).
    pub fn from_items(capacity: usize, mut items: Vec<T>) -> Self {
        items.truncate(capacity);
        Self { capacity, items }
    }

    /// Prepend `batch`, keeping its order, then drop the oldest overflow.
    /// Returns how many items were evicted.
    pub fn merge(&mut self, batch: Vec<T>) -> usize {
        if batch.is_empty() {
            return 0;
        }

        let before = self.items.len() + batch.len();
        let mut merged = batch;
        merged.append(&mut self.items);
        merged.truncate(self.capacity);
        self.items = merged;
        before - self.items.len()
    }

    /// Like [`merge`](Self::merge), skipping batch items whose key is already
    /// present in the window.
    pub fn merge_unique_by<K, F>(&mut self, batch: Vec<T>, key: F) -> usize
    where
        K: Eq + Hash,
        F: Fn(&T) -> K,
    {
        let known: HashSet<K> = self.items.iter().map(&key).collect();
        let fresh = batch.into_iter().filter(|item| !known.contains(&key(item))).collect();
        self.merge(fresh)
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn into_vec(self) -> Vec<T> {
        self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<T> Default for RollingWindow<T> {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_CAPACITY)
    }
}
