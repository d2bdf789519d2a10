//! Bounded ring-buffer histories

use std::collections::VecDeque;

use serde::Serialize;

/// Fixed-capacity history. Pushing past capacity evicts the oldest entry.
#[derive(Debug, Clone, Serialize)]
pub struct BoundedHistory<T> {
    items: VecDeque<T>,
    capacity: usize,
    evicted: u64,
}

impl<T> BoundedHistory<T> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
            evicted: 0,
        }
    }

    pub fn push(&mut self, item: T) {
        if self.items.len() >= self.capacity {
            self.items.pop_front();
            self.evicted += 1;
        }
        self.items.push_back(item);
    }

    pub fn extend<I: IntoIterator<Item = T>>(&mut self, items: I) {
        for item in items {
            self.push(item);
        }
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

    /// Entries dropped because the buffer was full
    pub fn evicted(&self) -> u64 {
        self.evicted
    }

    /// Oldest first
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> {
        self.items.iter()
    }

    pub fn latest(&self) -> Option<&T> {
        self.items.back()
    }

    /// Up to `n` most recent entries, newest first
    pub fn recent(&self, n: usize) -> Vec<&T> {
        self.items.iter().rev().take(n).collect()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evicts_oldest() {
        let mut history = BoundedHistory::new(3);
        history.extend(1..=5);

        assert_eq!(history.len(), 3);
        assert_eq!(history.evicted(), 2);
        assert_eq!(history.iter().copied().collect::<Vec<_>>(), vec![3, 4, 5]);
        assert_eq!(history.latest(), Some(&5));
        assert_eq!(history.recent(2), vec![&5, &4]);
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let mut history = BoundedHistory::new(0);
        history.push("a");
        history.push("b");
        assert_eq!(history.capacity(), 1);
        assert_eq!(history.iter().copied().collect::<Vec<_>>(), vec!["b"]);
    }
}
