//! Min-queue driving the k-way sorted merge
//!
//! Entries pair a remote index with the sort key of that remote's buffered
//! head document at push time. A remote is present exactly when it has a
//! buffered document: it is pushed when its buffer turns non-empty and
//! re-pushed with the fresh head key after each pop that leaves the buffer
//! non-empty, so an entry's key always matches the current head.

use braid_core::SortKey;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

#[derive(Debug)]
struct QueueEntry {
    key: SortKey,
    remote_index: usize,
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed so the smallest key surfaces at the top of the max-heap;
        // equal keys prefer the lower remote index
        self.key
            .cmp(&other.key)
            .then_with(|| self.remote_index.cmp(&other.remote_index))
            .reverse()
    }
}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for QueueEntry {}

/// Priority queue of remote indices ordered by their head documents' sort
/// keys, smallest first.
#[derive(Debug, Default)]
pub(crate) struct MergeQueue {
    heap: BinaryHeap<QueueEntry>,
}

impl MergeQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter a remote with its current head key
    pub fn push(&mut self, key: SortKey, remote_index: usize) {
        self.heap.push(QueueEntry { key, remote_index });
    }

    /// Remove and return the remote whose head sorts earliest
    pub fn pop(&mut self) -> Option<usize> {
        self.heap.pop().map(|entry| entry.remote_index)
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }
}
