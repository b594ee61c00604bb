//! Newest-First Feed Buffer Implementation

use crate::BufferError;
use std::collections::VecDeque;

/// Default buffer capacity (last 50 alerts)
pub const DEFAULT_CAPACITY: usize = 50;

/// Bounded buffer that keeps the most recent entries, newest first.
///
/// Inserting into a full buffer evicts the oldest entry. The buffer is
/// owned by a single writer; readers take copies via [`FeedBuffer::snapshot`].
#[derive(Debug, Clone)]
pub struct FeedBuffer<T> {
    /// Entries, index 0 is the newest
    entries: VecDeque<T>,
    /// Maximum number of entries kept
    capacity: usize,
    /// Total entries inserted (for statistics)
    total_inserted: u64,
}

impl<T> FeedBuffer<T> {
    /// Create a new buffer with given capacity
    pub fn new(capacity: usize) -> Result<Self, BufferError> {
        if capacity == 0 {
            return Err(BufferError::ZeroCapacity);
        }
        Ok(Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            total_inserted: 0,
        })
    }

    /// Create a buffer with default capacity (50 entries)
    pub fn with_default_capacity() -> Self {
        Self {
            entries: VecDeque::with_capacity(DEFAULT_CAPACITY),
            capacity: DEFAULT_CAPACITY,
            total_inserted: 0,
        }
    }

    /// Prepend an entry, returning the evicted oldest entry if the buffer was full
    pub fn push_front(&mut self, item: T) -> Option<T> {
        self.entries.push_front(item);
        self.total_inserted += 1;

        if self.entries.len() > self.capacity {
            self.entries.pop_back()
        } else {
            None
        }
    }

    /// Get the number of entries currently in the buffer
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if buffer is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get the buffer capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Get total entries ever inserted, including evicted ones
    pub fn total_inserted(&self) -> u64 {
        self.total_inserted
    }
}

impl<T: Clone> FeedBuffer<T> {
    /// Copy the entries out, newest first
    pub fn snapshot(&self) -> Vec<T> {
        self.entries.iter().cloned().collect()
    }
}

impl<T> Default for FeedBuffer<T> {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}
