//! Fixed-capacity ring buffer holding the admitted values.

use serde::{Deserialize, Serialize};

/// Ring buffer over a preallocated array.
///
/// `head` is the slot of the oldest value once the buffer is full; while the
/// buffer is still growing values are simply appended.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct RingWindow {
    buf: Vec<f64>,
    capacity: usize,
    head: usize,
}

impl RingWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
            capacity,
            head: 0,
        }
    }

    /// Push a value, returning the evicted one when the window was full
    pub fn push(&mut self, value: f64) -> Option<f64> {
        if self.buf.len() < self.capacity {
            self.buf.push(value);
            return None;
        }

        let evicted = std::mem::replace(&mut self.buf[self.head], value);
        self.head = (self.head + 1) % self.capacity;
        Some(evicted)
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.buf.len() == self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Values from oldest to newest
    pub fn iter(&self) -> impl Iterator<Item = f64> + Clone + '_ {
        let (newer, older) = self.buf.split_at(self.head);
        older.iter().chain(newer.iter()).copied()
    }

    /// Most recently admitted value
    pub fn last(&self) -> Option<f64> {
        if self.buf.is_empty() {
            return None;
        }
        let idx = (self.head + self.buf.len() - 1) % self.buf.len();
        Some(self.buf[idx])
    }

    pub fn to_vec(&self) -> Vec<f64> {
        self.iter().collect()
    }

    pub fn clear(&mut self) {
        self.buf.clear();
        self.head = 0;
    }
}
