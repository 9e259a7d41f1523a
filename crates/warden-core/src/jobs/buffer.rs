//! Bounded log buffer for job output
//!
//! Child processes can produce unbounded output; each job keeps only the most
//! recent lines. This is deliberately lossy: once the buffer is full, every
//! append evicts the oldest line.

use parking_lot::Mutex;
use std::collections::VecDeque;

/// Fixed-capacity FIFO buffer of output lines.
///
/// Append and snapshot are linearizable relative to each other; the lock is
/// per buffer, so unrelated jobs never contend.
#[derive(Debug)]
pub struct LogBuffer {
    lines: Mutex<VecDeque<String>>,
    capacity: usize,
}

impl LogBuffer {
    /// Create a buffer that retains at most `capacity` lines.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "log buffer capacity must be non-zero");
        Self {
            lines: Mutex::new(VecDeque::with_capacity(capacity.min(256))),
            capacity,
        }
    }

    /// Append a line, evicting the oldest line when full.
    pub fn append(&self, line: impl Into<String>) {
        let mut lines = self.lines.lock();
        if lines.len() == self.capacity {
            lines.pop_front();
        }
        lines.push_back(line.into());
    }

    /// Copy of the buffered lines, oldest first.
    pub fn snapshot(&self) -> Vec<String> {
        self.lines.lock().iter().cloned().collect()
    }

    /// Number of lines currently buffered.
    pub fn len(&self) -> usize {
        self.lines.lock().len()
    }

    /// True if no lines are buffered.
    pub fn is_empty(&self) -> bool {
        self.lines.lock().is_empty()
    }

    /// Configured capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_and_snapshot_order() {
        let buffer = LogBuffer::new(10);
        buffer.append("first");
        buffer.append("second");
        buffer.append("third");

        assert_eq!(buffer.snapshot(), vec!["first", "second", "third"]);
        assert_eq!(buffer.len(), 3);
    }

    #[test]
    fn test_eviction_keeps_last_capacity_lines() {
        let cap = 5;
        let buffer = LogBuffer::new(cap);
        for i in 0..12 {
            buffer.append(format!("line {}", i));
        }

        let snapshot = buffer.snapshot();
        assert_eq!(snapshot.len(), cap);
        // Exactly the last `cap` appends, in order
        assert_eq!(
            snapshot,
            (7..12).map(|i| format!("line {}", i)).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_snapshot_is_a_copy() {
        let buffer = LogBuffer::new(4);
        buffer.append("a");
        let snapshot = buffer.snapshot();
        buffer.append("b");

        assert_eq!(snapshot, vec!["a"]);
        assert_eq!(buffer.snapshot(), vec!["a", "b"]);
    }

    #[test]
    #[should_panic]
    fn test_zero_capacity_rejected() {
        let _ = LogBuffer::new(0);
    }
}
