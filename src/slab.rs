//! Depth-indexed storage pool for suspended machines.
//!
//! A driver owns one [`Slab`] per operation. Its depth always equals the
//! real nesting depth of the data being processed; it is the heap-resident
//! substitute for call-stack recursion. Rows are dropped when popped, but
//! the slot array's capacity is retained, so a driver that is reused across
//! operations (see the drivers' `reset` methods) never reallocates its stack
//! once it has seen its deepest document.

/// A growable stack of machine rows, one per suspended composite ancestor.
#[derive(Debug)]
pub struct Slab<T> {
    rows: Vec<T>,
}

impl<T> Slab<T> {
    /// A slab with room for a typical nesting depth before any growth.
    #[must_use]
    pub fn new() -> Self {
        Slab {
            rows: Vec::with_capacity(8),
        }
    }

    /// A slab pre-sized for documents of known depth.
    #[must_use]
    pub fn with_capacity(depth: usize) -> Self {
        Slab {
            rows: Vec::with_capacity(depth),
        }
    }

    /// Current number of suspended rows.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Suspend a machine at the next depth.
    pub fn push(&mut self, row: T) {
        self.rows.push(row);
    }

    /// Resume the most recently suspended machine. The row's slot storage is
    /// kept for reuse.
    pub fn pop(&mut self) -> Option<T> {
        self.rows.pop()
    }

    /// Drop all rows, retaining capacity. Used when a driver is reset for a
    /// new operation.
    pub fn clear(&mut self) {
        self.rows.clear();
    }
}

impl<T> Default for Slab<T> {
    fn default() -> Self {
        Slab::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_tracks_pushes() {
        let mut slab = Slab::new();
        assert!(slab.is_empty());
        slab.push("outer");
        slab.push("inner");
        assert_eq!(slab.depth(), 2);
        assert_eq!(slab.pop(), Some("inner"));
        assert_eq!(slab.depth(), 1);
    }

    #[test]
    fn clear_retains_capacity() {
        let mut slab = Slab::with_capacity(32);
        for i in 0..20 {
            slab.push(i);
        }
        let cap = slab.rows.capacity();
        slab.clear();
        assert!(slab.is_empty());
        assert_eq!(slab.rows.capacity(), cap);
    }
}
