#![forbid(unsafe_code)]

//! Software scrollback: rows that have scrolled off the visible grid.
//!
//! A capacity-bound ring of evicted rows, stored as owned cell vectors so
//! glyph and attribute data survive intact. Pushed on every upward
//! scroll, read when the user pages back through history, cleared on
//! resize and font change (old rows are meaningless under a new grid
//! shape or cell encoding).

use std::collections::VecDeque;

use pixcon_core::cell::Cell;

/// Ring buffer of previously displayed rows.
#[derive(Debug, Clone)]
pub struct Scrollback {
    lines: VecDeque<Vec<Cell>>,
    capacity: usize,
}

impl Scrollback {
    /// Create a scrollback holding up to `capacity` rows.
    ///
    /// A capacity of `0` disables scrollback entirely.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
        }
    }

    /// Maximum number of stored rows.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current number of stored rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether no rows are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Push an evicted row. The oldest row is dropped at capacity.
    pub fn push_row(&mut self, cells: &[Cell]) {
        if self.capacity == 0 {
            return;
        }
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(cells.to_vec());
    }

    /// Row by age: `0` is the most recently evicted row.
    #[must_use]
    pub fn line(&self, age: usize) -> Option<&[Cell]> {
        let len = self.lines.len();
        if age < len {
            Some(&self.lines[len - 1 - age])
        } else {
            None
        }
    }

    /// Drop all stored rows.
    pub fn clear(&mut self) {
        self.lines.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(tag: u16) -> Vec<Cell> {
        vec![Cell::from_raw(tag); 4]
    }

    #[test]
    fn push_and_read_by_age() {
        let mut sb = Scrollback::new(8);
        sb.push_row(&row(1));
        sb.push_row(&row(2));
        sb.push_row(&row(3));
        assert_eq!(sb.len(), 3);
        assert_eq!(sb.line(0).unwrap()[0].raw(), 3);
        assert_eq!(sb.line(2).unwrap()[0].raw(), 1);
        assert!(sb.line(3).is_none());
    }

    #[test]
    fn capacity_evicts_oldest() {
        let mut sb = Scrollback::new(2);
        sb.push_row(&row(1));
        sb.push_row(&row(2));
        sb.push_row(&row(3));
        assert_eq!(sb.len(), 2);
        assert_eq!(sb.line(1).unwrap()[0].raw(), 2);
        assert_eq!(sb.line(0).unwrap()[0].raw(), 3);
    }

    #[test]
    fn zero_capacity_drops_everything() {
        let mut sb = Scrollback::new(0);
        sb.push_row(&row(1));
        assert!(sb.is_empty());
        assert!(sb.line(0).is_none());
    }

    #[test]
    fn clear_empties() {
        let mut sb = Scrollback::new(4);
        sb.push_row(&row(1));
        sb.clear();
        assert!(sb.is_empty());
    }
}
