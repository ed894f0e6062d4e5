//! Rectangle-keyed storage
//!
//! Region-scoped attributes (comments, validities, merges, ...) are stored as
//! an ordered list of `(Rect, T)` pairs. On lookup the last inserted pair that
//! covers a position wins.

use crate::position::{Position, Rect};
use crate::{MAX_COLS, MAX_ROWS};

/// Undo information for one rectangle: clear `rect`, then re-insert `pairs`
#[derive(Debug, Clone, PartialEq)]
pub struct RectUndo<T> {
    pub rect: Rect,
    pub pairs: Vec<(Rect, T)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Columns,
    Rows,
}

/// Ordered list of rectangle/value pairs, last inserted wins
#[derive(Debug, Clone, PartialEq)]
pub struct RectStorage<T> {
    pairs: Vec<(Rect, T)>,
    /// Pairs are whole units (merges, locks) and are never clipped in undo data
    atomic: bool,
}

impl<T> Default for RectStorage<T> {
    fn default() -> Self {
        Self {
            pairs: Vec::new(),
            atomic: false,
        }
    }
}

impl<T> RectStorage<T> {
    /// Create an empty storage
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty storage whose pairs are restored whole by undo
    pub fn atomic() -> Self {
        Self {
            pairs: Vec::new(),
            atomic: true,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn clear(&mut self) {
        self.pairs.clear();
    }

    /// All pairs in insertion order
    pub fn pairs(&self) -> &[(Rect, T)] {
        &self.pairs
    }

    // === Lookup ===

    /// Value of the last pair covering a position
    pub fn get(&self, pos: Position) -> Option<&T> {
        self.contains_pair(pos).map(|(_, value)| value)
    }

    /// Last pair covering a position
    pub fn contains_pair(&self, pos: Position) -> Option<(Rect, &T)> {
        self.pairs
            .iter()
            .rev()
            .find(|(rect, _)| rect.contains(pos))
            .map(|(rect, value)| (*rect, value))
    }

    /// Every value covering a position, in insertion order
    pub fn values_at(&self, pos: Position) -> impl Iterator<Item = &T> {
        self.pairs
            .iter()
            .filter(move |(rect, _)| rect.contains(pos))
            .map(|(_, value)| value)
    }

    /// Pairs intersecting a rectangle (unclipped), in insertion order
    pub fn intersecting_pairs(&self, rect: &Rect) -> Vec<(Rect, &T)> {
        self.pairs
            .iter()
            .filter(|(r, _)| r.intersects(rect))
            .map(|(r, value)| (*r, value))
            .collect()
    }

    // === Mutation ===

    /// Append a pair; it takes precedence over every earlier pair it covers
    pub fn insert(&mut self, rect: Rect, value: T) {
        if rect.is_valid() {
            self.pairs.push((rect, value));
        }
    }

    // === Extent ===

    /// Highest covered row (0 if empty)
    pub fn rows(&self) -> u32 {
        self.pairs.iter().map(|(r, _)| r.bottom).max().unwrap_or(0)
    }

    /// Highest covered column (0 if empty)
    pub fn columns(&self) -> u32 {
        self.pairs.iter().map(|(r, _)| r.right).max().unwrap_or(0)
    }

    /// Bounding rectangle of every pair
    pub fn used_area(&self) -> Option<Rect> {
        self.pairs
            .iter()
            .map(|(r, _)| *r)
            .reduce(|acc, r| acc.united(&r))
    }

    // === Navigation ===

    /// First covered column in a row
    pub fn first_in_row(&self, row: u32) -> Option<Position> {
        self.pairs
            .iter()
            .filter(|(r, _)| r.top <= row && row <= r.bottom)
            .map(|(r, _)| r.left)
            .min()
            .map(|col| Position::new(col, row))
    }

    /// Next covered column right of `col`
    pub fn next_in_row(&self, col: u32, row: u32) -> Option<Position> {
        self.pairs
            .iter()
            .filter(|(r, _)| r.top <= row && row <= r.bottom && r.right > col)
            .map(|(r, _)| r.left.max(col + 1))
            .min()
            .map(|c| Position::new(c, row))
    }

    /// Last covered column in a row
    pub fn last_in_row(&self, row: u32) -> Option<Position> {
        self.pairs
            .iter()
            .filter(|(r, _)| r.top <= row && row <= r.bottom)
            .map(|(r, _)| r.right)
            .max()
            .map(|col| Position::new(col, row))
    }

    /// Previous covered column left of `col`
    pub fn prev_in_row(&self, col: u32, row: u32) -> Option<Position> {
        self.pairs
            .iter()
            .filter(|(r, _)| r.top <= row && row <= r.bottom && r.left < col)
            .map(|(r, _)| r.right.min(col - 1))
            .max()
            .map(|c| Position::new(c, row))
    }

    /// First covered row in a column
    pub fn first_in_column(&self, col: u32) -> Option<Position> {
        self.pairs
            .iter()
            .filter(|(r, _)| r.left <= col && col <= r.right)
            .map(|(r, _)| r.top)
            .min()
            .map(|row| Position::new(col, row))
    }

    /// Next covered row below `row`
    pub fn next_in_column(&self, col: u32, row: u32) -> Option<Position> {
        self.pairs
            .iter()
            .filter(|(r, _)| r.left <= col && col <= r.right && r.bottom > row)
            .map(|(r, _)| r.top.max(row + 1))
            .min()
            .map(|rw| Position::new(col, rw))
    }

    /// Last covered row in a column
    pub fn last_in_column(&self, col: u32) -> Option<Position> {
        self.pairs
            .iter()
            .filter(|(r, _)| r.left <= col && col <= r.right)
            .map(|(r, _)| r.bottom)
            .max()
            .map(|row| Position::new(col, row))
    }

    /// Previous covered row above `row`
    pub fn prev_in_column(&self, col: u32, row: u32) -> Option<Position> {
        self.pairs
            .iter()
            .filter(|(r, _)| r.left <= col && col <= r.right && r.top < row)
            .map(|(r, _)| r.bottom.min(row - 1))
            .max()
            .map(|rw| Position::new(col, rw))
    }
}

impl<T: Clone + PartialEq> RectStorage<T> {
    /// Remove all coverage of `rect`, splitting pairs that straddle its border
    pub fn remove(&mut self, rect: &Rect) {
        if !self.pairs.iter().any(|(r, _)| r.intersects(rect)) {
            return;
        }
        let pairs = std::mem::take(&mut self.pairs);
        for (r, value) in pairs {
            if !r.intersects(rect) {
                self.pairs.push((r, value));
                continue;
            }
            for piece in r.subtract(rect) {
                self.pairs.push((piece, value.clone()));
            }
        }
    }

    /// Snapshot of the coverage of `rect`, suitable for restoring it later
    ///
    /// Pairs are clipped to `rect` unless the storage is atomic.
    pub fn undo_data(&self, rect: &Rect) -> RectUndo<T> {
        let pairs = self
            .pairs
            .iter()
            .filter_map(|(r, value)| {
                if self.atomic {
                    r.intersects(rect).then(|| (*r, value.clone()))
                } else {
                    r.intersected(rect).map(|clip| (clip, value.clone()))
                }
            })
            .collect();
        RectUndo { rect: *rect, pairs }
    }

    /// Restore a snapshot, returning the snapshot of the state it replaced
    pub fn restore(&mut self, undo: &RectUndo<T>) -> RectUndo<T> {
        let previous = self.undo_data(&undo.rect);
        self.remove(&undo.rect);
        for (rect, value) in &undo.pairs {
            self.insert(*rect, value.clone());
        }
        self.compact();
        previous
    }

    /// Drop pairs that are fully covered by a later pair with the same value
    pub fn compact(&mut self) {
        let mut i = 0;
        while i < self.pairs.len() {
            let (rect, value) = &self.pairs[i];
            let shadowed = self.pairs[i + 1..]
                .iter()
                .any(|(r, v)| v == value && r.contains_rect(rect));
            if shadowed {
                self.pairs.remove(i);
            } else {
                i += 1;
            }
        }
    }

    /// Copy of the pairs inside `rect`, clipped and renumbered so that `rect`'s top-left is (1, 1)
    pub fn sub_storage(&self, rect: &Rect) -> Self {
        let dcol = 1 - rect.left as i64;
        let drow = 1 - rect.top as i64;
        let pairs = self
            .pairs
            .iter()
            .filter_map(|(r, value)| {
                let clip = r.intersected(rect)?.translated(dcol, drow)?;
                Some((clip, value.clone()))
            })
            .collect();
        Self {
            pairs,
            atomic: self.atomic,
        }
    }

    // === Structural operations ===

    /// Insert `count` rows at `at`; pairs spanning the insertion line grow
    ///
    /// Returns the pairs pushed beyond the last row.
    pub fn insert_rows(&mut self, at: u32, count: u32) -> Vec<(Rect, T)> {
        self.shift(Axis::Rows, at, count, true, (1, MAX_COLS))
    }

    /// Remove `count` rows at `at`; pairs inside the band disappear, spanning pairs shrink
    ///
    /// Returns the pairs that disappeared.
    pub fn remove_rows(&mut self, at: u32, count: u32) -> Vec<(Rect, T)> {
        self.shift(Axis::Rows, at, count, false, (1, MAX_COLS))
    }

    pub fn insert_columns(&mut self, at: u32, count: u32) -> Vec<(Rect, T)> {
        self.shift(Axis::Columns, at, count, true, (1, MAX_ROWS))
    }

    pub fn remove_columns(&mut self, at: u32, count: u32) -> Vec<(Rect, T)> {
        self.shift(Axis::Columns, at, count, false, (1, MAX_ROWS))
    }

    pub fn insert_shift_right(&mut self, rect: &Rect) -> Vec<(Rect, T)> {
        self.shift(Axis::Columns, rect.left, rect.width(), true, (rect.top, rect.bottom))
    }

    pub fn remove_shift_left(&mut self, rect: &Rect) -> Vec<(Rect, T)> {
        self.shift(Axis::Columns, rect.left, rect.width(), false, (rect.top, rect.bottom))
    }

    pub fn insert_shift_down(&mut self, rect: &Rect) -> Vec<(Rect, T)> {
        self.shift(Axis::Rows, rect.top, rect.height(), true, (rect.left, rect.right))
    }

    pub fn remove_shift_up(&mut self, rect: &Rect) -> Vec<(Rect, T)> {
        self.shift(Axis::Rows, rect.top, rect.height(), false, (rect.left, rect.right))
    }

    /// Move the part of every pair that lies inside the orthogonal `span`
    fn shift(
        &mut self,
        axis: Axis,
        at: u32,
        count: u32,
        insert: bool,
        span: (u32, u32),
    ) -> Vec<(Rect, T)> {
        let mut lost = Vec::new();
        if count == 0 {
            return lost;
        }

        let zone = match axis {
            Axis::Columns => Rect::new(at, span.0, MAX_COLS, span.1),
            Axis::Rows => Rect::new(span.0, at, span.1, MAX_ROWS),
        };

        let pairs = std::mem::take(&mut self.pairs);
        for (rect, value) in pairs {
            if !rect.intersects(&zone) {
                self.pairs.push((rect, value));
                continue;
            }

            // Parts outside the orthogonal span stay where they are.
            let inside = match axis {
                Axis::Columns => Rect::new(rect.left, rect.top.max(span.0), rect.right, rect.bottom.min(span.1)),
                Axis::Rows => Rect::new(rect.left.max(span.0), rect.top, rect.right.min(span.1), rect.bottom),
            };
            for piece in rect.subtract(&inside) {
                self.pairs.push((piece, value.clone()));
            }

            match shift_rect(&inside, axis, at, count, insert) {
                Some(moved) => self.pairs.push((moved, value)),
                None => lost.push((inside, value)),
            }
        }
        lost
    }
}

/// New extent of a rectangle after inserting or removing a band; `None` if it vanishes
fn shift_rect(rect: &Rect, axis: Axis, at: u32, count: u32, insert: bool) -> Option<Rect> {
    let (lo, hi, max) = match axis {
        Axis::Columns => (rect.left, rect.right, MAX_COLS),
        Axis::Rows => (rect.top, rect.bottom, MAX_ROWS),
    };

    let (new_lo, new_hi) = if insert {
        if lo >= at {
            let new_lo = lo as u64 + count as u64;
            if new_lo > max as u64 {
                return None;
            }
            (new_lo as u32, (hi as u64 + count as u64).min(max as u64) as u32)
        } else if hi >= at {
            (lo, (hi as u64 + count as u64).min(max as u64) as u32)
        } else {
            (lo, hi)
        }
    } else {
        let end = at.saturating_add(count - 1);
        if hi < at {
            (lo, hi)
        } else if lo > end {
            (lo - count, hi - count)
        } else {
            let overlap = hi.min(end) - lo.max(at) + 1;
            let remaining = (hi - lo + 1) - overlap;
            if remaining == 0 {
                return None;
            }
            let new_lo = lo.min(at);
            (new_lo, new_lo + remaining - 1)
        }
    };

    Some(match axis {
        Axis::Columns => Rect::new(new_lo, rect.top, new_hi, rect.bottom),
        Axis::Rows => Rect::new(rect.left, new_lo, rect.right, new_hi),
    })
}
