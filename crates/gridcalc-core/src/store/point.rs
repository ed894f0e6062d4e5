//! Sparse position-keyed storage
//!
//! Only occupied positions are stored, using a row-based BTreeMap structure.

use std::collections::BTreeMap;

use crate::position::{Position, Rect};
use crate::{MAX_COLS, MAX_ROWS};

/// Sparse row-major storage mapping a position to a value
///
/// Structure: `BTreeMap<row, BTreeMap<col, T>>`. Bulk loading and the common
/// iteration patterns (recalculation, rendering) are row-wise, so rows are the
/// outer key; column-wise queries walk the row index.
///
/// Structural operations return the entries they overwrote or dropped, keyed by
/// their position before the operation, so callers can record them for undo.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionKeyedStore<T> {
    rows: BTreeMap<u32, BTreeMap<u32, T>>,
}

impl<T> Default for PositionKeyedStore<T> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
        }
    }
}

impl<T> PositionKeyedStore<T> {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    // === Point access ===

    /// Data at a position
    pub fn get(&self, pos: Position) -> Option<&T> {
        self.rows.get(&pos.row).and_then(|r| r.get(&pos.col))
    }

    /// Mutable data at a position
    pub fn get_mut(&mut self, pos: Position) -> Option<&mut T> {
        self.rows.get_mut(&pos.row).and_then(|r| r.get_mut(&pos.col))
    }

    /// Whether a position holds data
    pub fn contains(&self, pos: Position) -> bool {
        self.get(pos).is_some()
    }

    /// Store a value, returning the previous one
    pub fn set(&mut self, pos: Position, value: T) -> Option<T> {
        self.rows.entry(pos.row).or_default().insert(pos.col, value)
    }

    /// Remove and return the value at a position
    pub fn take(&mut self, pos: Position) -> Option<T> {
        let row_map = self.rows.get_mut(&pos.row)?;
        let result = row_map.remove(&pos.col);
        if row_map.is_empty() {
            self.rows.remove(&pos.row);
        }
        result
    }

    /// Remove everything
    pub fn clear(&mut self) {
        self.rows.clear();
    }

    /// Number of occupied positions
    pub fn count(&self) -> usize {
        self.rows.values().map(BTreeMap::len).sum()
    }

    /// Whether no position is occupied
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Iterate over all entries in row-major order
    pub fn iter(&self) -> impl Iterator<Item = (Position, &T)> {
        self.rows.iter().flat_map(|(&row, cols)| {
            cols.iter()
                .map(move |(&col, value)| (Position::new(col, row), value))
        })
    }

    /// Iterate over the entries of one row
    pub fn iter_row(&self, row: u32) -> impl Iterator<Item = (u32, &T)> {
        self.rows
            .get(&row)
            .into_iter()
            .flat_map(|cols| cols.iter().map(|(&col, value)| (col, value)))
    }

    /// Entries inside a rectangle, row-major
    pub fn entries_in(&self, rect: &Rect) -> impl Iterator<Item = (Position, &T)> {
        let (left, right) = (rect.left, rect.right);
        self.rows
            .range(rect.top..=rect.bottom)
            .flat_map(move |(&row, cols)| {
                cols.range(left..=right)
                    .map(move |(&col, value)| (Position::new(col, row), value))
            })
    }

    // === Navigation ===

    /// First occupied column in a row
    pub fn first_in_row(&self, row: u32) -> Option<Position> {
        let col = *self.rows.get(&row)?.keys().next()?;
        Some(Position::new(col, row))
    }

    /// Last occupied column in a row
    pub fn last_in_row(&self, row: u32) -> Option<Position> {
        let col = *self.rows.get(&row)?.keys().next_back()?;
        Some(Position::new(col, row))
    }

    /// Next occupied column to the right of `col` in the same row
    pub fn next_in_row(&self, col: u32, row: u32) -> Option<Position> {
        let (&next, _) = self
            .rows
            .get(&row)?
            .range(col.saturating_add(1)..)
            .next()?;
        Some(Position::new(next, row))
    }

    /// Previous occupied column to the left of `col` in the same row
    pub fn prev_in_row(&self, col: u32, row: u32) -> Option<Position> {
        let (&prev, _) = self.rows.get(&row)?.range(..col).next_back()?;
        Some(Position::new(prev, row))
    }

    /// First occupied row in a column
    pub fn first_in_column(&self, col: u32) -> Option<Position> {
        self.rows
            .iter()
            .find(|(_, cols)| cols.contains_key(&col))
            .map(|(&row, _)| Position::new(col, row))
    }

    /// Last occupied row in a column
    pub fn last_in_column(&self, col: u32) -> Option<Position> {
        self.rows
            .iter()
            .rev()
            .find(|(_, cols)| cols.contains_key(&col))
            .map(|(&row, _)| Position::new(col, row))
    }

    /// Next occupied row below `row` in the same column
    pub fn next_in_column(&self, col: u32, row: u32) -> Option<Position> {
        self.rows
            .range(row.saturating_add(1)..)
            .find(|(_, cols)| cols.contains_key(&col))
            .map(|(&r, _)| Position::new(col, r))
    }

    /// Previous occupied row above `row` in the same column
    pub fn prev_in_column(&self, col: u32, row: u32) -> Option<Position> {
        self.rows
            .range(..row)
            .rev()
            .find(|(_, cols)| cols.contains_key(&col))
            .map(|(&r, _)| Position::new(col, r))
    }

    // === Extent ===

    /// Highest occupied row (0 if empty)
    pub fn rows(&self) -> u32 {
        self.rows.keys().next_back().copied().unwrap_or(0)
    }

    /// Highest occupied column (0 if empty)
    pub fn columns(&self) -> u32 {
        self.rows
            .values()
            .filter_map(|cols| cols.keys().next_back().copied())
            .max()
            .unwrap_or(0)
    }

    /// Bounding rectangle of all entries
    pub fn used_area(&self) -> Option<Rect> {
        let top = *self.rows.keys().next()?;
        let bottom = *self.rows.keys().next_back()?;
        let left = self
            .rows
            .values()
            .filter_map(|cols| cols.keys().next().copied())
            .min()?;
        Some(Rect::new(left, top, self.columns(), bottom))
    }

    // === Structural operations ===

    /// Shift every entry at or below `at` down by `count` rows
    ///
    /// Returns the entries pushed beyond the last row.
    pub fn insert_rows(&mut self, at: u32, count: u32) -> Vec<(Position, T)> {
        let mut dropped = Vec::new();
        if count == 0 {
            return dropped;
        }
        let tail = self.rows.split_off(&at);
        for (row, cols) in tail {
            let target = row as u64 + count as u64;
            if target > MAX_ROWS as u64 {
                dropped.extend(cols.into_iter().map(|(col, v)| (Position::new(col, row), v)));
            } else {
                self.rows.insert(target as u32, cols);
            }
        }
        dropped
    }

    /// Drop the rows `[at, at + count)` and shift the rows below up
    ///
    /// Returns the dropped entries.
    pub fn remove_rows(&mut self, at: u32, count: u32) -> Vec<(Position, T)> {
        let mut removed = Vec::new();
        if count == 0 {
            return removed;
        }
        let mut tail = self.rows.split_off(&at);
        let below = tail.split_off(&at.saturating_add(count));
        for (row, cols) in tail {
            removed.extend(cols.into_iter().map(|(col, v)| (Position::new(col, row), v)));
        }
        for (row, cols) in below {
            self.rows.insert(row - count, cols);
        }
        removed
    }

    /// Shift every entry at or right of `at` by `count` columns
    ///
    /// Returns the entries pushed beyond the last column.
    pub fn insert_columns(&mut self, at: u32, count: u32) -> Vec<(Position, T)> {
        self.shift_columns_right(at, count, 1, MAX_ROWS)
    }

    /// Drop the columns `[at, at + count)` and shift the columns to the right left
    ///
    /// Returns the dropped entries.
    pub fn remove_columns(&mut self, at: u32, count: u32) -> Vec<(Position, T)> {
        self.shift_columns_left(at, count, 1, MAX_ROWS)
    }

    /// Move the cells at or right of `rect.left` within `rect`'s rows right by its width
    pub fn insert_shift_right(&mut self, rect: &Rect) -> Vec<(Position, T)> {
        self.shift_columns_right(rect.left, rect.width(), rect.top, rect.bottom)
    }

    /// Drop the cells in `rect` and move the cells right of it left by its width
    pub fn remove_shift_left(&mut self, rect: &Rect) -> Vec<(Position, T)> {
        self.shift_columns_left(rect.left, rect.width(), rect.top, rect.bottom)
    }

    /// Move the cells at or below `rect.top` within `rect`'s columns down by its height
    pub fn insert_shift_down(&mut self, rect: &Rect) -> Vec<(Position, T)> {
        let count = rect.height();
        let mut moved = Vec::new();
        let mut dropped = Vec::new();
        for (&row, cols) in self.rows.range_mut(rect.top..) {
            let keys: Vec<u32> = cols.range(rect.left..=rect.right).map(|(&c, _)| c).collect();
            for col in keys {
                if let Some(value) = cols.remove(&col) {
                    moved.push((Position::new(col, row), value));
                }
            }
        }
        self.prune_empty_rows();
        for (pos, value) in moved {
            let target = pos.row as u64 + count as u64;
            if target > MAX_ROWS as u64 {
                dropped.push((pos, value));
            } else {
                self.set(Position::new(pos.col, target as u32), value);
            }
        }
        dropped
    }

    /// Drop the cells in `rect` and move the cells below it up by its height
    pub fn remove_shift_up(&mut self, rect: &Rect) -> Vec<(Position, T)> {
        let count = rect.height();
        let mut moved = Vec::new();
        let mut removed = Vec::new();
        for (&row, cols) in self.rows.range_mut(rect.top..) {
            let keys: Vec<u32> = cols.range(rect.left..=rect.right).map(|(&c, _)| c).collect();
            for col in keys {
                if let Some(value) = cols.remove(&col) {
                    let pos = Position::new(col, row);
                    if row <= rect.bottom {
                        removed.push((pos, value));
                    } else {
                        moved.push((pos, value));
                    }
                }
            }
        }
        self.prune_empty_rows();
        for (pos, value) in moved {
            self.set(Position::new(pos.col, pos.row - count), value);
        }
        removed
    }

    fn shift_columns_right(
        &mut self,
        at: u32,
        count: u32,
        top: u32,
        bottom: u32,
    ) -> Vec<(Position, T)> {
        let mut dropped = Vec::new();
        if count == 0 {
            return dropped;
        }
        for (&row, cols) in self.rows.range_mut(top..=bottom) {
            let tail = cols.split_off(&at);
            for (col, value) in tail {
                let target = col as u64 + count as u64;
                if target > MAX_COLS as u64 {
                    dropped.push((Position::new(col, row), value));
                } else {
                    cols.insert(target as u32, value);
                }
            }
        }
        self.prune_empty_rows();
        dropped
    }

    fn shift_columns_left(
        &mut self,
        at: u32,
        count: u32,
        top: u32,
        bottom: u32,
    ) -> Vec<(Position, T)> {
        let mut removed = Vec::new();
        if count == 0 {
            return removed;
        }
        for (&row, cols) in self.rows.range_mut(top..=bottom) {
            let mut tail = cols.split_off(&at);
            let right = tail.split_off(&at.saturating_add(count));
            removed.extend(tail.into_iter().map(|(col, v)| (Position::new(col, row), v)));
            for (col, value) in right {
                cols.insert(col - count, value);
            }
        }
        self.prune_empty_rows();
        removed
    }

    fn prune_empty_rows(&mut self) {
        self.rows.retain(|_, cols| !cols.is_empty());
    }
}

impl<T: Clone> PositionKeyedStore<T> {
    /// Copy of the entries inside `rect`, renumbered so that `rect`'s top-left is (1, 1)
    pub fn sub_store(&self, rect: &Rect) -> Self {
        let mut sub = Self::new();
        for (pos, value) in self.entries_in(rect) {
            sub.set(
                Position::new(pos.col - rect.left + 1, pos.row - rect.top + 1),
                value.clone(),
            );
        }
        sub
    }
}

impl<T> FromIterator<(Position, T)> for PositionKeyedStore<T> {
    fn from_iter<I: IntoIterator<Item = (Position, T)>>(iter: I) -> Self {
        let mut store = Self::new();
        for (pos, value) in iter {
            store.set(pos, value);
        }
        store
    }
}
