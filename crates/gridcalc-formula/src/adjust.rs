//! Reference adjustment after columns or rows are inserted or removed
//!
//! References into the changed sheet move with the cells they point at.
//! A reference whose cells were all removed becomes `#REF!`; a range that
//! only partly overlaps a removed band shrinks.

use crate::ast::Expr;
use gridcalc_core::{ErrorKind, Rect, MAX_COLS, MAX_ROWS};

/// A change to the column or row layout of one sheet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceChange {
    InsertColumns { at: u32, count: u32 },
    RemoveColumns { at: u32, count: u32 },
    InsertRows { at: u32, count: u32 },
    RemoveRows { at: u32, count: u32 },
}

impl ReferenceChange {
    fn is_columns(&self) -> bool {
        matches!(
            self,
            ReferenceChange::InsertColumns { .. } | ReferenceChange::RemoveColumns { .. }
        )
    }

    fn max(&self) -> u32 {
        if self.is_columns() {
            MAX_COLS
        } else {
            MAX_ROWS
        }
    }

    /// The columns or rows removed by this change
    pub fn removed_band(&self) -> Option<(u32, u32)> {
        match *self {
            ReferenceChange::RemoveColumns { at, count }
            | ReferenceChange::RemoveRows { at, count } => {
                Some((at, at.saturating_add(count).saturating_sub(1)))
            }
            _ => None,
        }
    }

    /// Whether a cell lies in a removed column or row
    pub fn removes(&self, col: u32, row: u32) -> bool {
        let index = if self.is_columns() { col } else { row };
        self.removed_band()
            .is_some_and(|(first, last)| (first..=last).contains(&index))
    }

    /// New index of one column or row; `None` if it no longer exists
    fn shift_index(&self, index: u32) -> Option<u32> {
        match *self {
            ReferenceChange::InsertColumns { at, count }
            | ReferenceChange::InsertRows { at, count } => {
                if index < at {
                    return Some(index);
                }
                let moved = index as u64 + count as u64;
                (moved <= self.max() as u64).then_some(moved as u32)
            }
            ReferenceChange::RemoveColumns { at, count }
            | ReferenceChange::RemoveRows { at, count } => {
                if index < at {
                    Some(index)
                } else if (index as u64) < at as u64 + count as u64 {
                    None
                } else {
                    Some(index - count)
                }
            }
        }
    }

    /// New bounds of a span of columns or rows; `None` if nothing is left
    fn shift_span(&self, start: u32, end: u32) -> Option<(u32, u32)> {
        match *self {
            ReferenceChange::InsertColumns { .. } | ReferenceChange::InsertRows { .. } => {
                let start = self.shift_index(start)?;
                let end = self.shift_index(end).unwrap_or(self.max());
                Some((start, end))
            }
            ReferenceChange::RemoveColumns { at, .. } | ReferenceChange::RemoveRows { at, .. } => {
                match (self.shift_index(start), self.shift_index(end)) {
                    (Some(start), Some(end)) => Some((start, end)),
                    // start is in the band, end after it
                    (None, Some(end)) => Some((at, end)),
                    // end is in the band, start before it
                    (Some(start), None) if start < at => Some((start, at - 1)),
                    _ => None,
                }
            }
        }
    }

    fn shift_rect(&self, rect: Rect) -> Option<Rect> {
        if self.is_columns() {
            let (left, right) = self.shift_span(rect.left, rect.right)?;
            Some(Rect::new(left, rect.top, right, rect.bottom))
        } else {
            let (top, bottom) = self.shift_span(rect.top, rect.bottom)?;
            Some(Rect::new(rect.left, top, rect.right, bottom))
        }
    }
}

impl Expr {
    /// Rewrite the references a layout change moved
    ///
    /// `affects` tells whether a sheet qualifier (`None` for the formula's own
    /// sheet) names the changed sheet. Returns whether anything was rewritten.
    pub fn adjust_references(
        &mut self,
        change: ReferenceChange,
        affects: &dyn Fn(Option<&str>) -> bool,
    ) -> bool {
        match self {
            Expr::Cell(cell) if affects(cell.sheet.as_deref()) => {
                let rect = Rect::from_position(cell.pos);
                match change.shift_rect(rect) {
                    Some(moved) if moved == rect => false,
                    Some(moved) => {
                        cell.pos = moved.top_left();
                        true
                    }
                    None => {
                        *self = Expr::Error(ErrorKind::Ref);
                        true
                    }
                }
            }
            Expr::Range(range) if affects(range.sheet.as_deref()) => {
                match change.shift_rect(range.rect) {
                    Some(moved) if moved == range.rect => false,
                    Some(moved) => {
                        range.rect = moved;
                        true
                    }
                    None => {
                        *self = Expr::Error(ErrorKind::Ref);
                        true
                    }
                }
            }
            Expr::Binary { lhs, rhs, .. } => {
                let left = lhs.adjust_references(change, affects);
                rhs.adjust_references(change, affects) | left
            }
            Expr::Unary { operand, .. } => operand.adjust_references(change, affects),
            Expr::Call { args, .. } => args.iter_mut().fold(false, |changed, arg| {
                arg.adjust_references(change, affects) | changed
            }),
            Expr::Array(rows) => rows.iter_mut().flatten().fold(false, |changed, item| {
                item.adjust_references(change, affects) | changed
            }),
            _ => false,
        }
    }
}
