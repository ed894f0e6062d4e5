//! Replayable row, column and cell shifts

use gridcalc_core::{
    ColumnFormat, CompositeUndo, Error as CoreError, Rect, RowFormat, Sheet, SheetId, MAX_COLS,
    MAX_ROWS,
};

use gridcalc_formula::ReferenceChange;

use super::ensure_executed;
use crate::error::Result;
use crate::map::Map;

/// One structural operation on one sheet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Edit {
    InsertColumns { at: u32, count: u32 },
    RemoveColumns { at: u32, count: u32 },
    InsertRows { at: u32, count: u32 },
    RemoveRows { at: u32, count: u32 },
    InsertShiftRight(Rect),
    RemoveShiftLeft(Rect),
    InsertShiftDown(Rect),
    RemoveShiftUp(Rect),
}

impl Edit {
    fn inverse(self) -> Edit {
        match self {
            Edit::InsertColumns { at, count } => Edit::RemoveColumns { at, count },
            Edit::RemoveColumns { at, count } => Edit::InsertColumns { at, count },
            Edit::InsertRows { at, count } => Edit::RemoveRows { at, count },
            Edit::RemoveRows { at, count } => Edit::InsertRows { at, count },
            Edit::InsertShiftRight(rect) => Edit::RemoveShiftLeft(rect),
            Edit::RemoveShiftLeft(rect) => Edit::InsertShiftRight(rect),
            Edit::InsertShiftDown(rect) => Edit::RemoveShiftUp(rect),
            Edit::RemoveShiftUp(rect) => Edit::InsertShiftDown(rect),
        }
    }

    /// How references into the sheet move; cell shifts keep references
    fn reference_change(self) -> Option<ReferenceChange> {
        match self {
            Edit::InsertColumns { at, count } => Some(ReferenceChange::InsertColumns { at, count }),
            Edit::RemoveColumns { at, count } => Some(ReferenceChange::RemoveColumns { at, count }),
            Edit::InsertRows { at, count } => Some(ReferenceChange::InsertRows { at, count }),
            Edit::RemoveRows { at, count } => Some(ReferenceChange::RemoveRows { at, count }),
            _ => None,
        }
    }

    /// Cells whose appearance may change: from the edit line to the sheet end
    fn damaged(self) -> Rect {
        match self {
            Edit::InsertColumns { at, .. } | Edit::RemoveColumns { at, .. } => {
                Rect::new(at, 1, MAX_COLS, MAX_ROWS)
            }
            Edit::InsertRows { at, .. } | Edit::RemoveRows { at, .. } => {
                Rect::new(1, at, MAX_COLS, MAX_ROWS)
            }
            Edit::InsertShiftRight(rect) | Edit::RemoveShiftLeft(rect) => {
                Rect::new(rect.left, rect.top, MAX_COLS, rect.bottom)
            }
            Edit::InsertShiftDown(rect) | Edit::RemoveShiftUp(rect) => {
                Rect::new(rect.left, rect.top, rect.right, MAX_ROWS)
            }
        }
    }

    /// Apply to the format tables and the cell storage
    fn apply(self, sheet: &mut Sheet) -> DroppedFormats {
        let dropped = match self {
            Edit::InsertColumns { at, count } => {
                DroppedFormats::Columns(sheet.insert_columns(at, count))
            }
            Edit::RemoveColumns { at, count } => {
                DroppedFormats::Columns(sheet.remove_columns(at, count))
            }
            Edit::InsertRows { at, count } => DroppedFormats::Rows(sheet.insert_rows(at, count)),
            Edit::RemoveRows { at, count } => DroppedFormats::Rows(sheet.remove_rows(at, count)),
            _ => DroppedFormats::None,
        };

        let storage = sheet.storage_mut();
        match self {
            Edit::InsertColumns { at, count } => storage.insert_columns(at, count),
            Edit::RemoveColumns { at, count } => storage.remove_columns(at, count),
            Edit::InsertRows { at, count } => storage.insert_rows(at, count),
            Edit::RemoveRows { at, count } => storage.remove_rows(at, count),
            Edit::InsertShiftRight(rect) => storage.insert_shift_right(rect),
            Edit::RemoveShiftLeft(rect) => storage.remove_shift_left(rect),
            Edit::InsertShiftDown(rect) => storage.insert_shift_down(rect),
            Edit::RemoveShiftUp(rect) => storage.remove_shift_up(rect),
        }
        dropped
    }
}

/// Formats removed from a sheet's format tables, at their old indices
#[derive(Debug, Clone)]
enum DroppedFormats {
    None,
    Columns(Vec<(u32, ColumnFormat)>),
    Rows(Vec<(u32, RowFormat)>),
}

impl DroppedFormats {
    fn restore(&self, sheet: &mut Sheet) {
        match self {
            DroppedFormats::None => {}
            DroppedFormats::Columns(formats) => {
                for (index, format) in formats {
                    sheet.set_column_format(*index, format.clone());
                }
            }
            DroppedFormats::Rows(formats) => {
                for (index, format) in formats {
                    sheet.set_row_format(*index, format.clone());
                }
            }
        }
    }
}

/// An edit as it was first applied
struct Applied {
    sheet: SheetId,
    edit: Edit,
    /// Pre-images recorded on every sheet, since formulas anywhere may be rewritten
    undos: Vec<(SheetId, CompositeUndo)>,
    dropped: DroppedFormats,
}

/// A batch of structural edits that can be undone and redone
///
/// The first run records the pre-images of every cell attribute the edits
/// destroy or rewrite. Undo applies the inverse edit and writes the
/// pre-images back; redo applies the edit again without recording.
#[derive(Default)]
pub(super) struct StructuralEdits {
    applied: Vec<Applied>,
    executed: bool,
}

impl StructuralEdits {
    /// Apply `edits` on the first run, replay the recorded edits afterwards
    pub(super) fn execute(
        &mut self,
        map: &mut Map,
        text: &str,
        edits: Vec<(SheetId, Edit)>,
    ) -> Result<()> {
        if self.executed {
            for applied in &self.applied {
                apply(map, applied.sheet, applied.edit)?;
            }
        } else {
            for (id, _) in &edits {
                map.require_sheet_mut(*id)?;
            }
            let ids: Vec<SheetId> = map.sheets().iter().map(Sheet::id).collect();
            if map.sheets().iter().any(|sheet| sheet.storage().is_recording()) {
                return Err(CoreError::UndoRecordingActive.into());
            }
            for (id, edit) in edits {
                for &sheet in &ids {
                    map.require_sheet_mut(sheet)?
                        .storage_mut()
                        .start_undo_recording()?;
                }
                let dropped = apply(map, id, edit)?;
                let mut undos = Vec::with_capacity(ids.len());
                for &sheet in &ids {
                    let mut undo = CompositeUndo::new();
                    map.require_sheet_mut(sheet)?
                        .storage_mut()
                        .stop_undo_recording(&mut undo);
                    if !undo.is_empty() {
                        undos.push((sheet, undo));
                    }
                }
                tracing::trace!("{}: {:?} recorded on {} sheets", id, edit, undos.len());
                self.applied.push(Applied {
                    sheet: id,
                    edit,
                    undos,
                    dropped,
                });
            }
            self.executed = true;
        }
        tracing::debug!("{} on {} ranges", text, self.applied.len());
        map.structure_changed(&self.damaged());
        Ok(())
    }

    pub(super) fn undo(&mut self, map: &mut Map, text: &str) -> Result<()> {
        ensure_executed(self.executed, text)?;
        for applied in self.applied.iter().rev() {
            applied
                .edit
                .inverse()
                .apply(map.require_sheet_mut(applied.sheet)?);
            for (sheet, undo) in &applied.undos {
                map.require_sheet_mut(*sheet)?.storage_mut().undo(undo);
            }
            applied
                .dropped
                .restore(map.require_sheet_mut(applied.sheet)?);
        }
        tracing::debug!("undid {}", text);
        map.structure_changed(&self.damaged());
        Ok(())
    }

    fn damaged(&self) -> Vec<(SheetId, Rect)> {
        self.applied
            .iter()
            .map(|applied| (applied.sheet, applied.edit.damaged()))
            .collect()
    }
}

/// Rewrite references to the moved rows or columns, then apply the edit
fn apply(map: &mut Map, sheet: SheetId, edit: Edit) -> Result<DroppedFormats> {
    map.require_sheet_mut(sheet)?;
    if let Some(change) = edit.reference_change() {
        map.adjust_references(sheet, change);
    }
    Ok(edit.apply(map.require_sheet_mut(sheet)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridcalc_core::Value;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_inverse_round_trip() {
        let mut sheet = Sheet::new(SheetId(1), "Sheet1");
        sheet.storage_mut().set_value(2, 5, Value::from(1));
        sheet.set_row_hidden(6, true);

        let edit = Edit::RemoveRows { at: 5, count: 2 };
        sheet.storage_mut().start_undo_recording().unwrap();
        let dropped = edit.apply(&mut sheet);
        let mut undo = CompositeUndo::new();
        sheet.storage_mut().stop_undo_recording(&mut undo);
        assert_eq!(sheet.storage().value(2, 5), Value::Empty);

        edit.inverse().apply(&mut sheet);
        sheet.storage_mut().undo(&undo);
        dropped.restore(&mut sheet);
        assert_eq!(sheet.storage().value(2, 5), Value::from(1));
        assert!(sheet.is_row_hidden(6));
    }

    #[test]
    fn test_damage_reaches_the_sheet_end() {
        let rect = Rect::new(2, 3, 4, 5);
        assert_eq!(
            Edit::InsertShiftDown(rect).damaged(),
            Rect::new(2, 3, 4, MAX_ROWS)
        );
        assert_eq!(
            Edit::RemoveShiftLeft(rect).damaged(),
            Rect::new(2, 3, MAX_COLS, 5)
        );
        assert_eq!(
            Edit::InsertColumns { at: 7, count: 1 }.damaged(),
            Rect::new(7, 1, MAX_COLS, MAX_ROWS)
        );
    }
}
