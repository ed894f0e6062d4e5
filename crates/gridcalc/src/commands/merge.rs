//! Merging and dissolving cell spans

use gridcalc_core::{CompositeUndo, DamageKind, Error as CoreError, Rect, Region, SheetId};

use super::{ensure_executed, require_selection, Command};
use crate::error::Result;
use crate::map::Map;

/// Merge every selected rectangle into its top-left cell, or dissolve the
/// merges intersecting the selection
///
/// Cell contents are left as they are; positions covered by a merge keep
/// their values but read through the master.
pub struct MergeCommand {
    region: Region,
    merge: bool,
    /// One recording per edited sheet
    recorded: Vec<(SheetId, CompositeUndo)>,
    damaged: Vec<(SheetId, Rect)>,
    executed: bool,
    undone: bool,
}

impl MergeCommand {
    /// Merge each rectangle of a region into one span
    pub fn merge(region: Region) -> Self {
        Self::new(region, true)
    }

    /// Dissolve the spans intersecting a region
    pub fn unmerge(region: Region) -> Self {
        Self::new(region, false)
    }

    fn new(region: Region, merge: bool) -> Self {
        Self {
            region,
            merge,
            recorded: Vec::new(),
            damaged: Vec::new(),
            executed: false,
            undone: false,
        }
    }

    fn run_first(&mut self, map: &mut Map) -> Result<()> {
        let mut by_sheet: Vec<(SheetId, Vec<Rect>)> = Vec::new();
        for (id, rect) in require_selection(&self.region, &self.text())? {
            match by_sheet.iter_mut().find(|(sheet, _)| *sheet == id) {
                Some((_, rects)) => rects.push(rect),
                None => by_sheet.push((id, vec![rect])),
            }
        }
        for (id, _) in &by_sheet {
            if map.require_sheet_mut(*id)?.storage().is_recording() {
                return Err(CoreError::UndoRecordingActive.into());
            }
        }

        for (id, rects) in by_sheet {
            let storage = map.require_sheet_mut(id)?.storage_mut();
            storage.start_undo_recording()?;
            for rect in rects {
                if self.merge {
                    if rect.is_single_cell() {
                        continue;
                    }
                    storage.merge_cells(rect.left, rect.top, rect.width() - 1, rect.height() - 1);
                    self.damaged.push((id, rect));
                } else {
                    for merged in storage.merged_cells(&rect) {
                        storage.merge_cells(merged.left, merged.top, 0, 0);
                        self.damaged.push((id, merged));
                    }
                }
            }
            let mut undo = CompositeUndo::new();
            storage.stop_undo_recording(&mut undo);
            self.recorded.push((id, undo));
        }
        Ok(())
    }

    fn damage(&self, map: &mut Map) {
        for &(id, rect) in &self.damaged {
            map.add_damage(id, rect, DamageKind::Appearance);
        }
    }
}

impl Command for MergeCommand {
    fn execute(&mut self, map: &mut Map) -> Result<()> {
        if self.executed {
            return self.redo(map);
        }
        self.run_first(map)?;
        self.executed = true;
        tracing::debug!("{}: {} spans", self.text(), self.damaged.len());
        self.damage(map);
        Ok(())
    }

    fn undo(&mut self, map: &mut Map) -> Result<()> {
        ensure_executed(self.executed && !self.undone, &self.text())?;
        for (id, undo) in self.recorded.iter_mut().rev() {
            undo.undo(map.require_sheet_mut(*id)?.storage_mut());
        }
        self.undone = true;
        self.damage(map);
        Ok(())
    }

    fn redo(&mut self, map: &mut Map) -> Result<()> {
        if !self.undone {
            return Ok(());
        }
        for (id, undo) in self.recorded.iter_mut() {
            undo.redo(map.require_sheet_mut(*id)?.storage_mut());
        }
        self.undone = false;
        self.damage(map);
        Ok(())
    }

    fn text(&self) -> String {
        if self.merge {
            "Merge Cells".into()
        } else {
            "Dissociate Cells".into()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_merge_undo_redo() {
        let mut map = Map::new();
        let sheet = map.add_sheet("Sheet1").unwrap();
        let mut command = MergeCommand::merge(Region::from_rect(Rect::new(2, 2, 3, 3), sheet));
        command.execute(&mut map).unwrap();

        let storage = map.sheet(sheet).unwrap().storage();
        assert!(storage.does_merge_cells(2, 2));
        assert!(storage.is_part_of_merged(3, 3));
        assert_eq!(storage.master_cell(3, 2), storage.master_cell(2, 2));

        command.undo(&mut map).unwrap();
        assert!(map.sheet(sheet).unwrap().storage().merged_area(3, 3).is_none());
        assert!(command.undo(&mut map).is_err());

        command.redo(&mut map).unwrap();
        assert_eq!(
            map.sheet(sheet).unwrap().storage().merged_area(3, 3),
            Some(Rect::new(2, 2, 3, 3))
        );
    }

    #[test]
    fn test_unmerge_dissolves_intersecting_spans() {
        let mut map = Map::new();
        let sheet = map.add_sheet("Sheet1").unwrap();
        {
            let storage = map.sheet_mut(sheet).unwrap().storage_mut();
            storage.merge_cells(1, 1, 1, 0);
            storage.merge_cells(5, 5, 0, 2);
        }

        let mut command = MergeCommand::unmerge(Region::from_rect(Rect::new(2, 1, 5, 6), sheet));
        assert_eq!(command.text(), "Dissociate Cells");
        command.execute(&mut map).unwrap();
        let storage = map.sheet(sheet).unwrap().storage();
        assert!(!storage.does_merge_cells(1, 1));
        assert!(!storage.does_merge_cells(5, 5));

        command.undo(&mut map).unwrap();
        let storage = map.sheet(sheet).unwrap().storage();
        assert_eq!(storage.merged_x_cells(1, 1), 1);
        assert_eq!(storage.merged_y_cells(5, 5), 2);
    }
}
