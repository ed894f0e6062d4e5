//! Hiding and showing columns or rows

use gridcalc_core::{DamageKind, Region, SheetId};

use super::{ensure_executed, require_selection, Axis, Command};
use crate::error::Result;
use crate::map::Map;

/// Hide the selected columns or rows, or show them again
///
/// Showing also reveals a hidden run that reaches from the first column or
/// row up to the selection, which could not be selected otherwise.
pub struct HideShowCommand {
    axis: Axis,
    region: Region,
    hide: bool,
    /// Indices changed by the first run with their previous flag
    changed: Vec<(SheetId, u32, bool)>,
    executed: bool,
}

impl HideShowCommand {
    /// Hide or show the columns of a region
    pub fn columns(region: Region, hide: bool) -> Self {
        Self::new(Axis::Columns, region, hide)
    }

    /// Hide or show the rows of a region
    pub fn rows(region: Region, hide: bool) -> Self {
        Self::new(Axis::Rows, region, hide)
    }

    fn new(axis: Axis, region: Region, hide: bool) -> Self {
        Self {
            axis,
            region,
            hide,
            changed: Vec::new(),
            executed: false,
        }
    }

    /// Indices to change on one sheet
    fn targets(&self, map: &mut Map, sheet: SheetId, start: u32, count: u32) -> Result<Vec<u32>> {
        let sheet = map.require_sheet_mut(sheet)?;
        let mut targets: Vec<u32> = (start..start + count).collect();
        if !self.hide {
            let leading_hidden = (1..start).all(|index| self.axis.is_hidden(sheet, index));
            if start > 1 && leading_hidden {
                targets.extend(1..start);
            }
        }
        targets.retain(|&index| self.axis.is_hidden(sheet, index) != self.hide);
        Ok(targets)
    }

    fn apply(&self, map: &mut Map, hidden: impl Fn(bool) -> bool) -> Result<()> {
        for &(id, index, old) in &self.changed {
            let sheet = map.require_sheet_mut(id)?;
            self.axis.set_hidden(sheet, index, hidden(old));
            map.add_damage(id, self.axis.to_end(index), DamageKind::Appearance);
        }
        Ok(())
    }
}

impl Command for HideShowCommand {
    fn execute(&mut self, map: &mut Map) -> Result<()> {
        if !self.executed {
            for (id, rect) in require_selection(&self.region, &self.text())? {
                let (start, count) = self.axis.span(&rect);
                for index in self.targets(map, id, start, count)? {
                    self.changed.push((id, index, !self.hide));
                }
            }
            self.executed = true;
        }
        let hide = self.hide;
        tracing::debug!("{}: {} changed", self.text(), self.changed.len());
        self.apply(map, |_| hide)
    }

    fn undo(&mut self, map: &mut Map) -> Result<()> {
        ensure_executed(self.executed, &self.text())?;
        self.apply(map, |old| old)
    }

    fn text(&self) -> String {
        let verb = if self.hide { "Hide" } else { "Show" };
        format!("{} {}", verb, self.axis.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridcalc_core::Rect;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_hide_and_undo() {
        let mut map = Map::new();
        let sheet = map.add_sheet("Sheet1").unwrap();
        let mut command = HideShowCommand::rows(Region::from_rect(Rect::rows(3, 2), sheet), true);
        assert_eq!(command.text(), "Hide Rows");

        command.execute(&mut map).unwrap();
        assert!(map.sheet(sheet).unwrap().is_row_hidden(3));
        assert!(map.sheet(sheet).unwrap().is_row_hidden(4));

        command.undo(&mut map).unwrap();
        assert!(!map.sheet(sheet).unwrap().is_row_hidden(3));
        assert!(map.sheet(sheet).unwrap().non_default_row_format(4).is_none());
    }

    #[test]
    fn test_show_reveals_leading_hidden_columns() {
        let mut map = Map::new();
        let sheet = map.add_sheet("Sheet1").unwrap();
        {
            let sheet = map.sheet_mut(sheet).unwrap();
            sheet.set_column_hidden(1, true);
            sheet.set_column_hidden(2, true);
            sheet.set_column_hidden(4, true);
        }

        let mut command =
            HideShowCommand::columns(Region::from_rect(Rect::columns(3, 2), sheet), false);
        command.execute(&mut map).unwrap();
        let shown = map.sheet(sheet).unwrap();
        assert!(!shown.is_column_hidden(1));
        assert!(!shown.is_column_hidden(2));
        assert!(!shown.is_column_hidden(4));

        command.undo(&mut map).unwrap();
        let hidden = map.sheet(sheet).unwrap();
        assert!(hidden.is_column_hidden(1));
        assert!(!hidden.is_column_hidden(3));
        assert!(hidden.is_column_hidden(4));
    }
}
