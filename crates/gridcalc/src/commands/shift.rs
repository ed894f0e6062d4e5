//! Moving cells aside within their rows or columns

use gridcalc_core::{Rect, Region, SheetId};

use super::structural::{Edit, StructuralEdits};
use super::{require_selection, Command};
use crate::error::Result;
use crate::map::Map;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Horizontal,
    Vertical,
}

/// Plan one shift per rectangle, bottom-most or right-most first
fn plan(
    region: &Region,
    text: &str,
    direction: Direction,
    edit: fn(Rect) -> Edit,
) -> Result<Vec<(SheetId, Edit)>> {
    let mut elements = require_selection(region, text)?;
    match direction {
        Direction::Horizontal => elements.sort_by(|a, b| b.1.left.cmp(&a.1.left)),
        Direction::Vertical => elements.sort_by(|a, b| b.1.top.cmp(&a.1.top)),
    }
    Ok(elements
        .into_iter()
        .map(|(sheet, rect)| (sheet, edit(rect)))
        .collect())
}

/// Insert empty cells, pushing the cells at and after them right or down
pub struct InsertShiftCommand {
    region: Region,
    direction: Direction,
    edits: StructuralEdits,
}

impl InsertShiftCommand {
    /// Push cells right within the selected rows
    pub fn right(region: Region) -> Self {
        Self {
            region,
            direction: Direction::Horizontal,
            edits: StructuralEdits::default(),
        }
    }

    /// Push cells down within the selected columns
    pub fn down(region: Region) -> Self {
        Self {
            region,
            direction: Direction::Vertical,
            edits: StructuralEdits::default(),
        }
    }
}

impl Command for InsertShiftCommand {
    fn execute(&mut self, map: &mut Map) -> Result<()> {
        let text = self.text();
        let edit = match self.direction {
            Direction::Horizontal => Edit::InsertShiftRight,
            Direction::Vertical => Edit::InsertShiftDown,
        };
        let edits = plan(&self.region, &text, self.direction, edit)?;
        self.edits.execute(map, &text, edits)
    }

    fn undo(&mut self, map: &mut Map) -> Result<()> {
        let text = self.text();
        self.edits.undo(map, &text)
    }

    fn text(&self) -> String {
        "Insert Cells".into()
    }
}

/// Delete cells, pulling the cells after them left or up
pub struct RemoveShiftCommand {
    region: Region,
    direction: Direction,
    edits: StructuralEdits,
}

impl RemoveShiftCommand {
    /// Delete the cells and pull cells from the right
    pub fn left(region: Region) -> Self {
        Self {
            region,
            direction: Direction::Horizontal,
            edits: StructuralEdits::default(),
        }
    }

    /// Delete the cells and pull cells from below
    pub fn up(region: Region) -> Self {
        Self {
            region,
            direction: Direction::Vertical,
            edits: StructuralEdits::default(),
        }
    }
}

impl Command for RemoveShiftCommand {
    fn execute(&mut self, map: &mut Map) -> Result<()> {
        let text = self.text();
        let edit = match self.direction {
            Direction::Horizontal => Edit::RemoveShiftLeft,
            Direction::Vertical => Edit::RemoveShiftUp,
        };
        let edits = plan(&self.region, &text, self.direction, edit)?;
        self.edits.execute(map, &text, edits)
    }

    fn undo(&mut self, map: &mut Map) -> Result<()> {
        let text = self.text();
        self.edits.undo(map, &text)
    }

    fn text(&self) -> String {
        "Remove Cells".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridcalc_core::Value;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_insert_shift_down_stays_in_its_columns() {
        let mut map = Map::new();
        let sheet = map.add_sheet("Sheet1").unwrap();
        map.set_value(sheet, 2, 2, Value::from("moved")).unwrap();
        map.set_value(sheet, 3, 2, Value::from("still")).unwrap();

        let mut command = InsertShiftCommand::down(Region::from_rect(Rect::new(2, 2, 2, 3), sheet));
        command.execute(&mut map).unwrap();
        assert_eq!(map.value(sheet, 2, 4), Value::from("moved"));
        assert_eq!(map.value(sheet, 3, 2), Value::from("still"));

        command.undo(&mut map).unwrap();
        assert_eq!(map.value(sheet, 2, 2), Value::from("moved"));
        assert_eq!(map.value(sheet, 2, 4), Value::Empty);
    }

    #[test]
    fn test_remove_shift_left_and_undo() {
        let mut map = Map::new();
        let sheet = map.add_sheet("Sheet1").unwrap();
        map.set_value(sheet, 1, 1, Value::from(1)).unwrap();
        map.set_value(sheet, 2, 1, Value::from(2)).unwrap();
        map.set_value(sheet, 3, 1, Value::from(3)).unwrap();

        let mut command = RemoveShiftCommand::left(Region::from_rect(Rect::new(1, 1, 1, 1), sheet));
        command.execute(&mut map).unwrap();
        assert_eq!(map.value(sheet, 1, 1), Value::from(2));
        assert_eq!(map.value(sheet, 2, 1), Value::from(3));

        command.undo(&mut map).unwrap();
        assert_eq!(map.value(sheet, 1, 1), Value::from(1));
        assert_eq!(map.value(sheet, 3, 1), Value::from(3));
        assert_eq!(command.text(), "Remove Cells");
    }
}
