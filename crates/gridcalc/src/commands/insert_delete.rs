//! Inserting and removing whole columns and rows

use gridcalc_core::{Region, SheetId};

use super::structural::{Edit, StructuralEdits};
use super::{require_selection, Axis, Command};
use crate::error::Result;
use crate::map::Map;

struct InsertDelete {
    axis: Axis,
    region: Region,
    remove: bool,
    edits: StructuralEdits,
}

impl InsertDelete {
    fn new(axis: Axis, region: Region) -> Self {
        Self {
            axis,
            region,
            remove: false,
            edits: StructuralEdits::default(),
        }
    }

    fn text(&self) -> String {
        let verb = if self.remove { "Remove" } else { "Insert" };
        format!("{} {}", verb, self.axis.name())
    }

    /// One edit per selected band, last band first so earlier indices hold
    fn plan(&self) -> Result<Vec<(SheetId, Edit)>> {
        let mut bands: Vec<(SheetId, u32, u32)> = require_selection(&self.region, &self.text())?
            .into_iter()
            .map(|(sheet, rect)| {
                let (at, count) = self.axis.span(&rect);
                (sheet, at, count)
            })
            .collect();
        bands.sort_by(|a, b| b.1.cmp(&a.1));
        Ok(bands
            .into_iter()
            .map(|(sheet, at, count)| {
                let edit = match (self.axis, self.remove) {
                    (Axis::Columns, false) => Edit::InsertColumns { at, count },
                    (Axis::Columns, true) => Edit::RemoveColumns { at, count },
                    (Axis::Rows, false) => Edit::InsertRows { at, count },
                    (Axis::Rows, true) => Edit::RemoveRows { at, count },
                };
                (sheet, edit)
            })
            .collect())
    }

    fn execute(&mut self, map: &mut Map) -> Result<()> {
        let text = self.text();
        let plan = self.plan()?;
        self.edits.execute(map, &text, plan)
    }

    fn undo(&mut self, map: &mut Map) -> Result<()> {
        let text = self.text();
        self.edits.undo(map, &text)
    }
}

/// Insert whole columns, or remove them in reverse mode
///
/// Each selected rectangle contributes its columns. Cell contents move with
/// their columns and references to moved columns are rewritten on every
/// sheet; references to removed cells become `#REF!`.
pub struct InsertDeleteColumnCommand(InsertDelete);

impl InsertDeleteColumnCommand {
    /// Insert as many bands as the region spans
    pub fn new(region: Region) -> Self {
        Self(InsertDelete::new(Axis::Columns, region))
    }

    /// Remove the selected columns instead of inserting
    pub fn with_reverse(mut self, reverse: bool) -> Self {
        self.0.remove = reverse;
        self
    }
}

impl Command for InsertDeleteColumnCommand {
    fn execute(&mut self, map: &mut Map) -> Result<()> {
        self.0.execute(map)
    }

    fn undo(&mut self, map: &mut Map) -> Result<()> {
        self.0.undo(map)
    }

    fn text(&self) -> String {
        self.0.text()
    }
}

/// Insert whole rows, or remove them in reverse mode
pub struct InsertDeleteRowCommand(InsertDelete);

impl InsertDeleteRowCommand {
    /// Insert as many bands as the region spans
    pub fn new(region: Region) -> Self {
        Self(InsertDelete::new(Axis::Rows, region))
    }

    /// Remove the bands instead of inserting them
    pub fn with_reverse(mut self, reverse: bool) -> Self {
        self.0.remove = reverse;
        self
    }
}

impl Command for InsertDeleteRowCommand {
    fn execute(&mut self, map: &mut Map) -> Result<()> {
        self.0.execute(map)
    }

    fn undo(&mut self, map: &mut Map) -> Result<()> {
        self.0.undo(map)
    }

    fn text(&self) -> String {
        self.0.text()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridcalc_core::{ErrorKind, Rect, Value};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_insert_rows_moves_cells() {
        let mut map = Map::new();
        let sheet = map.add_sheet("Sheet1").unwrap();
        map.set_value(sheet, 1, 5, Value::from(7)).unwrap();

        let mut command = InsertDeleteRowCommand::new(Region::from_rect(Rect::rows(5, 3), sheet));
        assert_eq!(command.text(), "Insert Rows");
        command.execute(&mut map).unwrap();
        assert_eq!(map.value(sheet, 1, 5), Value::Empty);
        assert_eq!(map.value(sheet, 1, 8), Value::from(7));

        command.undo(&mut map).unwrap();
        assert_eq!(map.value(sheet, 1, 5), Value::from(7));
        assert_eq!(map.value(sheet, 1, 8), Value::Empty);
    }

    #[test]
    fn test_remove_columns_restores_content_and_width() {
        let mut map = Map::new();
        let sheet = map.add_sheet("Sheet1").unwrap();
        map.set_value(sheet, 2, 1, Value::from("gone")).unwrap();
        map.set_value(sheet, 4, 1, Value::from("kept")).unwrap();
        map.sheet_mut(sheet).unwrap().set_column_width(2, 90.0);

        let mut command =
            InsertDeleteColumnCommand::new(Region::from_rect(Rect::columns(2, 1), sheet))
                .with_reverse(true);
        assert_eq!(command.text(), "Remove Columns");
        command.execute(&mut map).unwrap();
        assert_eq!(map.value(sheet, 3, 1), Value::from("kept"));
        assert_eq!(map.sheet(sheet).unwrap().column_width(2), 60.0);

        command.undo(&mut map).unwrap();
        assert_eq!(map.value(sheet, 2, 1), Value::from("gone"));
        assert_eq!(map.value(sheet, 4, 1), Value::from("kept"));
        assert_eq!(map.sheet(sheet).unwrap().column_width(2), 90.0);

        command.redo(&mut map).unwrap();
        assert_eq!(map.value(sheet, 2, 1), Value::Empty);
        assert_eq!(map.value(sheet, 3, 1), Value::from("kept"));
    }

    #[test]
    fn test_several_bands_are_removed_from_the_end() {
        let mut map = Map::new();
        let sheet = map.add_sheet("Sheet1").unwrap();
        for row in 1..=6 {
            map.set_value(sheet, 1, row, Value::from(row as i64)).unwrap();
        }
        let mut region = Region::from_rect(Rect::rows(2, 1), sheet);
        region.add(Rect::rows(4, 2), sheet);

        let mut command = InsertDeleteRowCommand::new(region).with_reverse(true);
        command.execute(&mut map).unwrap();
        let column: Vec<Value> = (1..=3).map(|row| map.value(sheet, 1, row)).collect();
        assert_eq!(
            column,
            vec![Value::from(1i64), Value::from(3i64), Value::from(6i64)]
        );

        command.undo(&mut map).unwrap();
        assert_eq!(map.value(sheet, 1, 5), Value::from(5i64));
    }

    #[test]
    fn test_references_follow_removed_rows() {
        let mut map = Map::new();
        let sheet = map.add_sheet("Sheet1").unwrap();
        let other = map.add_sheet("Other").unwrap();
        map.set_value(sheet, 1, 2, Value::from(3)).unwrap();
        map.set_value(sheet, 1, 4, Value::from(4)).unwrap();
        map.set_formula(sheet, 2, 5, "=A2+A4").unwrap();
        map.set_formula(other, 1, 1, "=Sheet1!A4*10").unwrap();

        let mut command =
            InsertDeleteRowCommand::new(Region::from_rect(Rect::rows(2, 1), sheet))
                .with_reverse(true);
        command.execute(&mut map).unwrap();
        assert_eq!(map.formula(sheet, 2, 4).expression(), "=#REF!+A3");
        assert_eq!(map.value(sheet, 2, 4), Value::Error(ErrorKind::Ref));
        assert_eq!(map.formula(other, 1, 1).expression(), "=Sheet1!A3*10");
        assert_eq!(map.value(other, 1, 1), Value::Float(40.0));

        command.undo(&mut map).unwrap();
        assert_eq!(map.formula(sheet, 2, 5).expression(), "=A2+A4");
        assert_eq!(map.formula(other, 1, 1).expression(), "=Sheet1!A4*10");
        assert_eq!(map.value(sheet, 2, 5), Value::Float(7.0));

        command.redo(&mut map).unwrap();
        assert_eq!(map.formula(other, 1, 1).expression(), "=Sheet1!A3*10");
    }
}
