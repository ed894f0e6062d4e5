//! Cell access for formula evaluation

use crate::names::NamedAreas;
use gridcalc_core::{ErrorKind, Position, Rect, Region, Sheet, SheetId, Value};
use gridcalc_formula::EvaluationContext;

/// Sheet with a given name, ignoring case
pub(crate) fn sheet_named<'a>(sheets: &'a [Sheet], name: &str) -> Option<&'a Sheet> {
    sheets
        .iter()
        .find(|sheet| sheet.name().eq_ignore_ascii_case(name))
}

pub(crate) fn sheet_with_id(sheets: &[Sheet], id: SheetId) -> Option<&Sheet> {
    sheets.iter().find(|sheet| sheet.id() == id)
}

/// Read-only view of the map while one formula cell is evaluated
pub(crate) struct MapContext<'a> {
    pub sheets: &'a [Sheet],
    pub names: &'a NamedAreas,
    /// Sheet of the formula being evaluated
    pub current: SheetId,
}

impl<'a> MapContext<'a> {
    fn resolve(&self, sheet: Option<&str>) -> Option<&'a Sheet> {
        match sheet {
            Some(name) => sheet_named(self.sheets, name),
            None => sheet_with_id(self.sheets, self.current),
        }
    }
}

fn rect_values(sheet: &Sheet, rect: Rect) -> Value {
    sheet
        .storage()
        .value_region(&Region::from_rect(rect, sheet.id()))
}

impl EvaluationContext for MapContext<'_> {
    fn value(&self, sheet: Option<&str>, pos: Position) -> Value {
        match self.resolve(sheet) {
            Some(sheet) => sheet.storage().value(pos.col, pos.row),
            None => Value::Error(ErrorKind::Ref),
        }
    }

    fn range(&self, sheet: Option<&str>, rect: Rect) -> Value {
        match self.resolve(sheet) {
            Some(sheet) => rect_values(sheet, rect),
            None => Value::Error(ErrorKind::Ref),
        }
    }

    fn resolve_name(&self, name: &str) -> Option<Value> {
        let region = self.names.get(name)?;
        let resolved = region.valid_elements().next().and_then(|element| {
            sheet_with_id(self.sheets, element.sheet).map(|sheet| (sheet, element.rect))
        });
        Some(match resolved {
            Some((sheet, rect)) if rect.is_single_cell() => {
                sheet.storage().value(rect.left, rect.top)
            }
            Some((sheet, rect)) => rect_values(sheet, rect),
            None => Value::Error(ErrorKind::Ref),
        })
    }

    fn sheet_id(&self, name: &str) -> Option<SheetId> {
        sheet_named(self.sheets, name).map(Sheet::id)
    }
}
