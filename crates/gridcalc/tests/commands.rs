//! Undo and redo of structural commands through the public API

use gridcalc::prelude::*;

fn map_with_sheet() -> (Map, SheetId) {
    let mut map = Map::new();
    let sheet = map.add_sheet("Sheet1").unwrap();
    (map, sheet)
}

/// A macro of a row insert and a column removal undoes as one step
#[test]
fn test_macro_insert_and_delete() {
    let (mut map, sheet) = map_with_sheet();
    map.set_value(sheet, 1, 1, Value::from(1)).unwrap();
    map.set_value(sheet, 2, 1, Value::from(2)).unwrap();
    map.set_value(sheet, 2, 3, Value::from(3)).unwrap();

    let mut command = MacroCommand::new("Reshape")
        .with(InsertDeleteRowCommand::new(Region::from_rect(Rect::rows(2, 1), sheet)))
        .with(
            InsertDeleteColumnCommand::new(Region::from_rect(Rect::columns(1, 1), sheet))
                .with_reverse(true),
        );
    assert_eq!(command.len(), 2);
    assert_eq!(command.text(), "Reshape");

    command.execute(&mut map).unwrap();
    assert_eq!(map.value(sheet, 1, 1), Value::from(2));
    assert_eq!(map.value(sheet, 1, 4), Value::from(3));
    assert_eq!(map.value(sheet, 2, 1), Value::Empty);

    command.undo(&mut map).unwrap();
    assert_eq!(map.value(sheet, 1, 1), Value::from(1));
    assert_eq!(map.value(sheet, 2, 1), Value::from(2));
    assert_eq!(map.value(sheet, 2, 3), Value::from(3));
    assert_eq!(map.value(sheet, 2, 4), Value::Empty);

    command.redo(&mut map).unwrap();
    assert_eq!(map.value(sheet, 1, 1), Value::from(2));
    assert_eq!(map.value(sheet, 1, 4), Value::from(3));
}

/// A failing child rolls back the children that already ran
#[test]
fn test_macro_rolls_back_on_error() {
    let (mut map, sheet) = map_with_sheet();
    map.set_value(sheet, 1, 1, Value::from(1)).unwrap();

    let mut command = MacroCommand::new("Broken")
        .with(InsertDeleteRowCommand::new(Region::from_rect(Rect::rows(1, 1), sheet)))
        .with(ResizeRowCommand::new(Region::new(), 30.0));
    let result = command.execute(&mut map);
    assert!(matches!(result, Err(Error::EmptySelection(_))));
    assert_eq!(map.value(sheet, 1, 1), Value::from(1));
    assert_eq!(map.value(sheet, 1, 2), Value::Empty);
}

/// Undoing a command that never ran is an error
#[test]
fn test_undo_before_execute() {
    let (mut map, sheet) = map_with_sheet();
    let mut command = HideShowCommand::rows(Region::from_rect(Rect::rows(1, 1), sheet), true);
    assert!(matches!(
        command.undo(&mut map),
        Err(Error::NotExecuted(_))
    ));
}

/// Formulas keep reading the same cells when columns are inserted before them
#[test]
fn test_formulas_follow_inserted_columns() {
    let (mut map, sheet) = map_with_sheet();
    map.set_value(sheet, 1, 1, Value::from(2)).unwrap();
    map.set_value(sheet, 2, 1, Value::from(3)).unwrap();
    map.set_formula(sheet, 3, 1, "=SUM(A1:B1)*A1").unwrap();
    assert_eq!(map.value(sheet, 3, 1), Value::Float(10.0));

    let mut command = InsertDeleteColumnCommand::new(Region::from_rect(Rect::columns(2, 2), sheet));
    command.execute(&mut map).unwrap();
    assert_eq!(map.formula(sheet, 5, 1).expression(), "=SUM(A1:D1)*A1");
    assert_eq!(map.value(sheet, 5, 1), Value::Float(10.0));

    map.set_value(sheet, 2, 1, Value::from(5)).unwrap();
    assert_eq!(map.value(sheet, 5, 1), Value::Float(20.0));

    command.undo(&mut map).unwrap();
    assert_eq!(map.formula(sheet, 3, 1).expression(), "=SUM(A1:B1)*A1");
    assert_eq!(map.value(sheet, 3, 1), Value::Float(10.0));
}

/// Cell shifts move contents but leave formula text alone
#[test]
fn test_cell_shift_keeps_formula_text() {
    let (mut map, sheet) = map_with_sheet();
    map.set_value(sheet, 1, 2, Value::from(4)).unwrap();
    map.set_formula(sheet, 2, 1, "=A2").unwrap();

    let mut command = InsertShiftCommand::down(Region::from_rect(Rect::new(1, 1, 1, 1), sheet));
    command.execute(&mut map).unwrap();
    assert_eq!(map.value(sheet, 1, 3), Value::from(4));
    assert_eq!(map.formula(sheet, 2, 1).expression(), "=A2");
    assert_eq!(map.value(sheet, 2, 1), Value::Empty);

    command.undo(&mut map).unwrap();
    assert_eq!(map.value(sheet, 2, 1), Value::from(4));
}

/// Merging and dissolving spans
#[test]
fn test_merge_and_unmerge() {
    let (mut map, sheet) = map_with_sheet();
    let area = Region::from_rect(Rect::new(1, 1, 2, 2), sheet);

    let mut merge = MergeCommand::merge(area.clone());
    assert_eq!(merge.text(), "Merge Cells");
    merge.execute(&mut map).unwrap();
    let storage = map.sheet(sheet).unwrap().storage();
    assert!(storage.does_merge_cells(1, 1));
    assert!(storage.is_part_of_merged(2, 2));
    assert_eq!(storage.merged_area(2, 1), Some(Rect::new(1, 1, 2, 2)));

    let mut unmerge = MergeCommand::unmerge(area);
    unmerge.execute(&mut map).unwrap();
    assert_eq!(map.sheet(sheet).unwrap().storage().merged_area(1, 1), None);

    unmerge.undo(&mut map).unwrap();
    assert!(map.sheet(sheet).unwrap().storage().does_merge_cells(1, 1));
    merge.undo(&mut map).unwrap();
    assert_eq!(map.sheet(sheet).unwrap().storage().merged_area(1, 1), None);
}

/// Sizes below the minimum are raised to it
#[test]
fn test_resize_respects_minimum() {
    let mut map = Map::with_settings(MapSettings::new().with_minimum_size(5.0));
    let sheet = map.add_sheet("Sheet1").unwrap();

    let mut command = ResizeColumnCommand::new(Region::from_rect(Rect::columns(2, 2), sheet), 1.0);
    command.execute(&mut map).unwrap();
    assert_eq!(map.sheet(sheet).unwrap().column_width(2), 5.0);
    assert_eq!(map.sheet(sheet).unwrap().column_width(3), 5.0);

    command.undo(&mut map).unwrap();
    assert_eq!(map.sheet(sheet).unwrap().column_width(2), 60.0);
    assert!(map.sheet(sheet).unwrap().non_default_column_format(3).is_none());
}

/// Structural commands queue appearance damage up to the sheet end
#[test]
fn test_structural_damage() {
    let (mut map, sheet) = map_with_sheet();
    map.take_damages();

    let mut command = InsertDeleteRowCommand::new(Region::from_rect(Rect::rows(4, 1), sheet));
    command.execute(&mut map).unwrap();
    let damages = map.take_damages();
    assert!(damages
        .iter()
        .any(|event| event.kind == DamageKind::Appearance && event.sheet == sheet));
}
