//! Fitting column widths and row heights to cell contents

use std::collections::BTreeMap;

use gridcalc_core::{CellStorage, DamageKind, HorizontalAlignment, Region, SheetId, Style, Value};

use super::{ensure_executed, require_selection, Axis, Command};
use crate::error::Result;
use crate::map::Map;

/// Font size used when a cell's style has none
const DEFAULT_FONT_SIZE: f64 = 10.0;
/// Average character advance as a fraction of the font size
const CHAR_WIDTH: f64 = 0.6;
/// Line height as a fraction of the font size
const LINE_HEIGHT: f64 = 1.2;
/// Indentation step per indent level
const INDENT_STEP: f64 = 10.0;
/// Room for the grid lines around the text
const COLUMN_PADDING: f64 = 4.0;
const ROW_PADDING: f64 = 1.0;

/// Estimated size of a cell's text
#[derive(Debug, Clone, Copy, PartialEq)]
struct TextSize {
    width: f64,
    height: f64,
}

fn text_size(text: &str, style: &Style) -> TextSize {
    let font_size = style.font_size.map_or(DEFAULT_FONT_SIZE, f64::from);
    let longest = text
        .split('\n')
        .map(|line| line.chars().count())
        .max()
        .unwrap_or(0);
    let lines = text.split('\n').count();
    TextSize {
        width: longest as f64 * font_size * CHAR_WIDTH,
        height: lines as f64 * font_size * LINE_HEIGHT,
    }
}

fn pen_width(pen: &Option<gridcalc_core::BorderPen>) -> f64 {
    pen.as_ref().map_or(0.0, |pen| f64::from(pen.width))
}

/// Width needed by one cell, `None` for cells without text
fn column_width_for(text: &str, value: &Value, style: &Style) -> Option<f64> {
    let size = text_size(text, style);
    if size.width <= 0.0 {
        return None;
    }
    let alignment = style.horizontal_alignment.unwrap_or(if value.is_number() {
        HorizontalAlignment::Right
    } else {
        HorizontalAlignment::Left
    });
    let indent = if alignment == HorizontalAlignment::Left {
        style.indent.map_or(0.0, |level| f64::from(level) * INDENT_STEP)
    } else {
        0.0
    };
    Some(
        indent
            + size.width
            + pen_width(&style.left_border)
            + pen_width(&style.right_border)
            + COLUMN_PADDING,
    )
}

fn row_height_for(text: &str, style: &Style) -> Option<f64> {
    let size = text_size(text, style);
    if text.is_empty() {
        return None;
    }
    Some(
        size.height
            + pen_width(&style.top_border)
            + pen_width(&style.bottom_border)
            + ROW_PADDING,
    )
}

/// Text a cell shows: what the user typed, or the value
fn display_text(storage: &CellStorage, col: u32, row: u32, value: &Value) -> String {
    let input = storage.user_input(col, row);
    if input.is_empty() {
        value.to_string()
    } else {
        input
    }
}

/// Resize columns and/or rows to fit the cells they hold
///
/// Sizes are computed once from a copy of the selected cells; empty cells and
/// cells covered by a merge do not count. Columns or rows without any text
/// keep their size.
pub struct AdjustColumnRowCommand {
    region: Region,
    adjust_columns: bool,
    adjust_rows: bool,
    /// (axis, sheet, index) -> (new size, old custom size)
    sizes: BTreeMap<(Axis, SheetId, u32), (f64, Option<f64>)>,
    executed: bool,
}

impl AdjustColumnRowCommand {
    /// Fit column widths, row heights or both to the content of a region
    pub fn new(region: Region, adjust_columns: bool, adjust_rows: bool) -> Self {
        Self {
            region,
            adjust_columns,
            adjust_rows,
            sizes: BTreeMap::new(),
            executed: false,
        }
    }

    /// Fit column widths only
    pub fn columns(region: Region) -> Self {
        Self::new(region, true, false)
    }

    /// Fit row heights only
    pub fn rows(region: Region) -> Self {
        Self::new(region, false, true)
    }

    /// Measure the selection and remember the current sizes
    fn measure(&mut self, map: &mut Map) -> Result<()> {
        let minimum = map.settings().minimum_size;
        for (id, rect) in require_selection(&self.region, &self.text())? {
            let sheet = map.require_sheet_mut(id)?;
            let sample = sheet
                .storage()
                .sub_storage(&Region::from_rect(rect, id));

            for (pos, value) in sample.value_positions() {
                if sample.is_part_of_merged(pos.col, pos.row)
                    || sample.does_merge_cells(pos.col, pos.row)
                {
                    continue;
                }
                let text = display_text(&sample, pos.col, pos.row, value);
                if text.is_empty() {
                    continue;
                }
                let style = sample.style(pos.col, pos.row);
                let col = rect.left + pos.col - 1;
                let row = rect.top + pos.row - 1;

                let mut wanted = Vec::with_capacity(2);
                if self.adjust_columns {
                    if let Some(width) = column_width_for(&text, value, &style) {
                        wanted.push((Axis::Columns, col, width));
                    }
                }
                if self.adjust_rows {
                    if let Some(height) = row_height_for(&text, &style) {
                        wanted.push((Axis::Rows, row, height));
                    }
                }
                for (axis, index, size) in wanted {
                    let old = axis.custom_size(sheet, index);
                    let entry = self
                        .sizes
                        .entry((axis, id, index))
                        .or_insert((minimum, old));
                    entry.0 = entry.0.max(size);
                }
            }
        }
        tracing::debug!("{}: measured {} sizes", self.text(), self.sizes.len());
        Ok(())
    }

    fn apply(&self, map: &mut Map, restore: bool) -> Result<()> {
        for (&(axis, id, index), &(new, old)) in &self.sizes {
            let size = if restore { old } else { Some(new) };
            axis.set_custom_size(map.require_sheet_mut(id)?, index, size);
            map.add_damage(id, axis.to_end(index), DamageKind::Appearance);
        }
        Ok(())
    }
}

impl Command for AdjustColumnRowCommand {
    fn execute(&mut self, map: &mut Map) -> Result<()> {
        if !self.executed {
            self.measure(map)?;
            self.executed = true;
        }
        self.apply(map, false)
    }

    fn undo(&mut self, map: &mut Map) -> Result<()> {
        ensure_executed(self.executed, &self.text())?;
        self.apply(map, true)
    }

    fn text(&self) -> String {
        match (self.adjust_columns, self.adjust_rows) {
            (true, true) => "Adjust Columns/Rows".into(),
            (true, false) => "Adjust Columns".into(),
            _ => "Adjust Rows".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridcalc_core::Rect;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_text_size_uses_longest_line() {
        let size = text_size("ab\nabcd", &Style::new());
        assert_eq!(size.width, 4.0 * 10.0 * CHAR_WIDTH);
        assert_eq!(size.height, 2.0 * 10.0 * LINE_HEIGHT);

        let large = text_size("abcd", &Style::new().with_font_size(20));
        assert_eq!(large.width, 2.0 * size.width);
    }

    #[test]
    fn test_adjust_columns_fits_the_longest_text() {
        let mut map = Map::new();
        let sheet = map.add_sheet("Sheet1").unwrap();
        map.set_value(sheet, 2, 1, Value::from("short")).unwrap();
        map.set_value(sheet, 2, 3, Value::from("a much longer text")).unwrap();
        map.sheet_mut(sheet).unwrap().set_column_width(2, 300.0);

        let mut command = AdjustColumnRowCommand::columns(Region::from_rect(Rect::columns(1, 3), sheet));
        command.execute(&mut map).unwrap();
        let expected = 18.0 * 10.0 * CHAR_WIDTH + COLUMN_PADDING;
        let adjusted = map.sheet(sheet).unwrap();
        assert_eq!(adjusted.column_width(2), expected);
        assert!(adjusted.non_default_column_format(1).is_none());
        assert!(adjusted.non_default_column_format(3).is_none());

        command.undo(&mut map).unwrap();
        assert_eq!(map.sheet(sheet).unwrap().column_width(2), 300.0);
    }

    #[test]
    fn test_merged_cells_are_skipped() {
        let mut map = Map::new();
        let sheet = map.add_sheet("Sheet1").unwrap();
        map.set_value(sheet, 1, 1, Value::from("merged heading")).unwrap();
        map.set_value(sheet, 1, 2, Value::from("ab")).unwrap();
        map.sheet_mut(sheet)
            .unwrap()
            .storage_mut()
            .merge_cells(1, 1, 2, 0);

        let mut command = AdjustColumnRowCommand::new(
            Region::from_rect(Rect::new(1, 1, 3, 2), sheet),
            true,
            true,
        );
        assert_eq!(command.text(), "Adjust Columns/Rows");
        command.execute(&mut map).unwrap();
        let adjusted = map.sheet(sheet).unwrap();
        assert_eq!(adjusted.column_width(1), 2.0 * 10.0 * CHAR_WIDTH + COLUMN_PADDING);
        assert_eq!(adjusted.row_height(2), 10.0 * LINE_HEIGHT + ROW_PADDING);
        assert!(adjusted.non_default_row_format(1).is_none());
    }
}
