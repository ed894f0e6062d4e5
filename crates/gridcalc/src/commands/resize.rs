//! Column width and row height changes

use gridcalc_core::{DamageKind, Region, SheetId};

use super::{ensure_executed, require_selection, Axis, Command};
use crate::error::Result;
use crate::map::Map;

/// Shared state of the two resize commands
struct Resize {
    axis: Axis,
    region: Region,
    size: f64,
    /// Custom sizes before the first run
    old_sizes: Vec<(SheetId, u32, Option<f64>)>,
    executed: bool,
}

impl Resize {
    fn new(axis: Axis, region: Region, size: f64) -> Self {
        Self {
            axis,
            region,
            size,
            old_sizes: Vec::new(),
            executed: false,
        }
    }

    fn text(&self) -> String {
        match self.axis {
            Axis::Columns => "Resize Column".into(),
            Axis::Rows => "Resize Row".into(),
        }
    }

    fn execute(&mut self, map: &mut Map) -> Result<()> {
        let elements = require_selection(&self.region, &self.text())?;
        let size = self.size.max(map.settings().minimum_size);
        let first_run = !self.executed;
        for (id, rect) in elements {
            let (start, count) = self.axis.span(&rect);
            let sheet = map.require_sheet_mut(id)?;
            for index in (start..start + count).rev() {
                if first_run {
                    self.old_sizes
                        .push((id, index, self.axis.custom_size(sheet, index)));
                }
                self.axis.set_custom_size(sheet, index, Some(size));
            }
            map.add_damage(id, self.axis.to_end(start), DamageKind::Appearance);
        }
        tracing::debug!("{} set to {}", self.text(), size);
        self.executed = true;
        Ok(())
    }

    fn undo(&mut self, map: &mut Map) -> Result<()> {
        ensure_executed(self.executed, &self.text())?;
        for &(id, index, old) in self.old_sizes.iter().rev() {
            let sheet = map.require_sheet_mut(id)?;
            self.axis.set_custom_size(sheet, index, old);
            map.add_damage(id, self.axis.to_end(index), DamageKind::Appearance);
        }
        Ok(())
    }
}

/// Set the width of every selected column
///
/// Widths below the map's minimum size are raised to it.
pub struct ResizeColumnCommand(Resize);

impl ResizeColumnCommand {
    /// Set the width of the selected columns
    pub fn new(region: Region, width: f64) -> Self {
        Self(Resize::new(Axis::Columns, region, width))
    }
}

impl Command for ResizeColumnCommand {
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

/// Set the height of every selected row
pub struct ResizeRowCommand(Resize);

impl ResizeRowCommand {
    /// Set the height of the selected rows
    pub fn new(region: Region, height: f64) -> Self {
        Self(Resize::new(Axis::Rows, region, height))
    }
}

impl Command for ResizeRowCommand {
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
