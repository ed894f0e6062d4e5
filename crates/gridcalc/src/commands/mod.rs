//! Undoable structural edits
//!
//! Every command works on a [`Region`]; each valid element is applied to
//! the sheet it names. Commands remember what they need for [`Command::undo`]
//! the first time they run, so a command can be undone and redone any number
//! of times.

mod adjust;
mod hide_show;
mod insert_delete;
mod merge;
mod resize;
mod shift;
mod structural;

pub use adjust::AdjustColumnRowCommand;
pub use hide_show::HideShowCommand;
pub use insert_delete::{InsertDeleteColumnCommand, InsertDeleteRowCommand};
pub use merge::MergeCommand;
pub use resize::{ResizeColumnCommand, ResizeRowCommand};
pub use shift::{InsertShiftCommand, RemoveShiftCommand};

use gridcalc_core::{Rect, Region, Sheet, SheetId, MAX_COLS, MAX_ROWS};

use crate::error::{Error, Result};
use crate::map::Map;

/// An undoable edit of a [`Map`]
pub trait Command {
    fn execute(&mut self, map: &mut Map) -> Result<()>;

    /// Revert the last `execute` or `redo`
    fn undo(&mut self, map: &mut Map) -> Result<()>;

    /// Apply the edit again after `undo`
    fn redo(&mut self, map: &mut Map) -> Result<()> {
        self.execute(map)
    }

    /// Name shown in undo menus
    fn text(&self) -> String;
}

/// A sequence of commands undone and redone as one
///
/// Children execute and redo in order and undo in reverse order. If a child
/// fails to execute, the children that already ran are undone before the
/// error is returned.
#[derive(Default)]
pub struct MacroCommand {
    text: String,
    children: Vec<Box<dyn Command>>,
}

impl MacroCommand {
    /// Empty macro with the given undo text
    pub fn new<S: Into<String>>(text: S) -> Self {
        Self {
            text: text.into(),
            children: Vec::new(),
        }
    }

    /// Append a child command
    pub fn push<C: Command + 'static>(&mut self, command: C) {
        self.children.push(Box::new(command));
    }

    /// Builder form of [`MacroCommand::push`]
    pub fn with<C: Command + 'static>(mut self, command: C) -> Self {
        self.push(command);
        self
    }

    /// Number of child commands
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// Whether the macro has no children
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    fn run_forward(&mut self, map: &mut Map, redo: bool) -> Result<()> {
        for index in 0..self.children.len() {
            let outcome = if redo {
                self.children[index].redo(map)
            } else {
                self.children[index].execute(map)
            };
            if let Err(err) = outcome {
                tracing::warn!(
                    "'{}' failed in '{}': {}",
                    self.children[index].text(),
                    self.text,
                    err
                );
                for child in self.children[..index].iter_mut().rev() {
                    child.undo(map)?;
                }
                return Err(err);
            }
        }
        Ok(())
    }
}

impl Command for MacroCommand {
    fn execute(&mut self, map: &mut Map) -> Result<()> {
        self.run_forward(map, false)
    }

    fn undo(&mut self, map: &mut Map) -> Result<()> {
        for child in self.children.iter_mut().rev() {
            child.undo(map)?;
        }
        Ok(())
    }

    fn redo(&mut self, map: &mut Map) -> Result<()> {
        self.run_forward(map, true)
    }

    fn text(&self) -> String {
        self.text.clone()
    }
}

// === Helpers shared by the commands ===

/// Whether an edit applies to columns or rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Axis {
    Columns,
    Rows,
}

impl Axis {
    pub(crate) fn name(self) -> &'static str {
        match self {
            Axis::Columns => "Columns",
            Axis::Rows => "Rows",
        }
    }

    /// First index and count of a rectangle along this axis
    pub(crate) fn span(self, rect: &Rect) -> (u32, u32) {
        match self {
            Axis::Columns => (rect.left, rect.width()),
            Axis::Rows => (rect.top, rect.height()),
        }
    }

    /// Everything from `start` to the end of the sheet
    pub(crate) fn to_end(self, start: u32) -> Rect {
        match self {
            Axis::Columns => Rect::new(start, 1, MAX_COLS, MAX_ROWS),
            Axis::Rows => Rect::new(1, start, MAX_COLS, MAX_ROWS),
        }
    }

    /// Custom width or height, `None` for the sheet default
    pub(crate) fn custom_size(self, sheet: &Sheet, index: u32) -> Option<f64> {
        match self {
            Axis::Columns => sheet.column_format(index).width,
            Axis::Rows => sheet.row_format(index).height,
        }
    }

    pub(crate) fn set_custom_size(self, sheet: &mut Sheet, index: u32, size: Option<f64>) {
        match self {
            Axis::Columns => {
                let mut format = sheet.column_format(index);
                format.width = size;
                sheet.set_column_format(index, format);
            }
            Axis::Rows => {
                let mut format = sheet.row_format(index);
                format.height = size;
                sheet.set_row_format(index, format);
            }
        }
    }

    /// Hidden by the user (filters are not considered)
    pub(crate) fn is_hidden(self, sheet: &Sheet, index: u32) -> bool {
        match self {
            Axis::Columns => sheet.column_format(index).hidden,
            Axis::Rows => sheet.row_format(index).hidden,
        }
    }

    pub(crate) fn set_hidden(self, sheet: &mut Sheet, index: u32, hidden: bool) {
        match self {
            Axis::Columns => sheet.set_column_hidden(index, hidden),
            Axis::Rows => sheet.set_row_hidden(index, hidden),
        }
    }
}

/// The valid elements of a selection as (sheet, rectangle) pairs
pub(crate) fn selection(region: &Region) -> Vec<(SheetId, Rect)> {
    let elements: Vec<(SheetId, Rect)> = region
        .valid_elements()
        .map(|element| (element.sheet, element.rect.clamped()))
        .collect();
    if elements.len() < region.len() {
        tracing::debug!(
            "skipping {} invalid selection elements",
            region.len() - elements.len()
        );
    }
    elements
}

/// Fail with `EmptySelection` when nothing is selected
pub(crate) fn require_selection(region: &Region, text: &str) -> Result<Vec<(SheetId, Rect)>> {
    let elements = selection(region);
    if elements.is_empty() {
        return Err(Error::EmptySelection(text.to_string()));
    }
    Ok(elements)
}

/// Fail with `NotExecuted` unless the command has run
pub(crate) fn ensure_executed(executed: bool, text: &str) -> Result<()> {
    if executed {
        Ok(())
    } else {
        Err(Error::NotExecuted(text.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    struct Counter {
        fail: bool,
        executed: u32,
    }

    impl Command for std::rc::Rc<std::cell::RefCell<Counter>> {
        fn execute(&mut self, _map: &mut Map) -> Result<()> {
            let mut counter = self.borrow_mut();
            if counter.fail {
                return Err(Error::EmptySelection("counter".into()));
            }
            counter.executed += 1;
            Ok(())
        }

        fn undo(&mut self, _map: &mut Map) -> Result<()> {
            self.borrow_mut().executed -= 1;
            Ok(())
        }

        fn text(&self) -> String {
            "Count".into()
        }
    }

    fn counter(fail: bool) -> std::rc::Rc<std::cell::RefCell<Counter>> {
        std::rc::Rc::new(std::cell::RefCell::new(Counter { fail, executed: 0 }))
    }

    #[test]
    fn test_macro_runs_children_in_order() {
        let mut map = Map::new();
        let first = counter(false);
        let second = counter(false);
        let mut command = MacroCommand::new("Both")
            .with(first.clone())
            .with(second.clone());
        assert_eq!(command.len(), 2);

        command.execute(&mut map).unwrap();
        assert_eq!(first.borrow().executed, 1);
        assert_eq!(second.borrow().executed, 1);

        command.undo(&mut map).unwrap();
        assert_eq!(first.borrow().executed, 0);
        command.redo(&mut map).unwrap();
        assert_eq!(second.borrow().executed, 1);
        assert_eq!(command.text(), "Both");
    }

    #[test]
    fn test_macro_rolls_back_on_failure() {
        let mut map = Map::new();
        let first = counter(false);
        let mut command = MacroCommand::new("Broken")
            .with(first.clone())
            .with(counter(true));

        assert!(command.execute(&mut map).is_err());
        assert_eq!(first.borrow().executed, 0);
    }

    #[test]
    fn test_axis_sizes() {
        let mut sheet = Sheet::new(SheetId(1), "Sheet1");
        Axis::Rows.set_custom_size(&mut sheet, 3, Some(40.0));
        assert_eq!(Axis::Rows.custom_size(&sheet, 3), Some(40.0));
        assert_eq!(sheet.row_height(3), 40.0);
        Axis::Rows.set_custom_size(&mut sheet, 3, None);
        assert!(sheet.non_default_row_format(3).is_none());

        assert_eq!(Axis::Columns.span(&Rect::new(2, 5, 4, 9)), (2, 3));
        assert_eq!(Axis::Rows.to_end(5), Rect::new(1, 5, MAX_COLS, MAX_ROWS));
    }
}
