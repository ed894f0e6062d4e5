//! Per-sheet cell storage
//!
//! [`CellStorage`] composes one strongly-typed store per attribute kind.
//! Point attributes (value, formula, link, user input, rich text) live in
//! [`PositionKeyedStore`]s; region-scoped attributes live in [`RectStorage`]s.
//! Structural edits are applied to every store at once so that no caller
//! ever observes a half-shifted sheet.

use bitflags::bitflags;

use crate::attributes::{Binding, Conditions, Database, Formula, Validity};
use crate::error::{Error, Result};
use crate::position::{Position, Rect};
use crate::region::{Region, SheetId};
use crate::store::{PositionKeyedStore, RectStorage};
use crate::style::{Style, StyleStorage};
use crate::undo::{CompositeUndo, UndoDelta, UndoRecorder};
use crate::value::{Value, ValueArray};

bitflags! {
    /// Stores consulted when iterating over cells
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Visiting: u8 {
        const VALUES = 0x01;
        const FORMULAS = 0x02;
        const COMMENTS = 0x04;
        const LINKS = 0x08;
        const STYLES = 0x10;
        const CONDITION_STYLES = 0x20;
        const VALIDITIES = 0x40;
        /// Values and formulas
        const CONTENT = Self::VALUES.bits() | Self::FORMULAS.bits();
        const ALL = Self::VALUES.bits()
            | Self::FORMULAS.bits()
            | Self::COMMENTS.bits()
            | Self::LINKS.bits()
            | Self::STYLES.bits()
            | Self::CONDITION_STYLES.bits()
            | Self::VALIDITIES.bits();
    }
}

/// A structural edit, applied identically to every store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shift {
    InsertColumns(u32, u32),
    RemoveColumns(u32, u32),
    InsertRows(u32, u32),
    RemoveRows(u32, u32),
    InsertShiftRight(Rect),
    RemoveShiftLeft(Rect),
    InsertShiftDown(Rect),
    RemoveShiftUp(Rect),
}

impl Shift {
    /// Area whose content is deleted by the edit
    fn removed_area(&self) -> Option<Rect> {
        match *self {
            Shift::RemoveColumns(at, count) if count > 0 => Some(Rect::columns(at, count)),
            Shift::RemoveRows(at, count) if count > 0 => Some(Rect::rows(at, count)),
            Shift::RemoveShiftLeft(rect) | Shift::RemoveShiftUp(rect) => Some(rect),
            _ => None,
        }
    }

    fn apply_points<T>(&self, store: &mut PositionKeyedStore<T>) -> Vec<(Position, T)> {
        match *self {
            Shift::InsertColumns(at, count) => store.insert_columns(at, count),
            Shift::RemoveColumns(at, count) => store.remove_columns(at, count),
            Shift::InsertRows(at, count) => store.insert_rows(at, count),
            Shift::RemoveRows(at, count) => store.remove_rows(at, count),
            Shift::InsertShiftRight(rect) => store.insert_shift_right(&rect),
            Shift::RemoveShiftLeft(rect) => store.remove_shift_left(&rect),
            Shift::InsertShiftDown(rect) => store.insert_shift_down(&rect),
            Shift::RemoveShiftUp(rect) => store.remove_shift_up(&rect),
        }
    }

    fn apply_rects<T: Clone + PartialEq>(&self, store: &mut RectStorage<T>) -> Vec<(Rect, T)> {
        match *self {
            Shift::InsertColumns(at, count) => store.insert_columns(at, count),
            Shift::RemoveColumns(at, count) => store.remove_columns(at, count),
            Shift::InsertRows(at, count) => store.insert_rows(at, count),
            Shift::RemoveRows(at, count) => store.remove_rows(at, count),
            Shift::InsertShiftRight(rect) => store.insert_shift_right(&rect),
            Shift::RemoveShiftLeft(rect) => store.remove_shift_left(&rect),
            Shift::InsertShiftDown(rect) => store.insert_shift_down(&rect),
            Shift::RemoveShiftUp(rect) => store.remove_shift_up(&rect),
        }
    }
}

/// Storage for all cell attributes of one sheet
#[derive(Debug, Clone)]
pub struct CellStorage {
    sheet: SheetId,

    // Point stores
    values: PositionKeyedStore<Value>,
    formulas: PositionKeyedStore<Formula>,
    links: PositionKeyedStore<String>,
    user_inputs: PositionKeyedStore<String>,
    rich_texts: PositionKeyedStore<String>,

    // Rect stores
    bindings: RectStorage<Binding>,
    comments: RectStorage<String>,
    conditions: RectStorage<Conditions>,
    databases: RectStorage<Database>,
    named_areas: RectStorage<String>,
    fusions: RectStorage<bool>,
    matrices: RectStorage<bool>,
    styles: StyleStorage,
    validities: RectStorage<Validity>,

    undo: Option<UndoRecorder>,
}

/// Record a point mutation if recording is active
macro_rules! record_point {
    ($self:ident, $store:ident, $pos:expr, $old:expr) => {
        if let Some(recorder) = $self.undo.as_mut() {
            recorder.$store.record($pos, $old);
        }
    };
}

/// Snapshot a rectangle of a rect store if recording is active
macro_rules! record_rect {
    ($self:ident, $store:ident, $rect:expr) => {
        if let Some(recorder) = $self.undo.as_mut() {
            recorder.$store.record($self.$store.undo_data(&$rect));
        }
    };
}

impl CellStorage {
    /// Create an empty storage for a sheet
    pub fn new(sheet: SheetId) -> Self {
        Self {
            sheet,
            values: PositionKeyedStore::new(),
            formulas: PositionKeyedStore::new(),
            links: PositionKeyedStore::new(),
            user_inputs: PositionKeyedStore::new(),
            rich_texts: PositionKeyedStore::new(),
            bindings: RectStorage::new(),
            comments: RectStorage::new(),
            conditions: RectStorage::new(),
            databases: RectStorage::new(),
            named_areas: RectStorage::new(),
            fusions: RectStorage::atomic(),
            matrices: RectStorage::atomic(),
            styles: StyleStorage::new(),
            validities: RectStorage::new(),
            undo: None,
        }
    }

    /// The sheet this storage belongs to
    pub fn sheet(&self) -> SheetId {
        self.sheet
    }

    // === Point attributes ===

    /// Value at a position, `Empty` if none
    pub fn value(&self, col: u32, row: u32) -> Value {
        self.values
            .get(Position::new(col, row))
            .cloned()
            .unwrap_or_default()
    }

    /// Value as displayed: positions inside a merge show the master's value
    pub fn visible_value(&self, col: u32, row: u32) -> Value {
        let master = self.master_cell(col, row);
        self.value(master.col, master.row)
    }

    /// Set a value; an empty value clears the position
    ///
    /// Setting a value on the master of a lock first unlocks it.
    pub fn set_value(&mut self, col: u32, row: u32, value: Value) {
        let pos = Position::new(col, row);
        if !pos.is_valid() {
            tracing::debug!("ignoring value outside the sheet at ({}, {})", col, row);
            return;
        }
        self.unlock_cells(col, row);
        let old = if value.is_empty() {
            self.values.take(pos)
        } else {
            self.values.set(pos, value)
        };
        record_point!(self, values, pos, old);
    }

    /// Formula at a position, empty if none
    pub fn formula(&self, col: u32, row: u32) -> Formula {
        self.formulas
            .get(Position::new(col, row))
            .cloned()
            .unwrap_or_default()
    }

    /// Set a formula; an empty formula clears the position
    pub fn set_formula(&mut self, col: u32, row: u32, formula: Formula) {
        let pos = Position::new(col, row);
        if !pos.is_valid() {
            tracing::debug!("ignoring formula outside the sheet at ({}, {})", col, row);
            return;
        }
        let old = if formula.is_empty() {
            self.formulas.take(pos)
        } else {
            self.formulas.set(pos, formula)
        };
        record_point!(self, formulas, pos, old);
    }

    /// Hyperlink at a position, empty if none
    pub fn link(&self, col: u32, row: u32) -> String {
        self.links
            .get(Position::new(col, row))
            .cloned()
            .unwrap_or_default()
    }

    /// Set a hyperlink; an empty link clears the position
    pub fn set_link<S: Into<String>>(&mut self, col: u32, row: u32, link: S) {
        let pos = Position::new(col, row);
        let old = set_text(&mut self.links, pos, link.into());
        record_point!(self, links, pos, old);
    }

    /// Text as the user typed it, empty if none
    pub fn user_input(&self, col: u32, row: u32) -> String {
        self.user_inputs
            .get(Position::new(col, row))
            .cloned()
            .unwrap_or_default()
    }

    /// Set the typed text; empty text clears the position
    pub fn set_user_input<S: Into<String>>(&mut self, col: u32, row: u32, input: S) {
        let pos = Position::new(col, row);
        let old = set_text(&mut self.user_inputs, pos, input.into());
        record_point!(self, user_inputs, pos, old);
    }

    /// Rich text markup at a position, empty if none
    pub fn rich_text(&self, col: u32, row: u32) -> String {
        self.rich_texts
            .get(Position::new(col, row))
            .cloned()
            .unwrap_or_default()
    }

    /// Set rich text markup; empty markup clears the position
    pub fn set_rich_text<S: Into<String>>(&mut self, col: u32, row: u32, text: S) {
        let pos = Position::new(col, row);
        let old = set_text(&mut self.rich_texts, pos, text.into());
        record_point!(self, rich_texts, pos, old);
    }

    /// Clear formula, link, user input, value and rich text at a position
    pub fn take(&mut self, col: u32, row: u32) {
        let pos = Position::new(col, row);
        if let Some(old) = self.formulas.take(pos) {
            record_point!(self, formulas, pos, Some(old));
        }
        if let Some(old) = self.links.take(pos) {
            record_point!(self, links, pos, Some(old));
        }
        if let Some(old) = self.user_inputs.take(pos) {
            record_point!(self, user_inputs, pos, Some(old));
        }
        if let Some(old) = self.values.take(pos) {
            record_point!(self, values, pos, Some(old));
        }
        if let Some(old) = self.rich_texts.take(pos) {
            record_point!(self, rich_texts, pos, Some(old));
        }
    }

    /// Whether no store other than the style store holds data at a position
    pub fn is_cell_empty(&self, col: u32, row: u32) -> bool {
        let pos = Position::new(col, row);
        !self.values.contains(pos)
            && !self.formulas.contains(pos)
            && !self.links.contains(pos)
            && !self.user_inputs.contains(pos)
            && !self.rich_texts.contains(pos)
            && self.bindings.get(pos).is_none()
            && self.comments.get(pos).is_none()
            && self.conditions.get(pos).is_none()
            && self.databases.get(pos).is_none()
            && self.named_areas.get(pos).is_none()
            && self.validities.get(pos).is_none()
    }

    /// Array of the values inside the first range of a region
    ///
    /// The array is clipped to the used extent of the value store and holds
    /// only the stored values, so large ranges over a sparse sheet stay small.
    pub fn value_region(&self, region: &Region) -> Value {
        let Some(rect) = region.first_range() else {
            return Value::Empty;
        };
        let right = rect.right.min(rect.left.max(self.values.columns()));
        let bottom = rect.bottom.min(rect.top.max(self.values.rows()));
        let clipped = Rect::new(rect.left, rect.top, right, bottom);

        let mut array = ValueArray::new(clipped.width(), clipped.height());
        for (pos, value) in self.values.entries_in(&clipped) {
            array.set(pos.col - clipped.left, pos.row - clipped.top, value.clone());
        }
        Value::Array(array)
    }

    // === Region attributes ===

    /// Data binding covering a position
    pub fn binding(&self, col: u32, row: u32) -> Binding {
        self.bindings
            .get(Position::new(col, row))
            .cloned()
            .unwrap_or_default()
    }

    /// Bind a region to a data source
    pub fn set_binding(&mut self, region: &Region, binding: Binding) {
        for rect in self.valid_rects(region) {
            record_rect!(self, bindings, rect);
            set_rect(&mut self.bindings, rect, binding.clone(), binding.is_empty());
        }
    }

    /// Comment covering a position, empty if none
    pub fn comment(&self, col: u32, row: u32) -> String {
        self.comments
            .get(Position::new(col, row))
            .cloned()
            .unwrap_or_default()
    }

    /// Attach a comment to a region; an empty comment removes it
    pub fn set_comment<S: Into<String>>(&mut self, region: &Region, comment: S) {
        let comment = comment.into();
        for rect in self.valid_rects(region) {
            record_rect!(self, comments, rect);
            set_rect(&mut self.comments, rect, comment.clone(), comment.is_empty());
        }
    }

    /// Conditional formatting covering a position
    pub fn conditions(&self, col: u32, row: u32) -> Conditions {
        self.conditions
            .get(Position::new(col, row))
            .cloned()
            .unwrap_or_default()
    }

    /// Apply conditional formatting to a region
    pub fn set_conditions(&mut self, region: &Region, conditions: Conditions) {
        for rect in self.valid_rects(region) {
            record_rect!(self, conditions, rect);
            let empty = conditions.is_empty();
            set_rect(&mut self.conditions, rect, conditions.clone(), empty);
        }
    }

    /// Database range covering a position
    pub fn database(&self, col: u32, row: u32) -> Database {
        self.databases
            .get(Position::new(col, row))
            .cloned()
            .unwrap_or_default()
    }

    /// Mark a region as a database range
    pub fn set_database(&mut self, region: &Region, database: Database) {
        for rect in self.valid_rects(region) {
            record_rect!(self, databases, rect);
            let empty = database.is_empty();
            set_rect(&mut self.databases, rect, database.clone(), empty);
        }
    }

    /// Name of the named area covering a position, empty if none
    pub fn named_area(&self, col: u32, row: u32) -> String {
        self.named_areas
            .get(Position::new(col, row))
            .cloned()
            .unwrap_or_default()
    }

    /// Record a named area over a region
    pub fn set_named_area<S: Into<String>>(&mut self, region: &Region, name: S) {
        let name = name.into();
        for rect in self.valid_rects(region) {
            record_rect!(self, named_areas, rect);
            set_rect(&mut self.named_areas, rect, name.clone(), name.is_empty());
        }
    }

    /// Effective style at a position
    pub fn style(&self, col: u32, row: u32) -> Style {
        self.styles.get(Position::new(col, row))
    }

    /// Apply a substyle over a region
    pub fn set_style(&mut self, region: &Region, style: Style) {
        for rect in self.valid_rects(region) {
            if let Some(recorder) = self.undo.as_mut() {
                recorder.styles.record(self.styles.undo_data(&rect));
            }
            self.styles.insert(rect, style.clone());
        }
    }

    /// Remove every substyle from a region
    pub fn clear_style(&mut self, region: &Region) {
        for rect in self.valid_rects(region) {
            if let Some(recorder) = self.undo.as_mut() {
                recorder.styles.record(self.styles.undo_data(&rect));
            }
            self.styles.remove(&rect);
        }
    }

    /// The substyle store
    pub fn style_storage(&self) -> &StyleStorage {
        &self.styles
    }

    /// Validation rule covering a position
    pub fn validity(&self, col: u32, row: u32) -> Validity {
        self.validities
            .get(Position::new(col, row))
            .cloned()
            .unwrap_or_default()
    }

    /// Apply a validation rule to a region
    pub fn set_validity(&mut self, region: &Region, validity: Validity) {
        for rect in self.valid_rects(region) {
            record_rect!(self, validities, rect);
            let empty = validity.is_empty();
            set_rect(&mut self.validities, rect, validity.clone(), empty);
        }
    }

    /// Rectangles of a region that belong to this sheet and are valid
    fn valid_rects(&self, region: &Region) -> Vec<Rect> {
        region
            .iter()
            .filter_map(|element| {
                if !element.is_valid() {
                    tracing::debug!("skipping invalid region element {:?}", element.rect);
                    return None;
                }
                if element.sheet != self.sheet {
                    tracing::debug!(
                        "skipping region element on {} for storage of {}",
                        element.sheet,
                        self.sheet
                    );
                    return None;
                }
                Some(element.rect.clamped())
            })
            .collect()
    }

    // === Merges ===

    /// Merge `num_x` further columns and `num_y` further rows into the cell at (col, row)
    ///
    /// Passing (0, 0) unmerges. Any span that contained the position or that
    /// overlaps the new span is dissolved first.
    pub fn merge_cells(&mut self, col: u32, row: u32, num_x: u32, num_y: u32) {
        let pos = Position::new(col, row);
        if !pos.is_valid() {
            return;
        }
        if let Some(old) = self.merged_area(col, row) {
            record_rect!(self, fusions, old);
            self.fusions.remove(&old);
        }
        if num_x == 0 && num_y == 0 {
            return;
        }

        let span = Rect::from_size(col, row, num_x + 1, num_y + 1).clamped();
        let overlapping: Vec<Rect> = self
            .fusions
            .intersecting_pairs(&span)
            .into_iter()
            .map(|(rect, _)| rect)
            .collect();
        for rect in overlapping {
            record_rect!(self, fusions, rect);
            self.fusions.remove(&rect);
        }
        record_rect!(self, fusions, span);
        self.fusions.insert(span, true);
    }

    /// The merge span containing a position, if any
    pub fn merged_area(&self, col: u32, row: u32) -> Option<Rect> {
        self.fusions
            .contains_pair(Position::new(col, row))
            .map(|(rect, _)| rect)
    }

    /// Whether the position is the master of a merge span
    pub fn does_merge_cells(&self, col: u32, row: u32) -> bool {
        self.merged_area(col, row)
            .is_some_and(|rect| rect.top_left() == Position::new(col, row))
    }

    /// Whether the position is a non-master part of a merge span
    pub fn is_part_of_merged(&self, col: u32, row: u32) -> bool {
        self.merged_area(col, row)
            .is_some_and(|rect| rect.top_left() != Position::new(col, row))
    }

    /// Master of the merge span containing the position, or the position itself
    pub fn master_cell(&self, col: u32, row: u32) -> Position {
        self.merged_area(col, row)
            .map_or(Position::new(col, row), |rect| rect.top_left())
    }

    /// Columns merged into the master at (col, row), not counting the master
    pub fn merged_x_cells(&self, col: u32, row: u32) -> u32 {
        match self.merged_area(col, row) {
            Some(rect) if rect.top_left() == Position::new(col, row) => rect.width() - 1,
            _ => 0,
        }
    }

    /// Rows merged into the master at (col, row), not counting the master
    pub fn merged_y_cells(&self, col: u32, row: u32) -> u32 {
        match self.merged_area(col, row) {
            Some(rect) if rect.top_left() == Position::new(col, row) => rect.height() - 1,
            _ => 0,
        }
    }

    /// Every merge span intersecting a rectangle
    pub fn merged_cells(&self, rect: &Rect) -> Vec<Rect> {
        self.fusions
            .intersecting_pairs(rect)
            .into_iter()
            .map(|(rect, _)| rect)
            .collect()
    }

    // === Locks ===

    /// Lock a rectangle for the array result of its top-left cell
    ///
    /// A lock previously owned by the same master is released first. Single
    /// cell rectangles only release.
    pub fn lock_cells(&mut self, rect: Rect) {
        let rect = rect.clamped();
        let master = rect.top_left();
        if let Some(old) = self.locked_cells(master.col, master.row) {
            record_rect!(self, matrices, old);
            self.matrices.remove(&old);
        }
        if rect.is_single_cell() {
            return;
        }
        record_rect!(self, matrices, rect);
        self.matrices.insert(rect, true);
    }

    /// Release the lock mastered at (col, row), clearing the values of its other cells
    ///
    /// Does nothing unless the position is the master of a lock.
    pub fn unlock_cells(&mut self, col: u32, row: u32) {
        let master = Position::new(col, row);
        let Some(rect) = self.locked_cells(col, row) else {
            return;
        };
        if rect.top_left() != master {
            return;
        }
        record_rect!(self, matrices, rect);
        self.matrices.remove(&rect);
        for pos in rect.positions().filter(|pos| *pos != master) {
            if let Some(old) = self.values.take(pos) {
                record_point!(self, values, pos, Some(old));
            }
        }
    }

    /// The lock rectangle covering a position, if any
    pub fn locked_cells(&self, col: u32, row: u32) -> Option<Rect> {
        self.matrices
            .contains_pair(Position::new(col, row))
            .map(|(rect, _)| rect)
    }

    /// Whether the position is the master of a lock
    pub fn locks_cells(&self, col: u32, row: u32) -> bool {
        self.locked_cells(col, row)
            .is_some_and(|rect| rect.top_left() == Position::new(col, row))
    }

    /// Whether the position is owned by the array result of another cell
    pub fn is_locked(&self, col: u32, row: u32) -> bool {
        self.locked_cells(col, row)
            .is_some_and(|rect| rect.top_left() != Position::new(col, row))
    }

    /// Whether any lock intersects a region
    pub fn has_locked_cells(&self, region: &Region) -> bool {
        region
            .valid_elements()
            .filter(|element| element.sheet == self.sheet)
            .any(|element| !self.matrices.intersecting_pairs(&element.rect).is_empty())
    }

    // === Extent ===

    /// Last used column, optionally counting styles
    pub fn columns(&self, include_styles: bool) -> u32 {
        let mut max = self
            .values
            .columns()
            .max(self.formulas.columns())
            .max(self.links.columns())
            .max(self.user_inputs.columns())
            .max(self.rich_texts.columns())
            .max(self.bindings.columns())
            .max(self.comments.columns())
            .max(self.conditions.columns())
            .max(self.databases.columns())
            .max(self.named_areas.columns())
            .max(self.fusions.columns())
            .max(self.matrices.columns())
            .max(self.validities.columns());
        if include_styles {
            max = max.max(self.styles.rects().columns());
        }
        max
    }

    /// Last used row, optionally counting styles
    pub fn rows(&self, include_styles: bool) -> u32 {
        let mut max = self
            .values
            .rows()
            .max(self.formulas.rows())
            .max(self.links.rows())
            .max(self.user_inputs.rows())
            .max(self.rich_texts.rows())
            .max(self.bindings.rows())
            .max(self.comments.rows())
            .max(self.conditions.rows())
            .max(self.databases.rows())
            .max(self.named_areas.rows())
            .max(self.fusions.rows())
            .max(self.matrices.rows())
            .max(self.validities.rows());
        if include_styles {
            max = max.max(self.styles.rects().rows());
        }
        max
    }

    /// Smallest rectangle containing every used position
    pub fn used_area(&self, include_styles: bool) -> Option<Rect> {
        let areas = [
            self.values.used_area(),
            self.formulas.used_area(),
            self.links.used_area(),
            self.user_inputs.used_area(),
            self.rich_texts.used_area(),
            self.bindings.used_area(),
            self.comments.used_area(),
            self.conditions.used_area(),
            self.databases.used_area(),
            self.named_areas.used_area(),
            self.fusions.used_area(),
            self.matrices.used_area(),
            self.validities.used_area(),
            if include_styles {
                self.styles.rects().used_area()
            } else {
                None
            },
        ];
        areas
            .into_iter()
            .flatten()
            .reduce(|acc, rect| acc.united(&rect))
    }

    /// Positions holding a formula, row-major
    pub fn formula_positions(&self) -> impl Iterator<Item = (Position, &Formula)> {
        self.formulas.iter()
    }

    /// Positions holding a value, row-major
    pub fn value_positions(&self) -> impl Iterator<Item = (Position, &Value)> {
        self.values.iter()
    }

    // === Iteration ===

    /// First position in a row holding an attribute in `visiting`
    pub fn first_in_row(&self, row: u32, visiting: Visiting) -> Option<Position> {
        self.nearest(visiting, Nearest::Min, |store| store.first_in_row(row))
    }

    /// Next position right of `col` holding an attribute in `visiting`
    pub fn next_in_row(&self, col: u32, row: u32, visiting: Visiting) -> Option<Position> {
        self.nearest(visiting, Nearest::Min, |store| store.next_in_row(col, row))
    }

    /// Last position in a row holding an attribute in `visiting`
    pub fn last_in_row(&self, row: u32, visiting: Visiting) -> Option<Position> {
        self.nearest(visiting, Nearest::Max, |store| store.last_in_row(row))
    }

    /// Previous position left of `col` holding an attribute in `visiting`
    pub fn prev_in_row(&self, col: u32, row: u32, visiting: Visiting) -> Option<Position> {
        self.nearest(visiting, Nearest::Max, |store| store.prev_in_row(col, row))
    }

    /// First position in a column holding an attribute in `visiting`
    pub fn first_in_column(&self, col: u32, visiting: Visiting) -> Option<Position> {
        self.nearest(visiting, Nearest::Min, |store| store.first_in_column(col))
    }

    /// Next position below `row` holding an attribute in `visiting`
    pub fn next_in_column(&self, col: u32, row: u32, visiting: Visiting) -> Option<Position> {
        self.nearest(visiting, Nearest::Min, |store| store.next_in_column(col, row))
    }

    /// Last position in a column holding an attribute in `visiting`
    pub fn last_in_column(&self, col: u32, visiting: Visiting) -> Option<Position> {
        self.nearest(visiting, Nearest::Max, |store| store.last_in_column(col))
    }

    /// Previous position above `row` holding an attribute in `visiting`
    pub fn prev_in_column(&self, col: u32, row: u32, visiting: Visiting) -> Option<Position> {
        self.nearest(visiting, Nearest::Max, |store| store.prev_in_column(col, row))
    }

    /// Ask every store selected by `visiting` and keep the closest answer
    ///
    /// Positions compare row-major, so the same reduction serves row and
    /// column walks.
    fn nearest<F>(&self, visiting: Visiting, nearest: Nearest, query: F) -> Option<Position>
    where
        F: Fn(&dyn Navigate) -> Option<Position>,
    {
        let mut stores: Vec<&dyn Navigate> = Vec::new();
        if visiting.contains(Visiting::VALUES) {
            stores.push(&self.values);
        }
        if visiting.contains(Visiting::FORMULAS) {
            stores.push(&self.formulas);
        }
        if visiting.contains(Visiting::COMMENTS) {
            stores.push(&self.comments);
        }
        if visiting.contains(Visiting::LINKS) {
            stores.push(&self.links);
        }
        if visiting.contains(Visiting::STYLES) {
            stores.push(self.styles.rects());
        }
        if visiting.contains(Visiting::CONDITION_STYLES) {
            stores.push(&self.conditions);
        }
        if visiting.contains(Visiting::VALIDITIES) {
            stores.push(&self.validities);
        }

        let found = stores.into_iter().filter_map(|store| query(store));
        match nearest {
            Nearest::Min => found.min_by_key(|pos| (pos.row, pos.col)),
            Nearest::Max => found.max_by_key(|pos| (pos.row, pos.col)),
        }
    }

    // === Structural operations ===

    /// Insert `count` empty columns before `col`
    pub fn insert_columns(&mut self, col: u32, count: u32) {
        let (col, count) = clamp_band(col, count, crate::MAX_COLS);
        self.shift(Shift::InsertColumns(col, count));
    }

    /// Remove `count` columns starting at `col`
    pub fn remove_columns(&mut self, col: u32, count: u32) {
        let (col, count) = clamp_band(col, count, crate::MAX_COLS);
        self.shift(Shift::RemoveColumns(col, count));
    }

    /// Insert `count` empty rows before `row`
    pub fn insert_rows(&mut self, row: u32, count: u32) {
        let (row, count) = clamp_band(row, count, crate::MAX_ROWS);
        self.shift(Shift::InsertRows(row, count));
    }

    /// Remove `count` rows starting at `row`
    pub fn remove_rows(&mut self, row: u32, count: u32) {
        let (row, count) = clamp_band(row, count, crate::MAX_ROWS);
        self.shift(Shift::RemoveRows(row, count));
    }

    /// Move the cells at and right of `rect` right by its width, within its rows
    pub fn insert_shift_right(&mut self, rect: Rect) {
        self.shift(Shift::InsertShiftRight(rect.clamped()));
    }

    /// Delete `rect` and move the cells right of it left, within its rows
    pub fn remove_shift_left(&mut self, rect: Rect) {
        self.shift(Shift::RemoveShiftLeft(rect.clamped()));
    }

    /// Move the cells at and below `rect` down by its height, within its columns
    pub fn insert_shift_down(&mut self, rect: Rect) {
        self.shift(Shift::InsertShiftDown(rect.clamped()));
    }

    /// Delete `rect` and move the cells below it up, within its columns
    pub fn remove_shift_up(&mut self, rect: Rect) {
        self.shift(Shift::RemoveShiftUp(rect.clamped()));
    }

    fn shift(&mut self, shift: Shift) {
        tracing::trace!("{}: structural edit {:?}", self.sheet, shift);
        let removed_area = shift.removed_area();

        macro_rules! shift_points {
            ($($store:ident),*) => {
                $(
                    let lost = shift.apply_points(&mut self.$store);
                    if let Some(recorder) = self.undo.as_mut() {
                        recorder.$store.record_removed(lost);
                    }
                )*
            };
        }
        macro_rules! shift_rects {
            ($($store:ident),*) => {
                $(
                    if let (Some(recorder), Some(area)) = (self.undo.as_mut(), removed_area) {
                        recorder.$store.record(self.$store.undo_data(&area));
                    }
                    let lost = shift.apply_rects(&mut self.$store);
                    if let Some(recorder) = self.undo.as_mut() {
                        if removed_area.is_none() {
                            recorder.$store.record_removed(lost);
                        }
                    }
                )*
            };
        }

        shift_points!(values, formulas, links, user_inputs, rich_texts);
        shift_rects!(
            bindings,
            comments,
            conditions,
            databases,
            named_areas,
            fusions,
            matrices,
            validities
        );

        if let (Some(recorder), Some(area)) = (self.undo.as_mut(), removed_area) {
            recorder.styles.record(self.styles.undo_data(&area));
        }
        let lost = shift.apply_rects(self.styles.rects_mut());
        if let Some(recorder) = self.undo.as_mut() {
            if removed_area.is_none() {
                recorder.styles.record_removed(lost);
            }
        }
    }

    // === Undo ===

    /// Begin capturing pre-images of every mutation
    ///
    /// Recording does not nest; a second start while recording is an error
    /// and leaves the active recording untouched.
    pub fn start_undo_recording(&mut self) -> Result<()> {
        if self.undo.is_some() {
            tracing::warn!("{}: undo recording is already active", self.sheet);
            return Err(Error::UndoRecordingActive);
        }
        self.undo = Some(UndoRecorder::default());
        Ok(())
    }

    /// Finish capturing, attaching one child per changed store to `parent`
    pub fn stop_undo_recording(&mut self, parent: &mut CompositeUndo) {
        let Some(recorder) = self.undo.take() else {
            tracing::warn!("{}: no undo recording to stop", self.sheet);
            return;
        };
        for child in recorder.into_children() {
            tracing::trace!("{}: recorded {} changes", self.sheet, child.store_name());
            parent.push(child);
        }
    }

    /// Whether undo recording is active
    pub fn is_recording(&self) -> bool {
        self.undo.is_some()
    }

    /// Write back the pre-images recorded in `composite`, latest first
    pub fn undo(&mut self, composite: &CompositeUndo) {
        for child in composite.children().iter().rev() {
            self.apply_delta(child);
        }
    }

    /// Apply one store delta, returning the delta that reverts it
    pub(crate) fn apply_delta(&mut self, delta: &UndoDelta) -> UndoDelta {
        match delta {
            UndoDelta::Values(d) => UndoDelta::Values(d.apply(&mut self.values)),
            UndoDelta::Formulas(d) => UndoDelta::Formulas(d.apply(&mut self.formulas)),
            UndoDelta::Links(d) => UndoDelta::Links(d.apply(&mut self.links)),
            UndoDelta::UserInputs(d) => UndoDelta::UserInputs(d.apply(&mut self.user_inputs)),
            UndoDelta::RichTexts(d) => UndoDelta::RichTexts(d.apply(&mut self.rich_texts)),
            UndoDelta::Bindings(d) => UndoDelta::Bindings(d.apply(&mut self.bindings)),
            UndoDelta::Comments(d) => UndoDelta::Comments(d.apply(&mut self.comments)),
            UndoDelta::Conditions(d) => UndoDelta::Conditions(d.apply(&mut self.conditions)),
            UndoDelta::Databases(d) => UndoDelta::Databases(d.apply(&mut self.databases)),
            UndoDelta::NamedAreas(d) => UndoDelta::NamedAreas(d.apply(&mut self.named_areas)),
            UndoDelta::Fusions(d) => UndoDelta::Fusions(d.apply(&mut self.fusions)),
            UndoDelta::Matrices(d) => UndoDelta::Matrices(d.apply(&mut self.matrices)),
            UndoDelta::Styles(d) => UndoDelta::Styles(d.apply(self.styles.rects_mut())),
            UndoDelta::Validities(d) => UndoDelta::Validities(d.apply(&mut self.validities)),
        }
    }

    // === Substorage ===

    /// Independent copy of everything inside the region's bounding box
    ///
    /// Positions are renumbered so that the box's top-left is (1, 1).
    pub fn sub_storage(&self, region: &Region) -> CellStorage {
        let mut sub = CellStorage::new(self.sheet);
        let Some(rect) = region.bounding_rect() else {
            return sub;
        };
        sub.values = self.values.sub_store(&rect);
        sub.formulas = self.formulas.sub_store(&rect);
        sub.links = self.links.sub_store(&rect);
        sub.user_inputs = self.user_inputs.sub_store(&rect);
        sub.rich_texts = self.rich_texts.sub_store(&rect);
        sub.bindings = self.bindings.sub_storage(&rect);
        sub.comments = self.comments.sub_storage(&rect);
        sub.conditions = self.conditions.sub_storage(&rect);
        sub.databases = self.databases.sub_storage(&rect);
        sub.named_areas = self.named_areas.sub_storage(&rect);
        sub.fusions = self.fusions.sub_storage(&rect);
        sub.matrices = self.matrices.sub_storage(&rect);
        sub.styles = self.styles.sub_storage(&rect);
        sub.validities = self.validities.sub_storage(&rect);
        sub
    }
}

#[derive(Debug, Clone, Copy)]
enum Nearest {
    Min,
    Max,
}

/// Directional lookups shared by point and rect stores
trait Navigate {
    fn first_in_row(&self, row: u32) -> Option<Position>;
    fn next_in_row(&self, col: u32, row: u32) -> Option<Position>;
    fn last_in_row(&self, row: u32) -> Option<Position>;
    fn prev_in_row(&self, col: u32, row: u32) -> Option<Position>;
    fn first_in_column(&self, col: u32) -> Option<Position>;
    fn next_in_column(&self, col: u32, row: u32) -> Option<Position>;
    fn last_in_column(&self, col: u32) -> Option<Position>;
    fn prev_in_column(&self, col: u32, row: u32) -> Option<Position>;
}

macro_rules! impl_navigate {
    ($ty:ident) => {
        impl<T> Navigate for $ty<T> {
            fn first_in_row(&self, row: u32) -> Option<Position> {
                $ty::first_in_row(self, row)
            }
            fn next_in_row(&self, col: u32, row: u32) -> Option<Position> {
                $ty::next_in_row(self, col, row)
            }
            fn last_in_row(&self, row: u32) -> Option<Position> {
                $ty::last_in_row(self, row)
            }
            fn prev_in_row(&self, col: u32, row: u32) -> Option<Position> {
                $ty::prev_in_row(self, col, row)
            }
            fn first_in_column(&self, col: u32) -> Option<Position> {
                $ty::first_in_column(self, col)
            }
            fn next_in_column(&self, col: u32, row: u32) -> Option<Position> {
                $ty::next_in_column(self, col, row)
            }
            fn last_in_column(&self, col: u32) -> Option<Position> {
                $ty::last_in_column(self, col)
            }
            fn prev_in_column(&self, col: u32, row: u32) -> Option<Position> {
                $ty::prev_in_column(self, col, row)
            }
        }
    };
}

impl_navigate!(PositionKeyedStore);
impl_navigate!(RectStorage);

/// Store a string, clearing the position when it is empty
fn set_text(store: &mut PositionKeyedStore<String>, pos: Position, text: String) -> Option<String> {
    if text.is_empty() {
        store.take(pos)
    } else {
        store.set(pos, text)
    }
}

/// Replace the coverage of a rectangle, or just clear it for an empty payload
fn set_rect<T: Clone + PartialEq>(store: &mut RectStorage<T>, rect: Rect, value: T, empty: bool) {
    if empty {
        store.remove(&rect);
    } else {
        store.insert(rect, value);
    }
}

/// Clamp a row/column band into `1..=max`
fn clamp_band(at: u32, count: u32, max: u32) -> (u32, u32) {
    let at = at.clamp(1, max);
    (at, count.min(max - at + 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SHEET: SheetId = SheetId(1);

    fn region(s: &str) -> Region {
        Region::from_rect(Rect::parse(s).unwrap(), SHEET)
    }

    #[test]
    fn test_getters_return_defaults() {
        let storage = CellStorage::new(SHEET);
        assert_eq!(storage.value(3, 3), Value::Empty);
        assert!(storage.formula(3, 3).is_empty());
        assert_eq!(storage.comment(3, 3), "");
        assert!(storage.style(3, 3).is_default());
        assert!(storage.validity(3, 3).is_empty());
        assert!(storage.is_cell_empty(3, 3));
    }

    #[test]
    fn test_set_and_take() {
        let mut storage = CellStorage::new(SHEET);
        storage.set_value(1, 1, Value::from(5));
        storage.set_formula(1, 1, Formula::new("=2+3"));
        storage.set_link(1, 1, "https://example.com");
        assert!(!storage.is_cell_empty(1, 1));

        storage.take(1, 1);
        assert_eq!(storage.value(1, 1), Value::Empty);
        assert!(storage.formula(1, 1).is_empty());
        assert_eq!(storage.link(1, 1), "");
        assert!(storage.is_cell_empty(1, 1));
    }

    #[test]
    fn test_region_setters_skip_invalid_elements() {
        let mut storage = CellStorage::new(SHEET);
        let mut target = region("A1:B2");
        target.add(Rect::INVALID, SHEET);
        target.add(Rect::parse("D4").unwrap(), SheetId(7));
        target.add(Rect::parse("E5").unwrap(), SHEET);

        storage.set_comment(&target, "note");
        assert_eq!(storage.comment(2, 2), "note");
        assert_eq!(storage.comment(5, 5), "note");
        assert_eq!(storage.comment(4, 4), "");
    }

    #[test]
    fn test_merge_invariant() {
        let mut storage = CellStorage::new(SHEET);
        storage.merge_cells(2, 2, 1, 1);

        assert!(storage.is_part_of_merged(3, 2));
        assert!(storage.is_part_of_merged(2, 3));
        assert!(storage.is_part_of_merged(3, 3));
        assert_eq!(storage.master_cell(3, 3), storage.master_cell(2, 2));
        assert!(storage.does_merge_cells(2, 2));
        assert!(!storage.does_merge_cells(3, 3));
        assert_eq!(storage.merged_x_cells(2, 2), 1);
        assert_eq!(storage.merged_y_cells(2, 2), 1);
    }

    #[test]
    fn test_merge_replaces_overlapping_spans() {
        let mut storage = CellStorage::new(SHEET);
        storage.merge_cells(1, 1, 2, 0);
        storage.merge_cells(2, 1, 0, 2);

        assert!(!storage.does_merge_cells(1, 1));
        assert_eq!(storage.merged_area(2, 3), Some(Rect::new(2, 1, 2, 3)));
        assert_eq!(storage.merged_cells(&Rect::SHEET).len(), 1);

        storage.merge_cells(2, 1, 0, 0);
        assert!(storage.merged_area(2, 3).is_none());
    }

    #[test]
    fn test_visible_value_redirects_to_master() {
        let mut storage = CellStorage::new(SHEET);
        storage.set_value(2, 2, Value::from("master"));
        storage.merge_cells(2, 2, 1, 1);
        assert_eq!(storage.visible_value(3, 3), Value::from("master"));
        assert_eq!(storage.value(3, 3), Value::Empty);
    }

    #[test]
    fn test_lock_and_unlock() {
        let mut storage = CellStorage::new(SHEET);
        for pos in Rect::parse("B2:C3").unwrap().positions() {
            storage.set_value(pos.col, pos.row, Value::from(1));
        }
        storage.lock_cells(Rect::parse("B2:C3").unwrap());

        assert!(storage.locks_cells(2, 2));
        assert!(storage.is_locked(3, 3));
        assert!(!storage.is_locked(2, 2));
        assert_eq!(storage.locked_cells(3, 2), Some(Rect::new(2, 2, 3, 3)));
        assert!(storage.has_locked_cells(&region("C3:D4")));

        // Only the master releases the lock
        storage.unlock_cells(3, 3);
        assert!(storage.locks_cells(2, 2));

        storage.unlock_cells(2, 2);
        assert_eq!(storage.locked_cells(3, 3), None);
        assert_eq!(storage.value(2, 2), Value::from(1));
        assert_eq!(storage.value(3, 3), Value::Empty);
    }

    #[test]
    fn test_set_value_on_lock_master_unlocks() {
        let mut storage = CellStorage::new(SHEET);
        storage.set_value(3, 2, Value::from(2));
        storage.lock_cells(Rect::parse("B2:C2").unwrap());
        storage.set_value(2, 2, Value::from(9));
        assert!(!storage.locks_cells(2, 2));
        assert_eq!(storage.value(3, 2), Value::Empty);
    }

    #[test]
    fn test_visiting_mask() {
        let mut storage = CellStorage::new(SHEET);
        storage.set_style(&region("A3"), Style::new().with_bold(true));
        storage.set_value(2, 3, Value::from(1));

        assert_eq!(storage.first_in_row(3, Visiting::FORMULAS), None);
        assert_eq!(
            storage.first_in_row(3, Visiting::VALUES),
            Some(Position::new(2, 3))
        );
        assert_eq!(
            storage.first_in_row(3, Visiting::ALL),
            Some(Position::new(1, 3))
        );

        storage.set_formula(4, 3, Formula::new("=B3"));
        assert_eq!(
            storage.first_in_row(3, Visiting::FORMULAS),
            Some(Position::new(4, 3))
        );
        assert_eq!(
            storage.next_in_row(2, 3, Visiting::CONTENT),
            Some(Position::new(4, 3))
        );
        assert_eq!(
            storage.last_in_row(3, Visiting::CONTENT),
            Some(Position::new(4, 3))
        );
        assert_eq!(
            storage.prev_in_row(4, 3, Visiting::CONTENT),
            Some(Position::new(2, 3))
        );
    }

    #[test]
    fn test_visiting_columns() {
        let mut storage = CellStorage::new(SHEET);
        storage.set_value(2, 4, Value::from(1));
        storage.set_comment(&region("B7"), "x");

        assert_eq!(
            storage.first_in_column(2, Visiting::ALL),
            Some(Position::new(2, 4))
        );
        assert_eq!(
            storage.next_in_column(2, 4, Visiting::ALL),
            Some(Position::new(2, 7))
        );
        assert_eq!(storage.next_in_column(2, 4, Visiting::VALUES), None);
        assert_eq!(
            storage.last_in_column(2, Visiting::COMMENTS),
            Some(Position::new(2, 7))
        );
    }

    #[test]
    fn test_insert_remove_rows_round_trip() {
        let mut storage = CellStorage::new(SHEET);
        storage.set_value(1, 4, Value::from(4));
        storage.set_value(1, 5, Value::from(5));
        storage.set_value(2, 9, Value::from(9));
        storage.set_formula(2, 6, Formula::new("=A5"));
        storage.set_comment(&region("C5:C6"), "c");
        storage.set_style(&region("A4:D8"), Style::new().with_italic(true));
        storage.merge_cells(4, 5, 1, 1);

        let before = storage.clone();
        storage.insert_rows(5, 3);
        assert_eq!(storage.value(1, 8), Value::from(5));
        assert_eq!(storage.value(2, 12), Value::from(9));
        assert_eq!(storage.formula(2, 9), Formula::new("=A5"));
        assert_eq!(storage.comment(3, 9), "c");
        assert!(storage.does_merge_cells(4, 8));
        assert_eq!(storage.style(1, 6).italic, Some(true));

        storage.remove_rows(5, 3);
        for pos in Rect::parse("A1:E12").unwrap().positions() {
            let (col, row) = (pos.col, pos.row);
            assert_eq!(storage.value(col, row), before.value(col, row), "{}", pos);
            assert_eq!(storage.formula(col, row), before.formula(col, row));
            assert_eq!(storage.comment(col, row), before.comment(col, row));
            assert_eq!(storage.style(col, row), before.style(col, row));
            assert_eq!(storage.merged_area(col, row), before.merged_area(col, row));
        }
    }

    #[test]
    fn test_shift_operations() {
        let mut storage = CellStorage::new(SHEET);
        storage.set_value(2, 2, Value::from(1));
        storage.set_value(2, 5, Value::from(2));

        storage.insert_shift_right(Rect::parse("A2:B2").unwrap());
        assert_eq!(storage.value(4, 2), Value::from(1));
        assert_eq!(storage.value(2, 5), Value::from(2));

        storage.remove_shift_left(Rect::parse("A2:B2").unwrap());
        assert_eq!(storage.value(2, 2), Value::from(1));

        storage.insert_shift_down(Rect::parse("B1").unwrap());
        assert_eq!(storage.value(2, 3), Value::from(1));
        assert_eq!(storage.value(2, 6), Value::from(2));

        storage.remove_shift_up(Rect::parse("B1").unwrap());
        assert_eq!(storage.value(2, 2), Value::from(1));
        assert_eq!(storage.value(2, 5), Value::from(2));
    }

    #[test]
    fn test_structural_ops_clamp() {
        let mut storage = CellStorage::new(SHEET);
        storage.set_value(1, crate::MAX_ROWS, Value::from(1));
        storage.remove_rows(crate::MAX_ROWS + 10, 5);
        assert_eq!(storage.value(1, crate::MAX_ROWS), Value::Empty);
    }

    #[test]
    fn test_undo_recording_is_not_reentrant() {
        let mut storage = CellStorage::new(SHEET);
        assert!(storage.start_undo_recording().is_ok());
        assert!(matches!(
            storage.start_undo_recording(),
            Err(Error::UndoRecordingActive)
        ));
        assert!(storage.is_recording());
        let mut composite = CompositeUndo::new();
        storage.stop_undo_recording(&mut composite);
        assert!(!storage.is_recording());
        assert!(composite.is_empty());
    }

    #[test]
    fn test_composite_undo_redo() {
        let mut storage = CellStorage::new(SHEET);
        storage.set_value(1, 1, Value::from(1));

        storage.start_undo_recording().unwrap();
        storage.set_value(1, 1, Value::from(2));
        storage.set_value(1, 1, Value::from(3));
        storage.set_value(2, 2, Value::from("new"));
        storage.set_comment(&region("A1:B2"), "memo");
        let mut composite = CompositeUndo::new();
        storage.stop_undo_recording(&mut composite);

        // One child per changed store
        assert_eq!(composite.len(), 2);

        composite.undo(&mut storage);
        assert_eq!(storage.value(1, 1), Value::from(1));
        assert_eq!(storage.value(2, 2), Value::Empty);
        assert_eq!(storage.comment(1, 1), "");

        composite.redo(&mut storage);
        assert_eq!(storage.value(1, 1), Value::from(3));
        assert_eq!(storage.value(2, 2), Value::from("new"));
        assert_eq!(storage.comment(2, 2), "memo");

        composite.undo(&mut storage);
        assert_eq!(storage.value(1, 1), Value::from(1));
    }

    #[test]
    fn test_structural_undo_restores_removed_content() {
        let mut storage = CellStorage::new(SHEET);
        storage.set_value(1, 5, Value::from(5));
        storage.set_value(1, 9, Value::from(9));
        storage.set_comment(&region("A5:A9"), "span");
        storage.merge_cells(2, 6, 1, 0);

        storage.start_undo_recording().unwrap();
        storage.remove_rows(5, 3);
        let mut composite = CompositeUndo::new();
        storage.stop_undo_recording(&mut composite);

        assert_eq!(storage.value(1, 6), Value::from(9));
        assert!(storage.merged_area(2, 6).is_none());

        storage.insert_rows(5, 3);
        storage.undo(&composite);

        assert_eq!(storage.value(1, 5), Value::from(5));
        assert_eq!(storage.value(1, 9), Value::from(9));
        for row in 5..=9 {
            assert_eq!(storage.comment(1, row), "span");
        }
        assert_eq!(storage.merged_area(3, 6), Some(Rect::new(2, 6, 3, 6)));
    }

    #[test]
    fn test_value_region() {
        let mut storage = CellStorage::new(SHEET);
        storage.set_value(1, 1, Value::from(1));
        storage.set_value(2, 2, Value::from(4));

        let value = storage.value_region(&region("A1:B2"));
        assert_eq!(value.columns(), 2);
        assert_eq!(value.rows(), 2);
        assert_eq!(value.element(1, 1), Value::from(4));
        assert_eq!(value.element(1, 0), Value::Empty);

        // Whole columns clip to the used rows
        let column = storage.value_region(&region("A1:A1048576"));
        assert_eq!(column.rows(), 2);
    }

    #[test]
    fn test_value_region_over_sparse_sheet() {
        let mut storage = CellStorage::new(SHEET);
        storage.set_value(200, 1, Value::from(3));
        storage.set_value(1, 1_000_000, Value::from(4));

        // GR is column 200
        let value = storage.value_region(&region("A1:GR1000000"));
        assert_eq!(value.columns(), 200);
        assert_eq!(value.rows(), 1_000_000);
        assert_eq!(value.element(199, 0), Value::from(3));
        assert_eq!(value.element(0, 999_999), Value::from(4));
        match value {
            Value::Array(array) => assert_eq!(array.stored(), 2),
            other => panic!("expected an array, got {:?}", other),
        }
    }

    #[test]
    fn test_sub_storage_is_renumbered_copy() {
        let mut storage = CellStorage::new(SHEET);
        storage.set_value(3, 4, Value::from(7));
        storage.set_comment(&region("C4:D5"), "c");

        let sub = storage.sub_storage(&region("C4:E6"));
        assert_eq!(sub.value(1, 1), Value::from(7));
        assert_eq!(sub.comment(2, 2), "c");
        assert_eq!(sub.value(3, 4), Value::Empty);

        storage.set_value(3, 4, Value::from(8));
        assert_eq!(sub.value(1, 1), Value::from(7));
    }

    #[test]
    fn test_used_area() {
        let mut storage = CellStorage::new(SHEET);
        assert_eq!(storage.used_area(true), None);
        storage.set_value(2, 3, Value::from(1));
        storage.set_style(&region("F9"), Style::new().with_bold(true));

        assert_eq!(storage.used_area(false), Some(Rect::new(2, 3, 2, 3)));
        assert_eq!(storage.used_area(true), Some(Rect::new(2, 3, 6, 9)));
        assert_eq!(storage.columns(true), 6);
        assert_eq!(storage.rows(false), 3);
    }
}
