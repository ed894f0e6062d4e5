//! Sheet type

use crate::cell_storage::CellStorage;
use crate::error::{Error, Result};
use crate::format::{ColumnFormat, FormatTable, RowFormat};
use crate::region::SheetId;
use crate::settings::MapSettings;
use crate::{MAX_COLS, MAX_ROWS, MAX_SHEET_NAME_LEN};

/// A sheet: cell storage plus row and column formats
#[derive(Debug, Clone)]
pub struct Sheet {
    id: SheetId,
    name: String,
    auto_calc: bool,
    storage: CellStorage,
    row_formats: FormatTable<RowFormat>,
    column_formats: FormatTable<ColumnFormat>,
    default_row_height: f64,
    default_column_width: f64,
}

impl Sheet {
    /// Create an empty sheet with default settings
    pub fn new<S: Into<String>>(id: SheetId, name: S) -> Self {
        Self::with_settings(id, name, &MapSettings::default())
    }

    /// Create an empty sheet using the map's defaults
    pub fn with_settings<S: Into<String>>(id: SheetId, name: S, settings: &MapSettings) -> Self {
        Self {
            id,
            name: name.into(),
            auto_calc: settings.auto_calculation,
            storage: CellStorage::new(id),
            row_formats: FormatTable::new(MAX_ROWS),
            column_formats: FormatTable::new(MAX_COLS),
            default_row_height: settings.default_row_height,
            default_column_width: settings.default_column_width,
        }
    }

    pub fn id(&self) -> SheetId {
        self.id
    }

    /// Get the sheet name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set the sheet name (validity is checked by the map)
    pub fn set_name<S: Into<String>>(&mut self, name: S) {
        self.name = name.into();
    }

    pub fn is_auto_calculation_enabled(&self) -> bool {
        self.auto_calc
    }

    pub fn set_auto_calculation_enabled(&mut self, enabled: bool) {
        self.auto_calc = enabled;
    }

    pub fn storage(&self) -> &CellStorage {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut CellStorage {
        &mut self.storage
    }

    // === Row formats ===

    /// Row format, if it differs from the default
    pub fn non_default_row_format(&self, row: u32) -> Option<&RowFormat> {
        self.row_formats.non_default(row)
    }

    pub fn row_format(&self, row: u32) -> RowFormat {
        self.row_formats.get(row)
    }

    /// Replace a row format, returning the previous one
    pub fn set_row_format(&mut self, row: u32, format: RowFormat) -> RowFormat {
        self.row_formats.set(row, format)
    }

    pub fn row_formats(&self) -> &FormatTable<RowFormat> {
        &self.row_formats
    }

    /// Get row height (custom or default)
    pub fn row_height(&self, row: u32) -> f64 {
        self.row_formats
            .non_default(row)
            .and_then(|format| format.height)
            .unwrap_or(self.default_row_height)
    }

    pub fn set_row_height(&mut self, row: u32, height: f64) {
        let mut format = self.row_format(row);
        format.height = Some(height);
        self.set_row_format(row, format);
    }

    pub fn is_row_hidden(&self, row: u32) -> bool {
        self.row_formats
            .non_default(row)
            .is_some_and(RowFormat::is_hidden_or_filtered)
    }

    pub fn set_row_hidden(&mut self, row: u32, hidden: bool) {
        let mut format = self.row_format(row);
        format.hidden = hidden;
        self.set_row_format(row, format);
    }

    // === Column formats ===

    /// Column format, if it differs from the default
    pub fn non_default_column_format(&self, col: u32) -> Option<&ColumnFormat> {
        self.column_formats.non_default(col)
    }

    pub fn column_format(&self, col: u32) -> ColumnFormat {
        self.column_formats.get(col)
    }

    /// Replace a column format, returning the previous one
    pub fn set_column_format(&mut self, col: u32, format: ColumnFormat) -> ColumnFormat {
        self.column_formats.set(col, format)
    }

    pub fn column_formats(&self) -> &FormatTable<ColumnFormat> {
        &self.column_formats
    }

    /// Get column width (custom or default)
    pub fn column_width(&self, col: u32) -> f64 {
        self.column_formats
            .non_default(col)
            .and_then(|format| format.width)
            .unwrap_or(self.default_column_width)
    }

    pub fn set_column_width(&mut self, col: u32, width: f64) {
        let mut format = self.column_format(col);
        format.width = Some(width);
        self.set_column_format(col, format);
    }

    pub fn is_column_hidden(&self, col: u32) -> bool {
        self.column_formats
            .non_default(col)
            .is_some_and(ColumnFormat::is_hidden_or_filtered)
    }

    pub fn set_column_hidden(&mut self, col: u32, hidden: bool) {
        let mut format = self.column_format(col);
        format.hidden = hidden;
        self.set_column_format(col, format);
    }

    // === Structural operations on the format tables ===

    /// Shift row formats down; returns the formats pushed off the sheet
    pub fn insert_rows(&mut self, row: u32, count: u32) -> Vec<(u32, RowFormat)> {
        self.row_formats.insert(row, count)
    }

    /// Drop row formats and shift the rest up; returns the dropped formats
    pub fn remove_rows(&mut self, row: u32, count: u32) -> Vec<(u32, RowFormat)> {
        self.row_formats.remove(row, count)
    }

    pub fn insert_columns(&mut self, col: u32, count: u32) -> Vec<(u32, ColumnFormat)> {
        self.column_formats.insert(col, count)
    }

    pub fn remove_columns(&mut self, col: u32, count: u32) -> Vec<(u32, ColumnFormat)> {
        self.column_formats.remove(col, count)
    }
}

/// Check a sheet name for emptiness, length and forbidden characters
pub fn validate_sheet_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::InvalidSheetName("Sheet name cannot be empty".into()));
    }
    if name.chars().count() > MAX_SHEET_NAME_LEN {
        return Err(Error::InvalidSheetName(format!(
            "Sheet name too long (max {} characters)",
            MAX_SHEET_NAME_LEN
        )));
    }
    const INVALID_CHARS: &[char] = &[':', '\\', '/', '?', '*', '[', ']', '!', '\''];
    if let Some(c) = name.chars().find(|c| INVALID_CHARS.contains(c)) {
        return Err(Error::InvalidSheetName(format!(
            "Sheet name cannot contain '{}'",
            c
        )));
    }
    Ok(())
}
