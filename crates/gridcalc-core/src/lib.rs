//! # gridcalc-core
//!
//! Cell storage and dependency tracking for the gridcalc spreadsheet engine.
//!
//! This crate provides the data structures the recalculation engine works on:
//! - [`Position`], [`Rect`] and [`Region`] - 1-based cell addressing
//! - [`Value`] - cell values including errors and arrays
//! - [`PositionKeyedStore`] and [`RectStorage`] - sparse point and rectangle stores
//! - [`CellStorage`] - all attributes of one sheet, with undo recording
//! - [`DependencyGraph`] - formula providers, consumers and depths
//! - [`Sheet`] - cell storage plus row and column formats
//!
//! ## Example
//!
//! ```rust
//! use gridcalc_core::{CellStorage, Region, Rect, SheetId, Value, Visiting};
//!
//! let sheet = SheetId(1);
//! let mut storage = CellStorage::new(sheet);
//! storage.set_value(2, 3, Value::from(42));
//! storage.set_comment(&Region::from_rect(Rect::new(1, 1, 4, 4), sheet), "checked");
//!
//! assert_eq!(storage.value(2, 3), Value::from(42));
//! assert_eq!(storage.comment(4, 4), "checked");
//! assert_eq!(storage.first_in_row(3, Visiting::VALUES).map(|p| p.col), Some(2));
//! ```

pub mod attributes;
pub mod cell_storage;
pub mod damage;
pub mod dependency;
pub mod error;
pub mod format;
pub mod position;
pub mod region;
pub mod settings;
pub mod sheet;
pub mod store;
pub mod style;
pub mod undo;
pub mod value;

// Re-exports for convenience
pub use attributes::{
    Binding, Comparison, Condition, Conditions, Database, Formula, Restriction, Validity,
};
pub use cell_storage::{CellStorage, Visiting};
pub use damage::{DamageEvent, DamageKind, DamageQueue, DamageSink};
pub use dependency::DependencyGraph;
pub use error::{Error, Result};
pub use format::{ColumnFormat, FormatTable, RowFormat};
pub use position::{column_to_letters, letters_to_column, Position, Rect};
pub use region::{CellKey, Region, RegionElement, SheetId};
pub use settings::MapSettings;
pub use sheet::{validate_sheet_name, Sheet};
pub use store::{PositionKeyedStore, RectStorage, RectUndo};
pub use style::{
    BorderLineStyle, BorderPen, Color, HorizontalAlignment, Style, StyleId, StylePool,
    StyleStorage, VerticalAlignment,
};
pub use undo::{CompositeUndo, PointDelta, RectDelta, UndoDelta};
pub use value::{ErrorKind, SharedString, Value, ValueArray};

/// Maximum number of rows in a sheet
pub const MAX_ROWS: u32 = 1_048_576;

/// Maximum number of columns in a sheet
pub const MAX_COLS: u32 = 32_767;

/// Maximum number of elements a formula may fill one by one
///
/// Larger array results evaluate to `#NUM!`.
pub const MAX_ARRAY_CELLS: u64 = 4_194_304;

/// Maximum length of a sheet name
pub const MAX_SHEET_NAME_LEN: usize = 31;
