//! # gridcalc
//!
//! A spreadsheet cell storage and recalculation engine.
//!
//! gridcalc keeps the cells of every sheet in sparse per-attribute stores,
//! tracks which formulas read which cells, and recalculates exactly the
//! formulas affected by an edit, in dependency order.
//!
//! ## Features
//!
//! - Sparse cell storage with merges, styles, comments and validities
//! - Dependency-ordered incremental recalculation
//! - Circular reference detection
//! - Array results spilled under lock rectangles
//! - Undoable row, column and cell-shift commands that keep references intact
//! - Damage events for a presentation layer
//!
//! ## Example
//!
//! ```rust
//! use gridcalc::prelude::*;
//!
//! let mut map = Map::new();
//! let sheet = map.add_sheet("Sheet1").unwrap();
//!
//! map.set_value(sheet, 1, 1, Value::from(20)).unwrap();
//! map.set_formula(sheet, 2, 1, "=A1*2").unwrap();
//! assert_eq!(map.value(sheet, 2, 1), Value::Float(40.0));
//!
//! // Dependent formulas follow their inputs
//! map.set_value(sheet, 1, 1, Value::from(5)).unwrap();
//! assert_eq!(map.value(sheet, 2, 1), Value::Float(10.0));
//!
//! // Structural edits are commands that can be undone
//! let mut insert = InsertDeleteRowCommand::new(Region::from_rect(Rect::rows(1, 1), sheet));
//! insert.execute(&mut map).unwrap();
//! assert_eq!(map.value(sheet, 1, 2), Value::from(5));
//! assert_eq!(map.formula(sheet, 2, 2).expression(), "=A2*2");
//! insert.undo(&mut map).unwrap();
//! assert_eq!(map.value(sheet, 1, 1), Value::from(5));
//! assert_eq!(map.value(sheet, 2, 1), Value::Float(10.0));
//! ```

pub mod commands;
mod context;
pub mod error;
pub mod map;
pub mod names;
pub mod prelude;
pub mod recalc;

pub use commands::{
    AdjustColumnRowCommand, Axis, Command, HideShowCommand, InsertDeleteColumnCommand,
    InsertDeleteRowCommand, InsertShiftCommand, MacroCommand, MergeCommand, RemoveShiftCommand,
    ResizeColumnCommand, ResizeRowCommand,
};
pub use error::{Error, Result};
pub use map::Map;
pub use names::{validate_name, NamedAreas};
pub use recalc::{ActiveGuard, RecalcManager, RecalcOptions, RecalcState, RecalcStats, RecalcTarget};
