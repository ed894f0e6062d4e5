//! Prelude module - common imports for gridcalc users
//!
//! ```rust
//! use gridcalc::prelude::*;
//! ```

pub use crate::{
    // Commands
    AdjustColumnRowCommand,
    Command,
    // Error types
    Error,
    HideShowCommand,
    InsertDeleteColumnCommand,
    InsertDeleteRowCommand,
    InsertShiftCommand,
    MacroCommand,
    // Main types
    Map,
    MergeCommand,
    // Recalculation
    RecalcOptions,
    RecalcStats,
    RemoveShiftCommand,
    ResizeColumnCommand,
    ResizeRowCommand,
    Result,
};

pub use gridcalc_core::{
    CellKey, DamageEvent, DamageKind, ErrorKind, MapSettings, Position, Rect, Region, SheetId,
    Value, Visiting,
};
