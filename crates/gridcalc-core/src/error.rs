//! Error types for gridcalc-core

use thiserror::Error;

use crate::region::SheetId;

/// Result type alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in gridcalc-core
///
/// Data-driven conditions (bad formulas, unresolved regions, cycles) never surface here;
/// they degrade to sentinel values. These variants cover API misuse only.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid cell address format
    #[error("Invalid cell address: {0}")]
    InvalidAddress(String),

    /// Invalid cell range format
    #[error("Invalid cell range: {0}")]
    InvalidRange(String),

    /// Sheet id does not belong to the map
    #[error("Unknown sheet: {0}")]
    UnknownSheet(SheetId),

    /// Sheet not found by name
    #[error("Sheet not found: {0}")]
    SheetNotFound(String),

    /// Invalid sheet name
    #[error("Invalid sheet name: {0}")]
    InvalidSheetName(String),

    /// Duplicate sheet name
    #[error("Sheet name already exists: {0}")]
    DuplicateSheetName(String),

    /// Invalid named area
    #[error("Invalid name: {0}")]
    InvalidName(String),

    /// `start_undo_recording` called while a recording is active
    #[error("Undo recording is already active")]
    UndoRecordingActive,

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a new "other" error with a message
    pub fn other<S: Into<String>>(msg: S) -> Self {
        Error::Other(msg.into())
    }
}
