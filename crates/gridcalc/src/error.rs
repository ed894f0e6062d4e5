//! Error types for the recalculation engine

use thiserror::Error;

/// Result type for map and command operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by [`Map`](crate::Map) and the commands
#[derive(Debug, Error)]
pub enum Error {
    /// Storage, addressing or naming error
    #[error(transparent)]
    Core(#[from] gridcalc_core::Error),

    /// Undo or redo before the command ran
    #[error("'{0}' has not been executed")]
    NotExecuted(String),

    /// A command was applied to an empty selection
    #[error("'{0}' needs a non-empty selection")]
    EmptySelection(String),
}
