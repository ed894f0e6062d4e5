//! Formula error types

use gridcalc_core::ErrorKind;
use thiserror::Error;

/// Errors raised while parsing or evaluating a formula
///
/// These never escape to storage: [`FormulaError::error_kind`] maps each one
/// to the error value written into the cell.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormulaError {
    /// Syntax error in formula text
    #[error("Parse error: {0}")]
    Parse(String),

    /// Function name not known to the registry
    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    /// Wrong number of arguments
    #[error("{function} expects {expected} arguments, got {actual}")]
    ArgumentCount {
        function: String,
        expected: String,
        actual: usize,
    },

    /// Reference that cannot be resolved
    #[error("Invalid reference: {0}")]
    InvalidReference(String),

    /// Generic evaluation failure
    #[error("Evaluation error: {0}")]
    Evaluation(String),
}

impl FormulaError {
    pub fn parse<S: Into<String>>(msg: S) -> Self {
        FormulaError::Parse(msg.into())
    }

    /// Error value a cell shows for this failure
    pub fn error_kind(&self) -> ErrorKind {
        match self {
            FormulaError::Parse(_) => ErrorKind::Parse,
            FormulaError::UnknownFunction(_) => ErrorKind::Name,
            FormulaError::ArgumentCount { .. } => ErrorKind::Value,
            FormulaError::InvalidReference(_) => ErrorKind::Ref,
            FormulaError::Evaluation(_) => ErrorKind::Value,
        }
    }
}

/// Result type for formula operations
pub type FormulaResult<T> = std::result::Result<T, FormulaError>;
