//! # gridcalc-formula
//!
//! Formula parsing and evaluation for the gridcalc engine.
//!
//! ## Example
//!
//! ```rust
//! use gridcalc_formula::{DetachedContext, Formula};
//! use gridcalc_core::Value;
//!
//! let formula = Formula::new("=SUM(1, 2, 3) * 2");
//! assert!(formula.is_valid());
//! assert_eq!(formula.eval(&DetachedContext), Value::Float(12.0));
//! ```

pub mod adjust;
pub mod ast;
pub mod error;
pub mod evaluator;
pub mod formula;
pub mod functions;
pub mod parser;

pub use adjust::ReferenceChange;
pub use ast::{BinaryOp, CellRef, Expr, RangeRef, UnaryOp};
pub use error::{FormulaError, FormulaResult};
pub use evaluator::{evaluate, DetachedContext, EvaluationContext};
pub use formula::{Formula, References};
pub use functions::{registry, FunctionDef, FunctionRegistry};
pub use parser::parse_formula;
