//! Attribute stores
//!
//! - [`PositionKeyedStore`] - sparse point storage (values, formulas, links, ...)
//! - [`RectStorage`] - rectangle-scoped storage (comments, merges, validities, ...)

mod point;
mod rect;

pub use point::PositionKeyedStore;
pub use rect::{RectStorage, RectUndo};
