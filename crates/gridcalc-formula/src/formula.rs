//! Parsed formulas
//!
//! [`Formula`] pairs formula text with its syntax tree, parsed on first use.
//! Storage keeps only the text; the recalculation engine wraps it here to
//! validate, extract references and evaluate.

use crate::adjust::ReferenceChange;
use crate::ast::Expr;
use crate::error::{FormulaError, FormulaResult};
use crate::evaluator::{evaluate, EvaluationContext};
use crate::parser::parse_formula;
use gridcalc_core::{Rect, Value};
use std::cell::OnceCell;
use std::fmt;

/// Formula text with a lazily parsed syntax tree
#[derive(Clone)]
pub struct Formula {
    text: String,
    parsed: OnceCell<FormulaResult<Expr>>,
}

/// Everything a formula reads
#[derive(Debug, Clone, Default, PartialEq)]
pub struct References {
    /// Referenced rectangles with their sheet qualifier (`None` = own sheet)
    pub ranges: Vec<(Option<String>, Rect)>,
    /// Referenced names, in order of first use
    pub names: Vec<String>,
}

impl References {
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty() && self.names.is_empty()
    }
}

impl Formula {
    pub fn new<S: Into<String>>(text: S) -> Self {
        Self {
            text: text.into(),
            parsed: OnceCell::new(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// The syntax tree, or the parse error
    pub fn expr(&self) -> FormulaResult<&Expr> {
        self.parsed
            .get_or_init(|| parse_formula(&self.text))
            .as_ref()
            .map_err(Clone::clone)
    }

    /// Whether the text parses
    pub fn is_valid(&self) -> bool {
        match self.expr() {
            Ok(_) => true,
            Err(err) => {
                tracing::debug!("invalid formula {:?}: {}", self.text, err);
                false
            }
        }
    }

    /// Cells, ranges and names the formula reads; empty for an invalid formula
    pub fn references(&self) -> References {
        let mut refs = References::default();
        let Ok(expr) = self.expr() else {
            return refs;
        };
        expr.walk(&mut |node| match node {
            Expr::Cell(cell) => refs
                .ranges
                .push((cell.sheet.clone(), Rect::from_position(cell.pos))),
            Expr::Range(range) => refs.ranges.push((range.sheet.clone(), range.rect)),
            Expr::Name(name) => {
                if !refs.names.iter().any(|n| n.eq_ignore_ascii_case(name)) {
                    refs.names.push(name.clone());
                }
            }
            _ => {}
        });
        refs
    }

    /// Formula text after a layout change, if any reference moved
    ///
    /// Invalid formulas are never rewritten.
    pub fn adjusted(
        &self,
        change: ReferenceChange,
        affects: &dyn Fn(Option<&str>) -> bool,
    ) -> Option<String> {
        let mut expr = self.expr().ok()?.clone();
        expr.adjust_references(change, affects)
            .then(|| format!("={}", expr))
    }

    /// Evaluate, turning every failure into an error value
    pub fn eval(&self, ctx: &dyn EvaluationContext) -> Value {
        let result = self.expr().and_then(|expr| evaluate(expr, ctx));
        result.unwrap_or_else(|err: FormulaError| {
            tracing::debug!("formula {:?} failed: {}", self.text, err);
            Value::Error(err.error_kind())
        })
    }
}

impl fmt::Debug for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Formula({:?})", self.text)
    }
}

impl From<&gridcalc_core::Formula> for Formula {
    fn from(formula: &gridcalc_core::Formula) -> Self {
        Formula::new(formula.expression())
    }
}

impl From<&str> for Formula {
    fn from(text: &str) -> Self {
        Formula::new(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::DetachedContext;
    use gridcalc_core::ErrorKind;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_references() {
        let formula = Formula::new("=SUM(A1:B2, Data!C3) + Rate * rate + 1");
        assert!(formula.is_valid());
        let refs = formula.references();
        assert_eq!(
            refs.ranges,
            vec![
                (None, Rect::new(1, 1, 2, 2)),
                (Some("Data".to_string()), Rect::new(3, 3, 3, 3)),
            ]
        );
        assert_eq!(refs.names, vec!["Rate".to_string()]);
    }

    #[test]
    fn test_invalid_formula() {
        let formula = Formula::new("=SUM(1,");
        assert!(!formula.is_valid());
        assert!(formula.references().is_empty());
        assert_eq!(formula.eval(&DetachedContext), Value::Error(ErrorKind::Parse));
    }

    #[test]
    fn test_eval_maps_failures() {
        assert_eq!(Formula::new("=1.0").eval(&DetachedContext), Value::Float(1.0));
        assert_eq!(
            Formula::new("=FOO(1)").eval(&DetachedContext),
            Value::Error(ErrorKind::Name)
        );
        assert_eq!(
            Formula::new("=NOT(1,2)").eval(&DetachedContext),
            Value::Error(ErrorKind::Value)
        );
    }

    #[test]
    fn test_adjusted_text() {
        let formula = Formula::new("=SUM(A1:A3)+'Q 1'!A2");
        let change = ReferenceChange::InsertRows { at: 2, count: 1 };
        assert_eq!(
            formula.adjusted(change, &|sheet| sheet.is_none()),
            Some("=SUM(A1:A4)+'Q 1'!A2".to_string())
        );
        assert_eq!(
            formula.adjusted(change, &|sheet| sheet == Some("Q 1")),
            Some("=SUM(A1:A3)+'Q 1'!A3".to_string())
        );
        assert_eq!(Formula::new("=1+").adjusted(change, &|_| true), None);
    }

    #[test]
    fn test_from_stored_formula() {
        let stored = gridcalc_core::Formula::new("=A1*2");
        let formula = Formula::from(&stored);
        assert_eq!(formula.text(), "=A1*2");
        assert_eq!(formula.references().ranges.len(), 1);
    }
}
