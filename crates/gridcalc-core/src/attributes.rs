//! Per-cell attribute payloads
//!
//! These are the values held by the individual stores of a
//! [`CellStorage`](crate::CellStorage): formulas, validities, conditional
//! rules, database ranges and bindings. Comments, links, user input,
//! named-area labels and rich text are plain strings.

use crate::position::Rect;
use crate::value::Value;
use std::fmt;
use std::sync::Arc;

/// The source text of a formula, including the leading `=`
///
/// Storage treats formulas as opaque text; parsing, validation and
/// evaluation happen in the formula crate.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct Formula(Arc<str>);

impl Formula {
    /// Create a formula from its source text
    pub fn new<S: AsRef<str>>(text: S) -> Self {
        Formula(Arc::from(text.as_ref()))
    }

    /// The empty formula, returned for cells without one
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn expression(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Formula({:?})", &*self.0)
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Formula {
    fn from(s: &str) -> Self {
        Formula::new(s)
    }
}

/// Comparison used by validities and conditional rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Comparison {
    #[default]
    Equal,
    NotEqual,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
    Between,
    NotBetween,
}

impl Comparison {
    /// Test `value` against one or two operands
    pub fn matches(&self, value: f64, first: f64, second: f64) -> bool {
        let (lo, hi) = if first <= second {
            (first, second)
        } else {
            (second, first)
        };
        match self {
            Comparison::Equal => value == first,
            Comparison::NotEqual => value != first,
            Comparison::Less => value < first,
            Comparison::LessOrEqual => value <= first,
            Comparison::Greater => value > first,
            Comparison::GreaterOrEqual => value >= first,
            Comparison::Between => value >= lo && value <= hi,
            Comparison::NotBetween => value < lo || value > hi,
        }
    }
}

/// What kind of input a validity accepts
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Restriction {
    /// Anything
    #[default]
    None,
    /// Any number
    Number,
    /// Whole numbers
    Integer,
    /// Text whose length is compared
    TextLength,
    /// One of a fixed list
    List(Vec<String>),
}

/// Data validity rule for a range of cells
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Validity {
    pub restriction: Restriction,
    pub comparison: Comparison,
    pub minimum: f64,
    pub maximum: f64,
    pub allow_empty: bool,
    pub input_title: Option<String>,
    pub input_message: Option<String>,
    pub error_title: Option<String>,
    pub error_message: Option<String>,
}

impl Validity {
    /// A numeric validity with a comparison
    pub fn number(comparison: Comparison, minimum: f64, maximum: f64) -> Self {
        Self {
            restriction: Restriction::Number,
            comparison,
            minimum,
            maximum,
            allow_empty: true,
            ..Default::default()
        }
    }

    /// A list validity
    pub fn list<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            restriction: Restriction::List(items.into_iter().map(Into::into).collect()),
            allow_empty: true,
            ..Default::default()
        }
    }

    /// Set the error alert
    pub fn with_error_message<S: Into<String>>(mut self, title: S, message: S) -> Self {
        self.error_title = Some(title.into());
        self.error_message = Some(message.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.restriction == Restriction::None
    }

    /// Whether a value would be accepted
    pub fn test(&self, value: &Value) -> bool {
        if value.is_empty() {
            return self.allow_empty;
        }
        match &self.restriction {
            Restriction::None => true,
            Restriction::Number => value
                .as_f64()
                .filter(|_| value.is_number())
                .map_or(false, |n| self.comparison.matches(n, self.minimum, self.maximum)),
            Restriction::Integer => value
                .as_f64()
                .filter(|n| value.is_number() && n.fract() == 0.0)
                .map_or(false, |n| self.comparison.matches(n, self.minimum, self.maximum)),
            Restriction::TextLength => value.as_str().map_or(false, |s| {
                self.comparison
                    .matches(s.chars().count() as f64, self.minimum, self.maximum)
            }),
            Restriction::List(items) => {
                let text = value.to_string();
                items.iter().any(|item| *item == text)
            }
        }
    }
}

/// One conditional formatting rule
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub comparison: Comparison,
    pub first: Value,
    pub second: Value,
    /// Name of the style applied when the condition holds
    pub style_name: String,
}

impl Condition {
    pub fn new<S: Into<String>>(comparison: Comparison, first: Value, style_name: S) -> Self {
        Self {
            comparison,
            first,
            second: Value::Empty,
            style_name: style_name.into(),
        }
    }

    pub fn with_second(mut self, second: Value) -> Self {
        self.second = second;
        self
    }
}

/// Ordered conditional formatting rules of a range; the first match applies
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Conditions {
    pub rules: Vec<Condition>,
}

impl Conditions {
    pub fn new(rules: Vec<Condition>) -> Self {
        Self { rules }
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Style name of the first rule the value satisfies
    pub fn matching_style(&self, value: &Value) -> Option<&str> {
        let n = value.as_f64().filter(|_| value.is_number())?;
        self.rules
            .iter()
            .find(|rule| {
                let first = rule.first.as_f64().unwrap_or(0.0);
                let second = rule.second.as_f64().unwrap_or(first);
                rule.comparison.matches(n, first, second)
            })
            .map(|rule| rule.style_name.as_str())
    }
}

/// A named database range
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Database {
    pub name: String,
    pub range: Option<Rect>,
    /// First row holds column headers
    pub has_header: bool,
}

impl Database {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            range: None,
            has_header: true,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_empty() && self.range.is_none()
    }
}

/// Binding of a range to an external data source
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Binding {
    pub source: String,
}

impl Binding {
    pub fn new<S: Into<String>>(source: S) -> Self {
        Self {
            source: source.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.source.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validity_number() {
        let validity = Validity::number(Comparison::Between, 1.0, 10.0);
        assert!(validity.test(&Value::from(5)));
        assert!(!validity.test(&Value::from(11.0)));
        assert!(!validity.test(&Value::from("5")));
        assert!(validity.test(&Value::Empty));
    }

    #[test]
    fn test_validity_list() {
        let validity = Validity::list(["Yes", "No"]);
        assert!(validity.test(&Value::from("Yes")));
        assert!(!validity.test(&Value::from("Maybe")));
    }

    #[test]
    fn test_conditions_first_match_wins() {
        let conditions = Conditions::new(vec![
            Condition::new(Comparison::Greater, Value::from(10), "High"),
            Condition::new(Comparison::Greater, Value::from(0), "Positive"),
        ]);
        assert_eq!(conditions.matching_style(&Value::from(20)), Some("High"));
        assert_eq!(conditions.matching_style(&Value::from(5)), Some("Positive"));
        assert_eq!(conditions.matching_style(&Value::from(-1)), None);
    }

    #[test]
    fn test_formula_text() {
        assert!(Formula::empty().is_empty());
        assert_eq!(Formula::new("=A1+1").expression(), "=A1+1");
    }
}
