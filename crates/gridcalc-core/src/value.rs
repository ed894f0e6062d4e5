//! Cell value types

use crate::position::Rect;
use crate::MAX_ARRAY_CELLS;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Represents the value stored in a cell
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Empty cell (no value)
    #[default]
    Empty,

    /// Boolean value (TRUE/FALSE)
    Boolean(bool),

    /// Integral number
    Integer(i64),

    /// Floating point number
    Float(f64),

    /// Complex number
    Complex { re: f64, im: f64 },

    /// String value
    String(SharedString),

    /// Error value (#VALUE!, #CIRCLE!, etc.)
    Error(ErrorKind),

    /// Two-dimensional array, the result of an array formula
    Array(ValueArray),

    /// An unresolved reference to a rectangle of cells
    CellRange(Rect),
}

impl Value {
    /// Create a new string value
    pub fn string<S: Into<String>>(s: S) -> Self {
        Value::String(SharedString::new(s.into()))
    }

    /// The circular reference sentinel
    pub fn error_circle() -> Self {
        Value::Error(ErrorKind::Circle)
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Value::Empty)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Value::Error(_))
    }

    /// Whether this is the circular reference sentinel
    pub fn is_circular(&self) -> bool {
        matches!(self, Value::Error(ErrorKind::Circle))
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Value::Integer(_) | Value::Float(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    /// Number of rows; 1 for scalars
    pub fn rows(&self) -> u32 {
        match self {
            Value::Array(array) => array.rows(),
            _ => 1,
        }
    }

    /// Number of columns; 1 for scalars
    pub fn columns(&self) -> u32 {
        match self {
            Value::Array(array) => array.columns(),
            _ => 1,
        }
    }

    /// Element at a 0-based (column, row) offset
    ///
    /// A scalar is its own single element; out-of-range offsets yield `Empty`.
    pub fn element(&self, col: u32, row: u32) -> Value {
        match self {
            Value::Array(array) => array.element(col, row).cloned().unwrap_or_default(),
            other if col == 0 && row == 0 => other.clone(),
            _ => Value::Empty,
        }
    }

    /// Error kind, if this is an error
    pub fn error(&self) -> Option<ErrorKind> {
        match self {
            Value::Error(e) => Some(*e),
            _ => None,
        }
    }

    /// Numeric view (booleans count as 0/1, empty as 0)
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            Value::Complex { re, im } if *im == 0.0 => Some(*re),
            Value::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::Empty => Some(0.0),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            Value::Integer(i) => Some(*i != 0),
            Value::Float(f) => Some(*f != 0.0),
            Value::Empty => Some(false),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Get the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Empty => "empty",
            Value::Boolean(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::Complex { .. } => "complex",
            Value::String(_) => "string",
            Value::Error(_) => "error",
            Value::Array(_) => "array",
            Value::CellRange(_) => "range",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Empty => Ok(()),
            Value::Boolean(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{}", n)
                }
            }
            Value::Complex { re, im } => write!(f, "{}{:+}i", re, im),
            Value::String(s) => write!(f, "{}", s),
            Value::Error(e) => write!(f, "{}", e),
            Value::Array(a) => write!(f, "{{{}x{}}}", a.rows(), a.columns()),
            Value::CellRange(r) => write!(f, "{}", r),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Integer(n as i64)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::string(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::string(s)
    }
}

impl From<ErrorKind> for Value {
    fn from(e: ErrorKind) -> Self {
        Value::Error(e)
    }
}

impl From<ValueArray> for Value {
    fn from(a: ValueArray) -> Self {
        Value::Array(a)
    }
}

/// Spreadsheet error kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// #NULL! - Intersection of two ranges that don't intersect
    Null,
    /// #DIV/0! - Division by zero
    Div0,
    /// #VALUE! - Wrong type of argument
    Value,
    /// #REF! - Invalid cell reference
    Ref,
    /// #NAME? - Unrecognized function or name
    Name,
    /// #NUM! - Invalid numeric value
    Num,
    /// #N/A - Value not available
    Na,
    /// #CIRCLE! - Circular reference
    Circle,
    /// #PARSE! - Formula could not be parsed
    Parse,
    /// #DEPEND! - Dependency could not be resolved
    Depend,
}

impl ErrorKind {
    /// Get the error string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Null => "#NULL!",
            ErrorKind::Div0 => "#DIV/0!",
            ErrorKind::Value => "#VALUE!",
            ErrorKind::Ref => "#REF!",
            ErrorKind::Name => "#NAME?",
            ErrorKind::Num => "#NUM!",
            ErrorKind::Na => "#N/A",
            ErrorKind::Circle => "#CIRCLE!",
            ErrorKind::Parse => "#PARSE!",
            ErrorKind::Depend => "#DEPEND!",
        }
    }

    /// Parse an error literal
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "#NULL!" => Some(ErrorKind::Null),
            "#DIV/0!" => Some(ErrorKind::Div0),
            "#VALUE!" => Some(ErrorKind::Value),
            "#REF!" => Some(ErrorKind::Ref),
            "#NAME?" => Some(ErrorKind::Name),
            "#NUM!" => Some(ErrorKind::Num),
            "#N/A" => Some(ErrorKind::Na),
            "#CIRCLE!" => Some(ErrorKind::Circle),
            "#PARSE!" => Some(ErrorKind::Parse),
            "#DEPEND!" => Some(ErrorKind::Depend),
            _ => None,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A rectangular array of values
///
/// Only non-empty elements are stored, so the size of an array is independent
/// of the memory it takes. Dense producers check [`ValueArray::fits`] before
/// filling an array element by element.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueArray {
    columns: u32,
    rows: u32,
    /// Keyed by (row, column) so iteration runs row by row
    cells: BTreeMap<(u32, u32), Value>,
}

static EMPTY: Value = Value::Empty;

impl ValueArray {
    /// Array of the given size with every element `Empty`
    pub fn new(columns: u32, rows: u32) -> Self {
        Self {
            columns: columns.max(1),
            rows: rows.max(1),
            cells: BTreeMap::new(),
        }
    }

    /// Build from nested rows; short rows are padded with `Empty`
    pub fn from_rows(rows: Vec<Vec<Value>>) -> Self {
        let height = rows.len().max(1) as u32;
        let width = rows.iter().map(Vec::len).max().unwrap_or(0).max(1) as u32;
        let mut array = Self::new(width, height);
        for (r, row) in rows.into_iter().enumerate() {
            for (c, value) in row.into_iter().enumerate() {
                array.set(c as u32, r as u32, value);
            }
        }
        array
    }

    /// Number of elements of an array of the given size
    pub fn cell_count(columns: u32, rows: u32) -> u64 {
        u64::from(columns.max(1)) * u64::from(rows.max(1))
    }

    /// Whether an array of the given size may be filled densely
    pub fn fits(columns: u32, rows: u32) -> bool {
        Self::cell_count(columns, rows) <= MAX_ARRAY_CELLS
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn columns(&self) -> u32 {
        self.columns
    }

    /// Number of non-empty elements
    pub fn stored(&self) -> usize {
        self.cells.len()
    }

    /// Element at a 0-based (column, row) offset
    pub fn element(&self, col: u32, row: u32) -> Option<&Value> {
        if col >= self.columns || row >= self.rows {
            return None;
        }
        Some(self.cells.get(&(row, col)).unwrap_or(&EMPTY))
    }

    /// Set the element at a 0-based (column, row) offset; out-of-range writes are ignored
    pub fn set(&mut self, col: u32, row: u32, value: Value) {
        if col >= self.columns || row >= self.rows {
            return;
        }
        if value.is_empty() {
            self.cells.remove(&(row, col));
        } else {
            self.cells.insert((row, col), value);
        }
    }

    /// Non-empty elements, row by row
    pub fn iter(&self) -> impl Iterator<Item = &Value> {
        self.cells.values()
    }

    /// Non-empty elements with their 0-based (column, row) offsets, row by row
    pub fn entries(&self) -> impl Iterator<Item = (u32, u32, &Value)> {
        self.cells.iter().map(|(&(row, col), value)| (col, row, value))
    }
}

/// A shared, immutable string
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SharedString(Arc<str>);

impl SharedString {
    /// Create a new shared string
    pub fn new<S: AsRef<str>>(s: S) -> Self {
        SharedString(Arc::from(s.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SharedString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", &*self.0)
    }
}

impl fmt::Display for SharedString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SharedString {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SharedString {
    fn from(s: &str) -> Self {
        SharedString::new(s)
    }
}

impl From<String> for SharedString {
    fn from(s: String) -> Self {
        SharedString::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_is_single_element() {
        let value = Value::from(3.5);
        assert!(!value.is_array());
        assert_eq!(value.rows(), 1);
        assert_eq!(value.columns(), 1);
        assert_eq!(value.element(0, 0), Value::Float(3.5));
        assert_eq!(value.element(1, 0), Value::Empty);
    }

    #[test]
    fn test_array_dimensions() {
        let array = ValueArray::from_rows(vec![
            vec![Value::from(1), Value::from(2), Value::from(3)],
            vec![Value::from(4)],
        ]);
        let value = Value::from(array);

        assert!(value.is_array());
        assert_eq!(value.columns(), 3);
        assert_eq!(value.rows(), 2);
        assert_eq!(value.element(2, 0), Value::Integer(3));
        assert_eq!(value.element(1, 1), Value::Empty);
    }

    #[test]
    fn test_large_array_stores_only_set_elements() {
        let mut array = ValueArray::new(5000, crate::MAX_ROWS);
        assert!(!ValueArray::fits(5000, crate::MAX_ROWS));
        assert_eq!(ValueArray::cell_count(5000, crate::MAX_ROWS), 5_242_880_000);

        array.set(4999, crate::MAX_ROWS - 1, Value::from(7));
        array.set(0, 0, Value::from(1));
        array.set(5000, 0, Value::from(9));
        assert_eq!(array.stored(), 2);
        assert_eq!(array.element(4999, crate::MAX_ROWS - 1), Some(&Value::from(7)));
        assert_eq!(array.element(10, 10), Some(&Value::Empty));
        assert_eq!(array.element(5000, 0), None);

        let entries: Vec<(u32, u32)> = array.entries().map(|(c, r, _)| (c, r)).collect();
        assert_eq!(entries, vec![(0, 0), (4999, crate::MAX_ROWS - 1)]);

        array.set(0, 0, Value::Empty);
        assert_eq!(array.stored(), 1);
    }

    #[test]
    fn test_error_circle_sentinel() {
        assert!(Value::error_circle().is_circular());
        assert_eq!(Value::error_circle(), Value::Error(ErrorKind::Circle));
        assert_eq!(ErrorKind::parse("#circle!"), Some(ErrorKind::Circle));
        assert_eq!(Value::error_circle().to_string(), "#CIRCLE!");
    }

    #[test]
    fn test_numeric_views() {
        assert_eq!(Value::Integer(4).as_f64(), Some(4.0));
        assert_eq!(Value::Boolean(true).as_f64(), Some(1.0));
        assert_eq!(Value::string("x").as_f64(), None);
        assert_eq!(Value::Float(2.0).to_string(), "2");
    }
}
