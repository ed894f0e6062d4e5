//! Formula evaluator
//!
//! Evaluates an [`Expr`] against an [`EvaluationContext`]. Spreadsheet errors
//! (`#DIV/0!`, `#REF!`, ...) are ordinary values that flow through operators
//! and functions; `Err` is kept for failures of the formula itself, such as
//! an unknown function or a wrong argument count.

use crate::ast::{BinaryOp, Expr, UnaryOp};
use crate::error::{FormulaError, FormulaResult};
use crate::functions;
use gridcalc_core::{ErrorKind, Position, Rect, SheetId, Value, ValueArray};
use std::cmp::Ordering;

/// Source of cell values for evaluation
pub trait EvaluationContext {
    /// Value of one cell; `sheet` is `None` for the formula's own sheet
    fn value(&self, sheet: Option<&str>, pos: Position) -> Value;

    /// Values of a rectangle, as an array
    fn range(&self, sheet: Option<&str>, rect: Rect) -> Value;

    /// Value a name stands for, `None` if the name is not defined
    fn resolve_name(&self, name: &str) -> Option<Value>;

    /// Id of the sheet with this name
    fn sheet_id(&self, name: &str) -> Option<SheetId>;
}

/// Context without any cells: references read as empty and names are undefined
#[derive(Debug, Clone, Copy, Default)]
pub struct DetachedContext;

impl EvaluationContext for DetachedContext {
    fn value(&self, _sheet: Option<&str>, _pos: Position) -> Value {
        Value::Empty
    }

    fn range(&self, _sheet: Option<&str>, rect: Rect) -> Value {
        Value::Array(ValueArray::new(rect.width(), rect.height()))
    }

    fn resolve_name(&self, _name: &str) -> Option<Value> {
        None
    }

    fn sheet_id(&self, _name: &str) -> Option<SheetId> {
        None
    }
}

/// Evaluate an expression
pub fn evaluate(expr: &Expr, ctx: &dyn EvaluationContext) -> FormulaResult<Value> {
    match expr {
        // === Literals ===
        Expr::Number(n) => Ok(Value::Float(*n)),
        Expr::Text(s) => Ok(Value::string(s.as_str())),
        Expr::Boolean(b) => Ok(Value::Boolean(*b)),
        Expr::Error(e) => Ok(Value::Error(*e)),

        // === References ===
        Expr::Cell(cell) => {
            let sheet = cell.sheet.as_deref();
            if !sheet_resolves(sheet, ctx) {
                return Ok(Value::Error(ErrorKind::Ref));
            }
            Ok(ctx.value(sheet, cell.pos))
        }
        Expr::Range(range) => {
            let sheet = range.sheet.as_deref();
            if !sheet_resolves(sheet, ctx) {
                return Ok(Value::Error(ErrorKind::Ref));
            }
            Ok(ctx.range(sheet, range.rect))
        }
        Expr::Name(name) => Ok(ctx
            .resolve_name(name)
            .unwrap_or(Value::Error(ErrorKind::Name))),

        // === Operators ===
        Expr::Binary { op, lhs, rhs } => {
            let lhs = evaluate(lhs, ctx)?;
            let rhs = evaluate(rhs, ctx)?;
            Ok(broadcast(&lhs, &rhs, |l, r| binary(*op, l, r)))
        }
        Expr::Unary { op, operand } => {
            let operand = evaluate(operand, ctx)?;
            Ok(map_elements(&operand, |v| unary(*op, v)))
        }

        // === Functions ===
        Expr::Call { name, args } => call(name, args, ctx),

        // === Arrays ===
        Expr::Array(rows) => {
            let width = rows.first().map_or(0, Vec::len) as u32;
            let mut array = ValueArray::new(width, rows.len() as u32);
            for (r, row) in rows.iter().enumerate() {
                for (c, item) in row.iter().enumerate() {
                    array.set(c as u32, r as u32, evaluate(item, ctx)?.element(0, 0));
                }
            }
            Ok(Value::Array(array))
        }
    }
}

fn sheet_resolves(sheet: Option<&str>, ctx: &dyn EvaluationContext) -> bool {
    sheet.map_or(true, |name| ctx.sheet_id(name).is_some())
}

fn call(name: &str, args: &[Expr], ctx: &dyn EvaluationContext) -> FormulaResult<Value> {
    let def = functions::registry()
        .get(name)
        .ok_or_else(|| FormulaError::UnknownFunction(name.to_string()))?;

    if args.len() < def.min_args {
        return Err(FormulaError::ArgumentCount {
            function: name.to_string(),
            expected: format!("at least {}", def.min_args),
            actual: args.len(),
        });
    }
    if let Some(max) = def.max_args {
        if args.len() > max {
            return Err(FormulaError::ArgumentCount {
                function: name.to_string(),
                expected: format!("at most {}", max),
                actual: args.len(),
            });
        }
    }

    let values = args
        .iter()
        .map(|arg| evaluate(arg, ctx))
        .collect::<FormulaResult<Vec<_>>>()?;
    (def.implementation)(&values)
}

// === Element-wise helpers ===

/// Combine two values element by element
///
/// A single row or column is repeated along the other array's extent;
/// positions outside a smaller operand yield `#N/A`. Two scalars combine once.
/// A result too large to fill is `#NUM!`.
pub(crate) fn broadcast(lhs: &Value, rhs: &Value, f: impl Fn(&Value, &Value) -> Value) -> Value {
    if !lhs.is_array() && !rhs.is_array() {
        return f(lhs, rhs);
    }

    let columns = lhs.columns().max(rhs.columns());
    let rows = lhs.rows().max(rhs.rows());
    if !ValueArray::fits(columns, rows) {
        return Value::Error(ErrorKind::Num);
    }
    let mut out = ValueArray::new(columns, rows);
    for row in 0..rows {
        for col in 0..columns {
            let value = match (pick(lhs, col, row), pick(rhs, col, row)) {
                (Some(l), Some(r)) => f(&l, &r),
                _ => Value::Error(ErrorKind::Na),
            };
            out.set(col, row, value);
        }
    }
    Value::Array(out)
}

fn pick(value: &Value, col: u32, row: u32) -> Option<Value> {
    let col = if value.columns() == 1 { 0 } else { col };
    let row = if value.rows() == 1 { 0 } else { row };
    (col < value.columns() && row < value.rows()).then(|| value.element(col, row))
}

/// Apply `f` to a scalar, or to every element of an array
pub(crate) fn map_elements(value: &Value, f: impl Fn(&Value) -> Value) -> Value {
    match value {
        Value::Array(array) if !ValueArray::fits(array.columns(), array.rows()) => {
            Value::Error(ErrorKind::Num)
        }
        Value::Array(array) => {
            let mut out = ValueArray::new(array.columns(), array.rows());
            for row in 0..array.rows() {
                for col in 0..array.columns() {
                    out.set(col, row, f(&value.element(col, row)));
                }
            }
            Value::Array(out)
        }
        scalar => f(scalar),
    }
}

/// Numeric view of a value for arithmetic
///
/// Numeric text converts; other text is `#VALUE!`. An array contributes its
/// first element.
pub(crate) fn to_number(value: &Value) -> Result<f64, ErrorKind> {
    match value {
        Value::Error(e) => Err(*e),
        Value::String(s) => s.as_str().trim().parse::<f64>().map_err(|_| ErrorKind::Value),
        Value::Array(_) => to_number(&value.element(0, 0)),
        other => other.as_f64().ok_or(ErrorKind::Value),
    }
}

fn binary(op: BinaryOp, lhs: &Value, rhs: &Value) -> Value {
    if let Some(e) = lhs.error().or_else(|| rhs.error()) {
        return Value::Error(e);
    }

    let arithmetic: fn(f64, f64) -> f64 = match op {
        BinaryOp::Add => |a, b| a + b,
        BinaryOp::Sub => |a, b| a - b,
        BinaryOp::Mul => |a, b| a * b,
        BinaryOp::Div => |a, b| a / b,
        BinaryOp::Pow => f64::powf,
        BinaryOp::Concat => return Value::string(format!("{}{}", lhs, rhs)),
        BinaryOp::Eq => return Value::Boolean(compare(lhs, rhs) == Ordering::Equal),
        BinaryOp::Ne => return Value::Boolean(compare(lhs, rhs) != Ordering::Equal),
        BinaryOp::Lt => return Value::Boolean(compare(lhs, rhs) == Ordering::Less),
        BinaryOp::Le => return Value::Boolean(compare(lhs, rhs) != Ordering::Greater),
        BinaryOp::Gt => return Value::Boolean(compare(lhs, rhs) == Ordering::Greater),
        BinaryOp::Ge => return Value::Boolean(compare(lhs, rhs) != Ordering::Less),
    };

    let (a, b) = match (to_number(lhs), to_number(rhs)) {
        (Ok(a), Ok(b)) => (a, b),
        (Err(e), _) | (_, Err(e)) => return Value::Error(e),
    };
    if op == BinaryOp::Div && b == 0.0 {
        return Value::Error(ErrorKind::Div0);
    }
    let result = arithmetic(a, b);
    if result.is_finite() {
        Value::Float(result)
    } else {
        Value::Error(ErrorKind::Num)
    }
}

fn unary(op: UnaryOp, value: &Value) -> Value {
    match to_number(value) {
        Ok(n) => Value::Float(match op {
            UnaryOp::Negate => -n,
            UnaryOp::Plus => n,
            UnaryOp::Percent => n / 100.0,
        }),
        Err(e) => Value::Error(e),
    }
}

/// Comparison key: numbers sort before text, text before booleans
enum Key {
    Number(f64),
    Text(String),
    Bool(bool),
}

impl Key {
    fn of(value: &Value, other: &Value) -> Self {
        match value {
            // an empty cell compares as the zero value of the other side's type
            Value::Empty => match other {
                Value::String(_) => Key::Text(String::new()),
                Value::Boolean(_) => Key::Bool(false),
                _ => Key::Number(0.0),
            },
            Value::String(s) => Key::Text(s.as_str().to_lowercase()),
            Value::Boolean(b) => Key::Bool(*b),
            other => Key::Number(other.as_f64().unwrap_or(0.0)),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Key::Number(_) => 0,
            Key::Text(_) => 1,
            Key::Bool(_) => 2,
        }
    }
}

fn compare(lhs: &Value, rhs: &Value) -> Ordering {
    match (Key::of(lhs, rhs), Key::of(rhs, lhs)) {
        (Key::Number(a), Key::Number(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
        (Key::Text(a), Key::Text(b)) => a.cmp(&b),
        (Key::Bool(a), Key::Bool(b)) => a.cmp(&b),
        (a, b) => a.rank().cmp(&b.rank()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_formula;
    use pretty_assertions::assert_eq;

    /// A1 = 1, A2 = 2, B1 = "text", names: Rate = 0.5
    struct Grid;

    impl EvaluationContext for Grid {
        fn value(&self, _sheet: Option<&str>, pos: Position) -> Value {
            match (pos.col, pos.row) {
                (1, 1) => Value::Integer(1),
                (1, 2) => Value::Integer(2),
                (2, 1) => Value::string("text"),
                _ => Value::Empty,
            }
        }

        fn range(&self, sheet: Option<&str>, rect: Rect) -> Value {
            let mut array = ValueArray::new(rect.width(), rect.height());
            for pos in rect.positions() {
                array.set(pos.col - rect.left, pos.row - rect.top, self.value(sheet, pos));
            }
            Value::Array(array)
        }

        fn resolve_name(&self, name: &str) -> Option<Value> {
            name.eq_ignore_ascii_case("rate").then_some(Value::Float(0.5))
        }

        fn sheet_id(&self, name: &str) -> Option<SheetId> {
            (name == "Sheet1").then_some(SheetId(1))
        }
    }

    fn eval(formula: &str) -> Value {
        let expr = parse_formula(formula).unwrap();
        evaluate(&expr, &Grid).unwrap()
    }

    #[test]
    fn test_evaluate_arithmetic() {
        assert_eq!(eval("=1+2*3"), Value::Float(7.0));
        assert_eq!(eval("=(1+2)*3"), Value::Float(9.0));
        assert_eq!(eval("=2^10"), Value::Float(1024.0));
        assert_eq!(eval("=-5+50%"), Value::Float(-4.5));
        assert_eq!(eval("=\"4\"*2"), Value::Float(8.0));
    }

    #[test]
    fn test_evaluate_references() {
        assert_eq!(eval("=A1+A1+A2"), Value::Float(4.0));
        assert_eq!(eval("=Sheet1!A2*Rate"), Value::Float(1.0));
        assert_eq!(eval("=Missing!A1"), Value::Error(ErrorKind::Ref));
        assert_eq!(eval("=Unknown+1"), Value::Error(ErrorKind::Name));
    }

    #[test]
    fn test_errors_are_values() {
        assert_eq!(eval("=1/0"), Value::Error(ErrorKind::Div0));
        assert_eq!(eval("=B1+1"), Value::Error(ErrorKind::Value));
        assert_eq!(eval("=#N/A+1"), Value::Error(ErrorKind::Na));
        assert_eq!(eval("=(1/0)&\"x\""), Value::Error(ErrorKind::Div0));
    }

    #[test]
    fn test_comparison_and_concat() {
        assert_eq!(eval("=A1<A2"), Value::Boolean(true));
        assert_eq!(eval("=\"abc\"=\"ABC\""), Value::Boolean(true));
        assert_eq!(eval("=1<\"a\""), Value::Boolean(true));
        assert_eq!(eval("=C9=0"), Value::Boolean(true));
        assert_eq!(eval("=A2&\"x\""), Value::string("2x"));
    }

    #[test]
    fn test_array_broadcast() {
        let value = eval("={1,2;3,4}*10");
        assert_eq!(value.columns(), 2);
        assert_eq!(value.rows(), 2);
        assert_eq!(value.element(1, 1), Value::Float(40.0));

        // a row repeats down a 2x2 operand
        let value = eval("={1,2;3,4}+{10,20}");
        assert_eq!(value.element(0, 1), Value::Float(13.0));
        assert_eq!(value.element(1, 1), Value::Float(24.0));

        let value = eval("={1,2,3}+{1,2}");
        assert_eq!(value.element(2, 0), Value::Error(ErrorKind::Na));

        let value = eval("=-A1:A2");
        assert_eq!(value.element(0, 1), Value::Float(-2.0));
    }

    #[test]
    fn test_oversized_element_results() {
        let eval_detached = |text: &str| evaluate(&parse_formula(text).unwrap(), &DetachedContext).unwrap();
        assert_eq!(eval_detached("=A1:GR1048576*2"), Value::Error(ErrorKind::Num));
        assert_eq!(eval_detached("=-A1:GR1048576"), Value::Error(ErrorKind::Num));
        assert_eq!(eval_detached("=SUM(A1:GR1048576)"), Value::Float(0.0));
        assert_eq!(eval_detached("=A1:B2*2").element(1, 1), Value::Float(0.0));
    }

    #[test]
    fn test_call_failures() {
        let expr = parse_formula("=NOSUCH(1)").unwrap();
        assert_eq!(
            evaluate(&expr, &Grid),
            Err(FormulaError::UnknownFunction("NOSUCH".into()))
        );

        let expr = parse_formula("=ABS(1,2)").unwrap();
        assert!(matches!(
            evaluate(&expr, &Grid),
            Err(FormulaError::ArgumentCount { actual: 2, .. })
        ));
    }
}
