//! Functions producing arrays
//!
//! A multi-cell result spills into the cells right and below the formula cell.

use crate::error::FormulaResult;
use crate::evaluator::to_number;
use gridcalc_core::{ErrorKind, Value, ValueArray, MAX_COLS, MAX_ROWS};

/// TRANSPOSE function
pub fn fn_transpose(args: &[Value]) -> FormulaResult<Value> {
    let source = &args[0];
    let Value::Array(array) = source else {
        return Ok(source.clone());
    };
    let mut out = ValueArray::new(array.rows(), array.columns());
    for (col, row, value) in array.entries() {
        out.set(row, col, value.clone());
    }
    Ok(Value::Array(out))
}

fn matrix(value: &Value) -> Result<Vec<Vec<f64>>, ErrorKind> {
    (0..value.rows())
        .map(|row| {
            (0..value.columns())
                .map(|col| match value.element(col, row) {
                    Value::Error(e) => Err(e),
                    item if item.is_number() => to_number(&item),
                    _ => Err(ErrorKind::Value),
                })
                .collect()
        })
        .collect()
}

/// MMULT function; the left operand's width must equal the right one's height
pub fn fn_mmult(args: &[Value]) -> FormulaResult<Value> {
    let (lhs, rhs) = (&args[0], &args[1]);
    if lhs.columns() != rhs.rows() {
        return Ok(Value::Error(ErrorKind::Value));
    }
    let fits = |value: &Value| ValueArray::fits(value.columns(), value.rows());
    if !fits(lhs) || !fits(rhs) || !ValueArray::fits(rhs.columns(), lhs.rows()) {
        return Ok(Value::Error(ErrorKind::Num));
    }
    let (a, b) = match (matrix(lhs), matrix(rhs)) {
        (Ok(a), Ok(b)) => (a, b),
        (Err(e), _) | (_, Err(e)) => return Ok(Value::Error(e)),
    };

    let mut out = ValueArray::new(rhs.columns(), lhs.rows());
    for (r, row) in a.iter().enumerate() {
        for c in 0..rhs.columns() as usize {
            let dot: f64 = row.iter().zip(&b).map(|(x, b_row)| x * b_row[c]).sum();
            out.set(c as u32, r as u32, Value::Float(dot));
        }
    }
    Ok(Value::Array(out))
}

/// SEQUENCE(rows, [columns], [start], [step])
pub fn fn_sequence(args: &[Value]) -> FormulaResult<Value> {
    let arg = |index: usize, default: f64| match args.get(index) {
        None | Some(Value::Empty) => Ok(default),
        Some(value) => to_number(value),
    };
    let (rows, columns, start, step) = match (arg(0, 1.0), arg(1, 1.0), arg(2, 1.0), arg(3, 1.0)) {
        (Ok(r), Ok(c), Ok(s), Ok(t)) => (r.trunc(), c.trunc(), s, t),
        (Err(e), ..) | (_, Err(e), ..) | (_, _, Err(e), _) | (.., Err(e)) => {
            return Ok(Value::Error(e))
        }
    };
    if rows < 1.0 || columns < 1.0 {
        return Ok(Value::Error(ErrorKind::Value));
    }
    if rows > MAX_ROWS as f64 || columns > MAX_COLS as f64 {
        return Ok(Value::Error(ErrorKind::Num));
    }
    let (rows, columns) = (rows as u32, columns as u32);
    if !ValueArray::fits(columns, rows) {
        return Ok(Value::Error(ErrorKind::Num));
    }

    let mut out = ValueArray::new(columns, rows);
    for row in 0..rows {
        for col in 0..columns {
            let index = (row as f64) * (columns as f64) + col as f64;
            out.set(col, row, Value::Float(start + step * index));
        }
    }
    Ok(Value::Array(out))
}
