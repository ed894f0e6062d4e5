//! Math and aggregate functions

use crate::error::FormulaResult;
use crate::evaluator::{broadcast, map_elements, to_number};
use gridcalc_core::{ErrorKind, Value};

/// Numbers of an argument list
///
/// Array elements count only when numeric; scalar arguments convert, and text
/// that is not a number is skipped. The first error wins.
fn numbers(args: &[Value]) -> Result<Vec<f64>, ErrorKind> {
    let mut out = Vec::new();
    for arg in args {
        match arg {
            Value::Array(array) => {
                for item in array.iter() {
                    match item {
                        Value::Error(e) => return Err(*e),
                        Value::Integer(_) | Value::Float(_) => out.extend(item.as_f64()),
                        _ => {}
                    }
                }
            }
            Value::Error(e) => return Err(*e),
            Value::Empty => {}
            Value::String(_) => out.extend(to_number(arg).ok()),
            other => out.push(to_number(other)?),
        }
    }
    Ok(out)
}

fn aggregate(args: &[Value], fold: impl FnOnce(&[f64]) -> Value) -> FormulaResult<Value> {
    Ok(match numbers(args) {
        Ok(values) => fold(&values),
        Err(e) => Value::Error(e),
    })
}

/// SUM function
pub fn fn_sum(args: &[Value]) -> FormulaResult<Value> {
    aggregate(args, |values| Value::Float(values.iter().sum()))
}

/// AVERAGE function
pub fn fn_average(args: &[Value]) -> FormulaResult<Value> {
    aggregate(args, |values| {
        if values.is_empty() {
            Value::Error(ErrorKind::Div0)
        } else {
            Value::Float(values.iter().sum::<f64>() / values.len() as f64)
        }
    })
}

/// MIN function; 0 without numbers
pub fn fn_min(args: &[Value]) -> FormulaResult<Value> {
    aggregate(args, |values| {
        Value::Float(values.iter().copied().reduce(f64::min).unwrap_or(0.0))
    })
}

/// MAX function; 0 without numbers
pub fn fn_max(args: &[Value]) -> FormulaResult<Value> {
    aggregate(args, |values| {
        Value::Float(values.iter().copied().reduce(f64::max).unwrap_or(0.0))
    })
}

/// COUNT function: numbers only, errors are not counted
pub fn fn_count(args: &[Value]) -> FormulaResult<Value> {
    let mut count = 0i64;
    for arg in args {
        match arg {
            Value::Array(array) => {
                count += array.iter().filter(|item| item.is_number()).count() as i64;
            }
            Value::Integer(_) | Value::Float(_) | Value::Boolean(_) => count += 1,
            Value::String(_) if to_number(arg).is_ok() => count += 1,
            _ => {}
        }
    }
    Ok(Value::Integer(count))
}

/// ABS function
pub fn fn_abs(args: &[Value]) -> FormulaResult<Value> {
    Ok(map_elements(&args[0], |value| match to_number(value) {
        Ok(n) => Value::Float(n.abs()),
        Err(e) => Value::Error(e),
    }))
}

/// ROUND function, halves away from zero
pub fn fn_round(args: &[Value]) -> FormulaResult<Value> {
    let digits = args.get(1).cloned().unwrap_or(Value::Integer(0));
    Ok(broadcast(&args[0], &digits, |value, digits| {
        match (to_number(value), to_number(digits)) {
            (Ok(n), Ok(d)) => {
                let digits = d.trunc() as i32;
                let factor = 10f64.powi(digits.abs());
                Value::Float(if digits >= 0 {
                    (n * factor).round() / factor
                } else {
                    (n / factor).round() * factor
                })
            }
            (Err(e), _) | (_, Err(e)) => Value::Error(e),
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridcalc_core::ValueArray;
    use pretty_assertions::assert_eq;

    fn column(values: Vec<Value>) -> Value {
        Value::Array(ValueArray::from_rows(values.into_iter().map(|v| vec![v]).collect()))
    }

    #[test]
    fn test_sum_and_average() {
        let range = column(vec![Value::from(1), Value::string("x"), Value::from(2.5), Value::Empty]);
        assert_eq!(fn_sum(&[range.clone(), Value::from(1)]).unwrap(), Value::Float(4.5));
        assert_eq!(fn_average(&[range]).unwrap(), Value::Float(1.75));
        assert_eq!(
            fn_average(&[Value::Empty]).unwrap(),
            Value::Error(ErrorKind::Div0)
        );
    }

    #[test]
    fn test_errors_propagate_except_count() {
        let range = column(vec![Value::from(1), Value::Error(ErrorKind::Ref)]);
        assert_eq!(fn_sum(&[range.clone()]).unwrap(), Value::Error(ErrorKind::Ref));
        assert_eq!(fn_max(&[range.clone()]).unwrap(), Value::Error(ErrorKind::Ref));
        assert_eq!(fn_count(&[range]).unwrap(), Value::Integer(1));
    }

    #[test]
    fn test_min_max() {
        let args = [Value::from(3), Value::from(-2), Value::string("7")];
        assert_eq!(fn_min(&args).unwrap(), Value::Float(-2.0));
        assert_eq!(fn_max(&args).unwrap(), Value::Float(7.0));
        assert_eq!(fn_max(&[Value::Empty]).unwrap(), Value::Float(0.0));
    }

    #[test]
    fn test_round_and_abs() {
        assert_eq!(fn_round(&[Value::from(2.5)]).unwrap(), Value::Float(3.0));
        assert_eq!(fn_round(&[Value::from(-2.5)]).unwrap(), Value::Float(-3.0));
        assert_eq!(
            fn_round(&[Value::from(1234.5678), Value::from(-2)]).unwrap(),
            Value::Float(1200.0)
        );
        assert_eq!(fn_abs(&[Value::from(-4)]).unwrap(), Value::Float(4.0));
        assert_eq!(
            fn_abs(&[Value::string("a")]).unwrap(),
            Value::Error(ErrorKind::Value)
        );
    }
}
