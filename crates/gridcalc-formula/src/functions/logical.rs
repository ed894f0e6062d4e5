//! Logical and information functions

use crate::error::FormulaResult;
use crate::evaluator::map_elements;
use gridcalc_core::{ErrorKind, Value};

/// Truth value of a scalar argument
fn truth(value: &Value) -> Result<bool, ErrorKind> {
    match value {
        Value::Error(e) => Err(*e),
        Value::String(s) => match s.as_str().to_ascii_uppercase().as_str() {
            "TRUE" => Ok(true),
            "FALSE" => Ok(false),
            _ => Err(ErrorKind::Value),
        },
        Value::Array(_) => truth(&value.element(0, 0)),
        other => other.as_bool().ok_or(ErrorKind::Value),
    }
}

/// IF function; a missing else branch yields FALSE
pub fn fn_if(args: &[Value]) -> FormulaResult<Value> {
    Ok(match truth(&args[0]) {
        Ok(true) => args[1].clone(),
        Ok(false) => args.get(2).cloned().unwrap_or(Value::Boolean(false)),
        Err(e) => Value::Error(e),
    })
}

/// Fold the truth values of all arguments; text and empty array elements are ignored
fn fold_truth(args: &[Value], init: bool, step: fn(bool, bool) -> bool) -> Value {
    let mut seen = false;
    let mut acc = init;
    for arg in args {
        let items: Vec<&Value> = match arg {
            Value::Array(array) => array
                .iter()
                .filter(|item| !matches!(item, Value::String(_) | Value::Empty))
                .collect(),
            scalar => vec![scalar],
        };
        for item in items {
            match truth(item) {
                Ok(b) => {
                    seen = true;
                    acc = step(acc, b);
                }
                Err(e) => return Value::Error(e),
            }
        }
    }
    if seen {
        Value::Boolean(acc)
    } else {
        Value::Error(ErrorKind::Value)
    }
}

/// AND function
pub fn fn_and(args: &[Value]) -> FormulaResult<Value> {
    Ok(fold_truth(args, true, |acc, b| acc && b))
}

/// OR function
pub fn fn_or(args: &[Value]) -> FormulaResult<Value> {
    Ok(fold_truth(args, false, |acc, b| acc || b))
}

/// NOT function
pub fn fn_not(args: &[Value]) -> FormulaResult<Value> {
    Ok(map_elements(&args[0], |value| match truth(value) {
        Ok(b) => Value::Boolean(!b),
        Err(e) => Value::Error(e),
    }))
}

/// ISERROR function
pub fn fn_iserror(args: &[Value]) -> FormulaResult<Value> {
    Ok(map_elements(&args[0], |value| Value::Boolean(value.is_error())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridcalc_core::ValueArray;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_if() {
        assert_eq!(
            fn_if(&[Value::from(1), Value::from("yes"), Value::from("no")]).unwrap(),
            Value::string("yes")
        );
        assert_eq!(
            fn_if(&[Value::Boolean(false), Value::from(1)]).unwrap(),
            Value::Boolean(false)
        );
        assert_eq!(
            fn_if(&[Value::Error(ErrorKind::Na), Value::from(1)]).unwrap(),
            Value::Error(ErrorKind::Na)
        );
    }

    #[test]
    fn test_and_or() {
        let range = Value::Array(ValueArray::from_rows(vec![vec![
            Value::Boolean(true),
            Value::string("skip"),
            Value::from(1),
        ]]));
        assert_eq!(fn_and(&[range.clone()]).unwrap(), Value::Boolean(true));
        assert_eq!(
            fn_and(&[range.clone(), Value::Boolean(false)]).unwrap(),
            Value::Boolean(false)
        );
        assert_eq!(fn_or(&[Value::from(0), Value::Empty]).unwrap(), Value::Boolean(false));
        assert_eq!(
            fn_or(&[Value::string("maybe")]).unwrap(),
            Value::Error(ErrorKind::Value)
        );
    }

    #[test]
    fn test_not_and_iserror() {
        assert_eq!(fn_not(&[Value::Boolean(true)]).unwrap(), Value::Boolean(false));
        assert_eq!(
            fn_iserror(&[Value::Error(ErrorKind::Div0)]).unwrap(),
            Value::Boolean(true)
        );
        assert_eq!(fn_iserror(&[Value::from(3)]).unwrap(), Value::Boolean(false));
    }
}
