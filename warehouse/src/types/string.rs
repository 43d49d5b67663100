use crate::error::{Result, WarehouseError};
use crate::value::{format_date, Value};

pub(super) fn coerce(value: Value) -> Value {
    match value {
        Value::Number(_) | Value::Bool(_) => Value::String(value.to_string()),
        Value::Date(d) => Value::String(format_date(&d)),
        other => other,
    }
}

pub(super) fn validate(name: &str, value: Value) -> Result<Value> {
    match value {
        Value::String(_) => Ok(value),
        other => Err(WarehouseError::validation(
            name,
            format!("`{other}` is not a string!"),
        )),
    }
}

/// `$length`: character count of a string, element count of an array.
pub(super) fn length_is(value: &Value, operand: &Value) -> bool {
    let len = match value {
        Value::String(s) => s.chars().count(),
        Value::Array(items) => items.len(),
        _ => 0,
    };
    operand.as_f64() == Some(len as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coerce_numbers() {
        assert_eq!(coerce(Value::Number(3.0)), Value::from("3"));
        assert_eq!(coerce(Value::Number(1.5)), Value::from("1.5"));
        assert_eq!(coerce(Value::Bool(true)), Value::from("true"));
    }

    #[test]
    fn test_validate_rejects_numbers() {
        assert!(validate("title", Value::Number(1.0)).is_err());
        assert!(validate("title", Value::from("ok")).is_ok());
    }

    #[test]
    fn test_length() {
        assert!(length_is(&Value::from("héllo"), &Value::Number(5.0)));
        assert!(length_is(&Value::Null, &Value::Number(0.0)));
        assert!(!length_is(&Value::from("ab"), &Value::Number(3.0)));
    }
}
