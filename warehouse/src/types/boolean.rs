use crate::error::{Result, WarehouseError};
use crate::value::Value;

pub(super) fn coerce(value: Value) -> Value {
    match value {
        Value::Bool(_) => value,
        Value::String(s) => Value::Bool(!matches!(s.as_str(), "" | "false" | "0")),
        Value::Number(n) => Value::Bool(n != 0.0 && !n.is_nan()),
        other => Value::Bool(other.is_truthy()),
    }
}

pub(super) fn validate(name: &str, value: Value) -> Result<Value> {
    match value {
        Value::Bool(_) => Ok(value),
        other => Err(WarehouseError::validation(
            name,
            format!("`{other}` is not a boolean!"),
        )),
    }
}

pub(super) fn parse(value: Value) -> Value {
    coerce(value)
}

/// Booleans persist as 0/1.
pub(super) fn export(value: Value) -> Value {
    match value {
        Value::Bool(b) => Value::Number(if b { 1.0 } else { 0.0 }),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coerce_strings() {
        assert_eq!(coerce(Value::from("false")), Value::Bool(false));
        assert_eq!(coerce(Value::from("0")), Value::Bool(false));
        assert_eq!(coerce(Value::from("yes")), Value::Bool(true));
        assert_eq!(coerce(Value::Number(0.0)), Value::Bool(false));
    }

    #[test]
    fn test_export_parse() {
        assert_eq!(export(Value::Bool(true)), Value::Number(1.0));
        assert_eq!(parse(Value::Number(0.0)), Value::Bool(false));
        assert_eq!(parse(export(Value::Bool(false))), Value::Bool(false));
    }
}
