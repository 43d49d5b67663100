use crate::error::{Result, WarehouseError};
use crate::value::Value;

pub(super) fn coerce(value: Value) -> Value {
    match value {
        Value::Number(_) => Value::String(value.to_string()),
        other => other,
    }
}

pub(super) fn validate(name: &str, value: Value) -> Result<Value> {
    match &value {
        Value::String(s) if !s.is_empty() => Ok(value),
        other => Err(WarehouseError::validation(
            name,
            format!("`{other}` is not a valid id!"),
        )),
    }
}
