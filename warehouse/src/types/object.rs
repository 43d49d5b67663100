use crate::error::{Result, WarehouseError};
use crate::value::Value;

pub(super) fn validate(name: &str, value: Value) -> Result<Value> {
    match value {
        Value::Object(_) => Ok(value),
        other => Err(WarehouseError::validation(
            name,
            format!("`{other}` is not an object!"),
        )),
    }
}
