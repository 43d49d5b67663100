use crate::error::{Result, WarehouseError};
use crate::value::Value;

pub(super) fn validate(name: &str, elements: &[Value], value: Value) -> Result<Value> {
    if elements.contains(&value) {
        return Ok(value);
    }
    let allowed: Vec<String> = elements.iter().map(ToString::to_string).collect();
    Err(WarehouseError::validation(
        name,
        format!("`{value}` should be one of: {}", allowed.join(", ")),
    ))
}
