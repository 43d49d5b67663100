use super::UpdateOp;
use crate::error::{Result, WarehouseError};
use crate::value::Value;

pub(super) fn coerce(value: Value, integer: bool) -> Value {
    let n = match &value {
        Value::Number(n) => *n,
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::Date(d) => d.timestamp_millis() as f64,
        Value::String(s) => match s.trim().parse::<f64>() {
            Ok(n) => n,
            Err(_) => return value,
        },
        _ => return value,
    };
    Value::Number(if integer { n.trunc() } else { n })
}

pub(super) fn validate(name: &str, value: Value, integer: bool) -> Result<Value> {
    match value {
        Value::Number(n) if n.is_nan() => {
            Err(WarehouseError::validation(name, "`NaN` is not a number!"))
        }
        Value::Number(n) if integer && n.fract() != 0.0 => Err(WarehouseError::validation(
            name,
            format!("`{n}` is not an integer!"),
        )),
        Value::Number(_) => Ok(value),
        other => Err(WarehouseError::validation(
            name,
            format!("`{other}` is not a number!"),
        )),
    }
}

pub(super) fn update(name: &str, op: UpdateOp, value: Value, operand: &Value) -> Result<Value> {
    let by = operand.as_f64().ok_or_else(|| {
        WarehouseError::validation(name, format!("{} operand must be a number", op.name()))
    })?;
    let current = value.as_f64().unwrap_or(0.0);
    let next = match op {
        UpdateOp::Inc => current + by,
        UpdateOp::Dec => current - by,
        UpdateOp::Mul => current * by,
        UpdateOp::Div => current / by,
        UpdateOp::Mod => current % by,
        UpdateOp::Max => current.max(by),
        UpdateOp::Min => current.min(by),
        _ => return Ok(value),
    };
    Ok(Value::Number(next))
}
