use super::{QueryOp, UpdateOp};
use crate::error::{Result, WarehouseError};
use crate::value::{date_from_millis, format_date, parse_date, Value};
use chrono::{Datelike, Duration};

pub(super) fn coerce(value: Value) -> Value {
    match value {
        Value::String(s) => match parse_date(&s) {
            Some(d) => Value::Date(d),
            None => Value::String(s),
        },
        Value::Number(n) => match date_from_millis(n) {
            Some(d) => Value::Date(d),
            None => Value::Number(n),
        },
        other => other,
    }
}

pub(super) fn validate(name: &str, value: Value) -> Result<Value> {
    match value {
        Value::Date(_) => Ok(value),
        other => Err(WarehouseError::validation(
            name,
            format!("`{other}` is not a valid date!"),
        )),
    }
}

/// `$day` / `$month` / `$year` in UTC. Months are 1-based.
pub(super) fn part_is(op: QueryOp, value: &Value, operand: &Value) -> bool {
    let date = match value {
        Value::Date(d) => d,
        _ => return false,
    };
    let part = match op {
        QueryOp::Day => date.day() as i64,
        QueryOp::Month => date.month() as i64,
        QueryOp::Year => i64::from(date.year()),
        _ => return false,
    };
    operand.as_f64() == Some(part as f64)
}

/// `$inc` / `$dec` shift a date by a number of milliseconds.
pub(super) fn update(name: &str, op: UpdateOp, value: Value, operand: &Value) -> Result<Value> {
    let ms = operand.as_f64().ok_or_else(|| {
        WarehouseError::validation(name, format!("{} operand must be milliseconds", op.name()))
    })?;
    let delta = Duration::try_milliseconds(ms as i64)
        .ok_or_else(|| WarehouseError::validation(name, "date is out of range"))?;
    let date = match value {
        Value::Date(d) => d,
        other => return Ok(other),
    };
    let shifted = match op {
        UpdateOp::Inc => date.checked_add_signed(delta),
        UpdateOp::Dec => date.checked_sub_signed(delta),
        _ => Some(date),
    };
    shifted
        .map(Value::Date)
        .ok_or_else(|| WarehouseError::validation(name, "date is out of range"))
}

pub(super) fn export(value: Value) -> Value {
    match value {
        Value::Date(d) => Value::String(format_date(&d)),
        other => other,
    }
}
