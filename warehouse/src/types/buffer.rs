use crate::error::{Result, WarehouseError};
use crate::value::Value;

/// Hex strings and arrays of byte values become buffers.
pub(super) fn coerce(value: Value) -> Value {
    match value {
        Value::String(s) => match hex::decode(&s) {
            Ok(bytes) => Value::Buffer(bytes),
            Err(_) => Value::String(s),
        },
        Value::Array(items) => {
            let bytes: Option<Vec<u8>> = items
                .iter()
                .map(|v| match v {
                    Value::Number(n) if (0.0..=255.0).contains(n) && n.fract() == 0.0 => {
                        Some(*n as u8)
                    }
                    _ => None,
                })
                .collect();
            match bytes {
                Some(bytes) => Value::Buffer(bytes),
                None => Value::Array(items),
            }
        }
        other => other,
    }
}

pub(super) fn validate(name: &str, value: Value) -> Result<Value> {
    match value {
        Value::Buffer(_) => Ok(value),
        other => Err(WarehouseError::validation(
            name,
            format!("`{other}` is not a valid buffer!"),
        )),
    }
}

pub(super) fn export(value: Value) -> Value {
    match value {
        Value::Buffer(bytes) => Value::String(hex::encode(bytes)),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_round_trip() {
        let buf = Value::Buffer(vec![0, 1, 254, 255]);
        let exported = export(buf.clone());
        assert_eq!(exported, Value::from("0001feff"));
        assert_eq!(coerce(exported), buf);
    }

    #[test]
    fn test_from_byte_array() {
        let arr = Value::Array(vec![Value::Number(1.0), Value::Number(2.0)]);
        assert_eq!(coerce(arr), Value::Buffer(vec![1, 2]));
        let bad = Value::Array(vec![Value::Number(300.0)]);
        assert!(matches!(coerce(bad), Value::Array(_)));
    }
}
