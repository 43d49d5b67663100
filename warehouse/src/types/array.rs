use super::{QueryOp, SchemaType, UpdateOp};
use crate::error::{Result, WarehouseError};
use crate::value::{compare_values, Map, Value};
use std::cmp::Ordering;

pub(super) fn coerce(child: &SchemaType, value: Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.into_iter().map(|v| child.coerce(v)).collect()),
        scalar => Value::Array(vec![child.coerce(scalar)]),
    }
}

pub(super) fn validate(name: &str, child: &SchemaType, value: Value, doc: &mut Map) -> Result<Value> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .map(|item| child.validate(item, doc))
            .collect::<Result<Vec<_>>>()
            .map(Value::Array),
        other => Err(WarehouseError::validation(
            name,
            format!("`{other}` is not an array!"),
        )),
    }
}

/// Element-wise by the child type, then by length.
pub(super) fn compare(child: &SchemaType, a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Array(a), Value::Array(b)) => a
            .iter()
            .zip(b.iter())
            .map(|(x, y)| child.compare(x, y))
            .find(|o| *o != Ordering::Equal)
            .unwrap_or_else(|| a.len().cmp(&b.len())),
        _ => compare_values(a, b),
    }
}

pub(super) fn matches(child: &SchemaType, value: &Value, query: &Value) -> bool {
    match (value, query) {
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| child.matches(x, y))
        }
        _ => false,
    }
}

fn elements(value: &Value) -> &[Value] {
    match value {
        Value::Array(items) => items,
        _ => &[],
    }
}

fn operands(operand: &Value) -> Vec<Value> {
    match operand {
        Value::Array(items) => items.clone(),
        other => vec![other.clone()],
    }
}

fn contains(child: &SchemaType, items: &[Value], candidate: &Value) -> bool {
    items.iter().any(|item| child.matches(item, candidate))
}

/// Array-specific query operators; `None` falls back to the base behavior.
pub(super) fn query(child: &SchemaType, op: QueryOp, value: &Value, operand: &Value) -> Option<bool> {
    let items = elements(value);
    let result = match op {
        QueryOp::In => operands(operand).iter().any(|c| contains(child, items, c)),
        QueryOp::Nin => !operands(operand).iter().any(|c| contains(child, items, c)),
        QueryOp::All => operands(operand).iter().all(|c| contains(child, items, c)),
        QueryOp::Size | QueryOp::Length => operand.as_f64() == Some(items.len() as f64),
        _ => return None,
    };
    Some(result)
}

pub(super) fn map(value: Value, f: impl Fn(Value) -> Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.into_iter().map(f).collect()),
        other => other,
    }
}

/// How many elements `$shift` / `$pop` remove, and from which end.
/// Positive counts act on the operator's own end, negative ones on the other.
fn removal(operand: &Value) -> i64 {
    match operand {
        Value::Bool(true) => 1,
        Value::Number(n) if n.is_finite() => *n as i64,
        _ => 0,
    }
}

fn drop_front(items: &mut Vec<Value>, n: usize) {
    items.drain(..n.min(items.len()));
}

fn drop_back(items: &mut Vec<Value>, n: usize) {
    let keep = items.len().saturating_sub(n);
    items.truncate(keep);
}

pub(super) fn update(child: &SchemaType, op: UpdateOp, value: Value, operand: &Value) -> Value {
    if value.is_null() && matches!(op, UpdateOp::Shift | UpdateOp::Pop | UpdateOp::Pull) {
        return value;
    }
    let mut items = match value {
        Value::Array(items) => items,
        Value::Null => Vec::new(),
        other => vec![other],
    };
    let incoming: Vec<Value> = operands(operand)
        .into_iter()
        .map(|v| child.coerce(v))
        .collect();

    match op {
        UpdateOp::Push => items.extend(incoming),
        UpdateOp::Unshift => {
            let tail = std::mem::replace(&mut items, incoming);
            items.extend(tail);
        }
        UpdateOp::Pull => items.retain(|item| !incoming.iter().any(|c| child.matches(item, c))),
        UpdateOp::AddToSet => {
            for candidate in incoming {
                if !contains(child, &items, &candidate) {
                    items.push(candidate);
                }
            }
        }
        UpdateOp::Shift => match removal(operand) {
            n if n > 0 => drop_front(&mut items, n as usize),
            n if n < 0 => drop_back(&mut items, n.unsigned_abs() as usize),
            _ => {}
        },
        UpdateOp::Pop => match removal(operand) {
            n if n > 0 => drop_back(&mut items, n as usize),
            n if n < 0 => drop_front(&mut items, n.unsigned_abs() as usize),
            _ => {}
        },
        _ => {}
    }
    Value::Array(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn v(value: serde_json::Value) -> Value {
        Value::from(value)
    }

    fn numbers() -> SchemaType {
        SchemaType::array(SchemaType::number())
    }

    fn apply(op: UpdateOp, value: serde_json::Value, operand: serde_json::Value) -> Value {
        numbers()
            .update(op, v(value), &v(operand), &mut Map::new())
            .unwrap()
    }

    #[test]
    fn test_pull() {
        assert_eq!(apply(UpdateOp::Pull, json!([1, 2, 3]), json!(2)), v(json!([1, 3])));
        assert_eq!(apply(UpdateOp::Pull, json!([1, 2, 3]), json!([1, 3])), v(json!([2])));
    }

    #[test]
    fn test_push_and_unshift() {
        assert_eq!(apply(UpdateOp::Push, json!([1]), json!([2, 3])), v(json!([1, 2, 3])));
        assert_eq!(apply(UpdateOp::Push, json!(null), json!(4)), v(json!([4])));
        assert_eq!(apply(UpdateOp::Unshift, json!([3]), json!([1, 2])), v(json!([1, 2, 3])));
    }

    #[test]
    fn test_shift_and_pop() {
        assert_eq!(apply(UpdateOp::Shift, json!([1, 2, 3]), json!(true)), v(json!([2, 3])));
        assert_eq!(apply(UpdateOp::Shift, json!([1, 2, 3]), json!(2)), v(json!([3])));
        assert_eq!(apply(UpdateOp::Shift, json!([1, 2, 3]), json!(-1)), v(json!([1, 2])));
        assert_eq!(apply(UpdateOp::Pop, json!([1, 2, 3]), json!(true)), v(json!([1, 2])));
        assert_eq!(apply(UpdateOp::Pop, json!([1, 2, 3]), json!(-2)), v(json!([3])));
        assert_eq!(apply(UpdateOp::Pop, json!([1]), json!(5)), v(json!([])));
    }

    #[test]
    fn test_add_to_set() {
        assert_eq!(
            apply(UpdateOp::AddToSet, json!([1, 2]), json!([2, 3, 3])),
            v(json!([1, 2, 3]))
        );
    }

    #[test]
    fn test_query_ops() {
        let ty = numbers();
        let value = v(json!([1, 2, 3]));
        assert!(ty.query(QueryOp::In, &value, &v(json!([5, 3]))));
        assert!(!ty.query(QueryOp::Nin, &value, &v(json!([5, 3]))));
        assert!(ty.query(QueryOp::All, &value, &v(json!([1, 3]))));
        assert!(!ty.query(QueryOp::All, &value, &v(json!([1, 4]))));
        assert!(ty.query(QueryOp::Size, &value, &v(json!(3))));
        assert!(ty.query(QueryOp::Length, &value, &v(json!(3))));
    }

    #[test]
    fn test_match_is_element_wise() {
        let ty = numbers();
        assert!(ty.matches(&v(json!([1, 2])), &v(json!([1, 2]))));
        assert!(!ty.matches(&v(json!([1, 2])), &v(json!([2, 1]))));
        assert!(!ty.matches(&v(json!([1, 2])), &v(json!(1))));
    }

    #[test]
    fn test_scalar_cast_wraps() {
        let ty = SchemaType::array(SchemaType::string());
        assert_eq!(ty.cast(v(json!(5))), v(json!(["5"])));
    }

    #[test]
    fn test_dates_validate_and_sort_element_wise() {
        let ty = SchemaType::array(SchemaType::date()).with_name("dates");
        let cast = ty.cast(v(json!(["2020-01-02", "2020-01-01"])));
        let validated = ty.validate(cast.clone(), &mut Map::new()).unwrap();
        assert_eq!(validated, cast);

        let earlier = ty.cast(v(json!(["2020-01-01"])));
        let later = ty.cast(v(json!(["2020-01-02"])));
        assert_eq!(ty.compare(&earlier, &later), Ordering::Less);

        let bad = ty.validate(v(json!(["nope"])), &mut Map::new());
        assert!(bad.is_err());
    }
}
