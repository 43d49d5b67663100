//! Compiles selectors into predicates over a document's field map.

use super::Schema;
use crate::error::{Result, WarehouseError};
use crate::types::{QueryOp, SchemaType};
use crate::value::{get_or_null, Map, Value};
use regex::{Regex, RegexBuilder};
use std::fmt;
use std::sync::Arc;

/// Document-level predicate (`$where`).
pub type WhereFn = Arc<dyn Fn(&Map) -> bool + Send + Sync>;
/// Field-level predicate (`{path: {$where: ...}}`).
pub type FieldWhereFn = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// A query: a JSON-style operator object, a Rust predicate, or a combination.
#[derive(Clone)]
pub enum Selector {
    Spec(Value),
    Where(WhereFn),
    FieldWhere { path: String, predicate: FieldWhereFn },
    And(Vec<Selector>),
    Or(Vec<Selector>),
    Nor(Vec<Selector>),
    Not(Box<Selector>),
}

impl Selector {
    /// Matches every document.
    pub fn all() -> Self {
        Selector::Spec(Value::Object(Map::new()))
    }

    pub fn where_fn<F>(f: F) -> Self
    where
        F: Fn(&Map) -> bool + Send + Sync + 'static,
    {
        Selector::Where(Arc::new(f))
    }

    pub fn field_where<F>(path: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        Selector::FieldWhere {
            path: path.into(),
            predicate: Arc::new(f),
        }
    }

    pub fn and(selectors: Vec<Selector>) -> Self {
        Selector::And(selectors)
    }

    pub fn or(selectors: Vec<Selector>) -> Self {
        Selector::Or(selectors)
    }

    pub fn nor(selectors: Vec<Selector>) -> Self {
        Selector::Nor(selectors)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(selector: Selector) -> Self {
        Selector::Not(Box::new(selector))
    }
}

impl Default for Selector {
    fn default() -> Self {
        Selector::all()
    }
}

impl fmt::Debug for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Spec(v) => write!(f, "Spec({v})"),
            Selector::Where(_) => write!(f, "Where(..)"),
            Selector::FieldWhere { path, .. } => write!(f, "FieldWhere({path})"),
            Selector::And(s) => f.debug_tuple("And").field(s).finish(),
            Selector::Or(s) => f.debug_tuple("Or").field(s).finish(),
            Selector::Nor(s) => f.debug_tuple("Nor").field(s).finish(),
            Selector::Not(s) => f.debug_tuple("Not").field(s).finish(),
        }
    }
}

impl From<Value> for Selector {
    fn from(value: Value) -> Self {
        Selector::Spec(value)
    }
}

impl From<serde_json::Value> for Selector {
    fn from(value: serde_json::Value) -> Self {
        Selector::Spec(Value::from(value))
    }
}

impl From<Map> for Selector {
    fn from(map: Map) -> Self {
        Selector::Spec(Value::Object(map))
    }
}

/// A compiled conjunction of clauses.
#[derive(Clone)]
pub struct Predicate {
    clauses: Vec<Clause>,
}

#[derive(Clone)]
enum Clause {
    Match {
        path: String,
        ty: Arc<SchemaType>,
        value: Value,
    },
    Op {
        path: String,
        ty: Arc<SchemaType>,
        op: QueryOp,
        operand: Value,
    },
    Regex {
        path: String,
        regex: Regex,
    },
    Where(WhereFn),
    FieldWhere {
        path: String,
        predicate: FieldWhereFn,
    },
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Nor(Vec<Predicate>),
    Not(Box<Predicate>),
}

impl Predicate {
    pub fn test(&self, doc: &Map) -> bool {
        self.clauses.iter().all(|clause| clause.test(doc))
    }
}

impl Clause {
    fn test(&self, doc: &Map) -> bool {
        match self {
            Clause::Match { path, ty, value } => ty.matches(get_or_null(doc, path), value),
            Clause::Op {
                path,
                ty,
                op,
                operand,
            } => ty.query(*op, get_or_null(doc, path), operand),
            Clause::Regex { path, regex } => match get_or_null(doc, path) {
                Value::String(s) => regex.is_match(s),
                Value::Array(items) => items
                    .iter()
                    .any(|item| item.as_str().is_some_and(|s| regex.is_match(s))),
                _ => false,
            },
            Clause::Where(f) => f(doc),
            Clause::FieldWhere { path, predicate } => predicate(get_or_null(doc, path)),
            Clause::And(all) => all.iter().all(|p| p.test(doc)),
            Clause::Or(any) => any.iter().any(|p| p.test(doc)),
            Clause::Nor(none) => !none.iter().any(|p| p.test(doc)),
            Clause::Not(inner) => !inner.test(doc),
        }
    }
}

pub(super) fn compile(schema: &Schema, selector: &Selector) -> Result<Predicate> {
    let mut clauses = Vec::new();
    match selector {
        Selector::Spec(spec) => compile_spec(schema, spec, &mut clauses)?,
        Selector::Where(f) => clauses.push(Clause::Where(f.clone())),
        Selector::FieldWhere { path, predicate } => clauses.push(Clause::FieldWhere {
            path: path.clone(),
            predicate: predicate.clone(),
        }),
        Selector::And(list) => clauses.push(Clause::And(compile_all(schema, list)?)),
        Selector::Or(list) => clauses.push(Clause::Or(compile_all(schema, list)?)),
        Selector::Nor(list) => clauses.push(Clause::Nor(compile_all(schema, list)?)),
        Selector::Not(inner) => clauses.push(Clause::Not(Box::new(compile(schema, inner)?))),
    }
    Ok(Predicate { clauses })
}

fn compile_all(schema: &Schema, selectors: &[Selector]) -> Result<Vec<Predicate>> {
    selectors.iter().map(|s| compile(schema, s)).collect()
}

fn compile_nested(schema: &Schema, spec: &Value) -> Result<Predicate> {
    let mut clauses = Vec::new();
    compile_spec(schema, spec, &mut clauses)?;
    Ok(Predicate { clauses })
}

fn compile_list(schema: &Schema, key: &str, value: &Value) -> Result<Vec<Predicate>> {
    match value {
        Value::Array(items) => items.iter().map(|spec| compile_nested(schema, spec)).collect(),
        other => Err(WarehouseError::Usage(format!(
            "`{key}` expects an array of queries, got {}",
            other.type_name()
        ))),
    }
}

fn compile_spec(schema: &Schema, spec: &Value, out: &mut Vec<Clause>) -> Result<()> {
    let map = match spec {
        Value::Object(map) => map,
        Value::Null => return Ok(()),
        other => {
            return Err(WarehouseError::Usage(format!(
                "query must be an object, got {}",
                other.type_name()
            )))
        }
    };
    for (key, value) in map {
        match key.as_str() {
            "$and" => out.push(Clause::And(compile_list(schema, key, value)?)),
            "$or" => out.push(Clause::Or(compile_list(schema, key, value)?)),
            "$nor" => out.push(Clause::Nor(compile_list(schema, key, value)?)),
            "$not" => out.push(Clause::Not(Box::new(compile_nested(schema, value)?))),
            k if k.starts_with('$') => log::debug!("Skipping unknown query operator `{k}`"),
            _ => compile_field(schema, key, value, out)?,
        }
    }
    Ok(())
}

fn is_operator_object(map: &Map) -> bool {
    map.keys().any(|k| k.starts_with('$'))
}

fn compile_field(schema: &Schema, path: &str, value: &Value, out: &mut Vec<Clause>) -> Result<()> {
    match value {
        Value::Object(map) if !map.is_empty() && is_operator_object(map) => {
            let ty = schema.type_for(path);
            for (key, operand) in map {
                if !key.starts_with('$') {
                    compile_field(schema, &format!("{path}.{key}"), operand, out)?;
                    continue;
                }
                if key == "$options" {
                    continue;
                }
                match QueryOp::from_name(key) {
                    Some(QueryOp::Regex) if ty.supports_query(QueryOp::Regex) => {
                        out.push(Clause::Regex {
                            path: path.to_string(),
                            regex: build_regex(path, operand, map.get("$options"))?,
                        });
                    }
                    Some(op) if ty.supports_query(op) => out.push(Clause::Op {
                        path: path.to_string(),
                        ty: ty.clone(),
                        op,
                        operand: operand.clone(),
                    }),
                    Some(op) => {
                        log::debug!("Skipping {op:?}: not supported by `{path}`");
                    }
                    None => log::debug!("Skipping unknown query operator `{key}` on `{path}`"),
                }
            }
        }
        Value::Object(map) if !map.is_empty() => {
            for (key, nested) in map {
                compile_field(schema, &format!("{path}.{key}"), nested, out)?;
            }
        }
        _ => out.push(Clause::Match {
            path: path.to_string(),
            ty: schema.type_for(path),
            value: value.clone(),
        }),
    }
    Ok(())
}

fn build_regex(path: &str, pattern: &Value, options: Option<&Value>) -> Result<Regex> {
    let pattern = pattern.as_str().ok_or_else(|| {
        WarehouseError::Usage(format!("`$regex` on `{path}` must be a string"))
    })?;
    let options = options.and_then(|o| o.as_str()).unwrap_or("");
    RegexBuilder::new(pattern)
        .case_insensitive(options.contains('i'))
        .multi_line(options.contains('m'))
        .dot_matches_new_line(options.contains('s'))
        .build()
        .map_err(|e| WarehouseError::Usage(format!("invalid `$regex` on `{path}`: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn people() -> Schema {
        let mut schema = Schema::new();
        schema.add([
            ("name", SchemaType::string()),
            ("age", SchemaType::number()),
            ("date", SchemaType::date()),
            ("tags", SchemaType::array(SchemaType::string())),
        ]);
        schema
    }

    fn docs() -> Vec<Map> {
        [10, 20, 30]
            .into_iter()
            .map(|age| {
                let mut doc = Map::new();
                doc.insert("age".into(), Value::from(age));
                doc.insert("name".into(), Value::from(format!("Person {age}")));
                doc
            })
            .collect()
    }

    fn ages(selector: impl Into<Selector>) -> Vec<f64> {
        let predicate = people().compile_query(&selector.into()).unwrap();
        docs()
            .iter()
            .filter(|d| predicate.test(d))
            .filter_map(|d| d.get("age").and_then(|v| v.as_f64()))
            .collect()
    }

    #[test]
    fn test_comparison() {
        assert_eq!(ages(json!({"age": {"$gt": 15}})), vec![20.0, 30.0]);
        assert_eq!(ages(json!({"age": {"$gte": 10, "$lt": 30}})), vec![10.0, 20.0]);
        assert_eq!(ages(json!({"age": 20})), vec![20.0]);
    }

    #[test]
    fn test_logical_combinators() {
        assert_eq!(ages(json!({"$or": [{"age": 10}, {"age": 30}]})), vec![10.0, 30.0]);
        assert_eq!(ages(json!({"$nor": [{"age": 10}, {"age": 30}]})), vec![20.0]);
        assert_eq!(ages(json!({"$not": {"age": 10}})), vec![20.0, 30.0]);
        assert_eq!(
            ages(json!({"$and": [{"age": {"$gt": 10}}, {"age": {"$lt": 30}}]})),
            vec![20.0]
        );
    }

    #[test]
    fn test_rust_predicates() {
        let selector = Selector::or(vec![
            Selector::where_fn(|doc| doc.get("age") == Some(&Value::from(10))),
            Selector::field_where("age", |v| v.as_f64().is_some_and(|n| n > 25.0)),
        ]);
        assert_eq!(ages(selector), vec![10.0, 30.0]);
        assert_eq!(ages(Selector::not(Selector::all())), Vec::<f64>::new());
    }

    #[test]
    fn test_regex_with_options() {
        assert_eq!(ages(json!({"name": {"$regex": "person 2", "$options": "i"}})), vec![20.0]);
        assert_eq!(ages(json!({"name": {"$regex": "person 2"}})), Vec::<f64>::new());
    }

    #[test]
    fn test_invalid_regex_is_usage_error() {
        let err = people()
            .compile_query(&json!({"name": {"$regex": "("}}).into())
            .err()
            .unwrap();
        assert_eq!(err.code(), "USAGE");
    }

    #[test]
    fn test_unknown_operator_is_skipped() {
        assert_eq!(ages(json!({"age": {"$bogus": 1}})), vec![10.0, 20.0, 30.0]);
        assert_eq!(ages(json!({"$bogus": 1})), vec![10.0, 20.0, 30.0]);
    }

    #[test]
    fn test_nested_paths_recurse() {
        let schema = people();
        let predicate = schema
            .compile_query(&json!({"meta": {"author": {"name": "ada"}}}).into())
            .unwrap();
        let mut doc = Map::new();
        crate::value::set_path(&mut doc, "meta.author.name", Value::from("ada"));
        assert!(predicate.test(&doc));
        assert!(!predicate.test(&Map::new()));
    }

    #[test]
    fn test_date_operand_is_cast() {
        let schema = people();
        let predicate = schema
            .compile_query(&json!({"date": {"$gt": "2020-01-01"}}).into())
            .unwrap();
        let mut doc = Map::new();
        doc.insert(
            "date".into(),
            schema.type_for("date").cast(Value::from("2020-06-01")),
        );
        assert!(predicate.test(&doc));
    }

    #[test]
    fn test_array_queries() {
        let schema = people();
        let mut doc = Map::new();
        doc.insert("tags".into(), Value::from(json!(["a", "b"])));
        let test = |q: serde_json::Value| schema.compile_query(&q.into()).unwrap().test(&doc);
        assert!(test(json!({"tags": {"$in": ["b", "z"]}})));
        assert!(test(json!({"tags": {"$all": ["a", "b"]}})));
        assert!(test(json!({"tags": {"$size": 2}})));
        assert!(test(json!({"tags": ["a", "b"]})));
        assert!(!test(json!({"tags": ["b", "a"]})));
    }
}
