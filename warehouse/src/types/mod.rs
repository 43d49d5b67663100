//! Field types: how a single schema path is cast, validated, compared,
//! queried, updated, imported and exported.

mod array;
mod boolean;
mod buffer;
mod cuid;
mod date;
mod enumeration;
mod number;
mod object;
pub mod operator;
mod string;
mod virtuals;

use crate::error::{Result, WarehouseError};
use crate::id::IdStrategy;
use crate::value::{compare_values, set_path, Map, Value};
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

pub use operator::{QueryOp, UpdateOp};
pub use virtuals::{VirtualGetter, VirtualSetter};

/// Produces a default value for an absent field.
pub type DefaultFn = Arc<dyn Fn() -> Value + Send + Sync>;

/// Per-field options shared by every kind.
#[derive(Clone, Default)]
pub struct TypeOptions {
    pub required: bool,
    pub default: Option<DefaultFn>,
    /// Target model for population.
    pub reference: Option<String>,
}

impl fmt::Debug for TypeOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeOptions")
            .field("required", &self.required)
            .field("default", &self.default.is_some())
            .field("reference", &self.reference)
            .finish()
    }
}

/// The built-in field kinds.
#[derive(Clone, Debug)]
pub enum TypeKind {
    Mixed,
    String,
    Number,
    Integer,
    Boolean,
    Date,
    Array(Box<SchemaType>),
    Object,
    Buffer,
    Cuid(IdStrategy),
    Enum(Vec<Value>),
    Virtual(virtuals::VirtualType),
}

/// A typed schema path.
#[derive(Clone, Debug)]
pub struct SchemaType {
    name: String,
    options: TypeOptions,
    kind: TypeKind,
}

impl SchemaType {
    fn of(kind: TypeKind) -> Self {
        SchemaType {
            name: String::new(),
            options: TypeOptions::default(),
            kind,
        }
    }

    pub fn mixed() -> Self {
        Self::of(TypeKind::Mixed)
    }

    pub fn string() -> Self {
        Self::of(TypeKind::String)
    }

    pub fn number() -> Self {
        Self::of(TypeKind::Number)
    }

    pub fn integer() -> Self {
        Self::of(TypeKind::Integer)
    }

    pub fn boolean() -> Self {
        Self::of(TypeKind::Boolean)
    }

    pub fn date() -> Self {
        Self::of(TypeKind::Date)
    }

    pub fn array(child: SchemaType) -> Self {
        Self::of(TypeKind::Array(Box::new(child)))
    }

    pub fn object() -> Self {
        Self::of(TypeKind::Object)
    }

    pub fn buffer() -> Self {
        Self::of(TypeKind::Buffer)
    }

    /// Identifier type using the default generation strategy.
    pub fn cuid() -> Self {
        Self::of(TypeKind::Cuid(IdStrategy::default()))
    }

    pub fn cuid_with(strategy: IdStrategy) -> Self {
        Self::of(TypeKind::Cuid(strategy))
    }

    pub fn enumeration<I, V>(elements: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::of(TypeKind::Enum(elements.into_iter().map(Into::into).collect()))
    }

    pub fn virtual_field() -> Self {
        Self::of(TypeKind::Virtual(virtuals::VirtualType::default()))
    }

    // ── Builders ─────────────────────────────────────────────────────

    pub fn required(mut self) -> Self {
        self.options.required = true;
        self
    }

    /// Use a fixed default. Each absent field receives its own copy.
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        let value = value.into();
        self.options.default = Some(Arc::new(move || value.clone()));
        self
    }

    pub fn default_with<F>(mut self, f: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.options.default = Some(Arc::new(f));
        self
    }

    /// Name the model this field's ids point at.
    pub fn reference(mut self, model: impl Into<String>) -> Self {
        self.options.reference = Some(model.into());
        self
    }

    /// Attach the computed getter of a virtual field.
    pub fn getter<F>(mut self, f: F) -> Self
    where
        F: Fn(&Map) -> Value + Send + Sync + 'static,
    {
        if let TypeKind::Virtual(v) = &mut self.kind {
            v.getter = Some(Arc::new(f));
        }
        self
    }

    /// Attach the setter of a virtual field; it receives the document and the assigned value.
    pub fn setter<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut Map, Value) + Send + Sync + 'static,
    {
        if let TypeKind::Virtual(v) = &mut self.kind {
            v.setter = Some(Arc::new(f));
        }
        self
    }

    pub(crate) fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        if let TypeKind::Array(child) = &mut self.kind {
            let renamed = std::mem::replace(child.as_mut(), SchemaType::mixed()).with_name(name);
            **child = renamed;
        }
        self
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &TypeKind {
        &self.kind
    }

    pub fn options(&self) -> &TypeOptions {
        &self.options
    }

    pub fn is_required(&self) -> bool {
        self.options.required
    }

    pub fn is_virtual(&self) -> bool {
        matches!(self.kind, TypeKind::Virtual(_))
    }

    /// Run a virtual path's setter against `doc`. No-op for stored types.
    pub(crate) fn assign_virtual(&self, value: Value, doc: &mut Map) {
        if let TypeKind::Virtual(v) = &self.kind {
            virtuals::assign(v, value, doc);
        }
    }

    /// The population target, looking through arrays to their child type.
    pub fn reference_target(&self) -> Option<&str> {
        match (&self.options.reference, &self.kind) {
            (Some(r), _) => Some(r),
            (None, TypeKind::Array(child)) => child.reference_target(),
            _ => None,
        }
    }

    pub(crate) fn virtual_getter(&self) -> Option<&VirtualGetter> {
        match &self.kind {
            TypeKind::Virtual(v) => v.getter.as_ref(),
            _ => None,
        }
    }

    /// The default value for an absent field.
    pub fn default(&self) -> Value {
        if let Some(f) = &self.options.default {
            return f();
        }
        match &self.kind {
            // A fresh sequence every call, never shared between documents.
            TypeKind::Array(_) => Value::Array(Vec::new()),
            TypeKind::Cuid(strategy) if self.options.required => {
                Value::String(strategy.generate())
            }
            _ => Value::Null,
        }
    }

    // ── Capabilities ─────────────────────────────────────────────────

    /// Coerce a value toward this type. Null becomes the default.
    pub fn cast(&self, value: Value) -> Value {
        if value.is_null() {
            return self.default();
        }
        self.coerce(value)
    }

    /// Cast without defaults: used for stored values and query operands.
    pub fn coerce(&self, value: Value) -> Value {
        if value.is_null() {
            return value;
        }
        match &self.kind {
            TypeKind::String => string::coerce(value),
            TypeKind::Number => number::coerce(value, false),
            TypeKind::Integer => number::coerce(value, true),
            TypeKind::Boolean => boolean::coerce(value),
            TypeKind::Date => date::coerce(value),
            TypeKind::Array(child) => array::coerce(child, value),
            TypeKind::Buffer => buffer::coerce(value),
            TypeKind::Cuid(_) => cuid::coerce(value),
            TypeKind::Virtual(_) => Value::Null,
            TypeKind::Mixed | TypeKind::Object | TypeKind::Enum(_) => value,
        }
    }

    /// Check the canonical type. Returns the value to store; `Null` removes the field.
    ///
    /// Virtual fields never store anything: their setter fans the assigned
    /// value out into sibling fields of `doc`.
    pub fn validate(&self, value: Value, doc: &mut Map) -> Result<Value> {
        if self.is_virtual() {
            self.assign_virtual(value, doc);
            return Ok(Value::Null);
        }
        if value.is_null() {
            if self.options.required {
                return Err(WarehouseError::validation(&self.name, "is required!"));
            }
            return Ok(value);
        }
        match &self.kind {
            TypeKind::String => string::validate(&self.name, value),
            TypeKind::Number => number::validate(&self.name, value, false),
            TypeKind::Integer => number::validate(&self.name, value, true),
            TypeKind::Boolean => boolean::validate(&self.name, value),
            TypeKind::Date => date::validate(&self.name, value),
            TypeKind::Array(child) => array::validate(&self.name, child, value, doc),
            TypeKind::Object => object::validate(&self.name, value),
            TypeKind::Buffer => buffer::validate(&self.name, value),
            TypeKind::Cuid(_) => cuid::validate(&self.name, value),
            TypeKind::Enum(elements) => enumeration::validate(&self.name, elements, value),
            TypeKind::Mixed | TypeKind::Virtual(_) => Ok(value),
        }
    }

    /// Total order. Null sorts before any value.
    pub fn compare(&self, a: &Value, b: &Value) -> Ordering {
        match (a.is_null(), b.is_null()) {
            (true, true) => return Ordering::Equal,
            (true, false) => return Ordering::Less,
            (false, true) => return Ordering::Greater,
            _ => {}
        }
        match &self.kind {
            TypeKind::Array(child) => array::compare(child, a, b),
            _ => compare_values(a, b),
        }
    }

    /// Equality (or pattern) test of a stored value against a query value.
    pub fn matches(&self, value: &Value, query: &Value) -> bool {
        if value.is_null() || query.is_null() {
            return value.is_null() && query.is_null();
        }
        match &self.kind {
            TypeKind::Array(child) => array::matches(child, value, query),
            TypeKind::Number | TypeKind::Integer | TypeKind::Date | TypeKind::Buffer => {
                *value == self.coerce(query.clone())
            }
            _ => value == query,
        }
    }

    /// Whether a query operator applies to this type.
    pub fn supports_query(&self, op: QueryOp) -> bool {
        if op.is_base() {
            return true;
        }
        match &self.kind {
            TypeKind::String | TypeKind::Mixed | TypeKind::Enum(_) => {
                matches!(op, QueryOp::Regex | QueryOp::Length)
            }
            TypeKind::Array(_) => matches!(op, QueryOp::Size | QueryOp::Length | QueryOp::All),
            TypeKind::Date => matches!(op, QueryOp::Day | QueryOp::Month | QueryOp::Year),
            _ => false,
        }
    }

    /// Evaluate a query operator. Unsupported operators hold trivially.
    ///
    /// `$regex` is compiled ahead of time by the query compiler and is not
    /// evaluated here.
    pub fn query(&self, op: QueryOp, value: &Value, operand: &Value) -> bool {
        if !self.supports_query(op) {
            return true;
        }
        if let TypeKind::Array(child) = &self.kind {
            if let Some(result) = array::query(child, op, value, operand) {
                return result;
            }
        }
        match op {
            QueryOp::Exist => !value.is_null() == operand.is_truthy(),
            QueryOp::Eq => self.matches(value, operand),
            QueryOp::Ne => !self.matches(value, operand),
            QueryOp::Lt => self.ordered(value, operand, |o| o == Ordering::Less),
            QueryOp::Lte => self.ordered(value, operand, |o| o != Ordering::Greater),
            QueryOp::Gt => self.ordered(value, operand, |o| o == Ordering::Greater),
            QueryOp::Gte => self.ordered(value, operand, |o| o != Ordering::Less),
            QueryOp::In => candidates(operand).iter().any(|c| self.matches(value, c)),
            QueryOp::Nin => !candidates(operand).iter().any(|c| self.matches(value, c)),
            QueryOp::Within => self.within(value, operand),
            QueryOp::Without => !value.is_null() && !self.within(value, operand),
            QueryOp::Length => string::length_is(value, operand),
            QueryOp::Day | QueryOp::Month | QueryOp::Year => date::part_is(op, value, operand),
            QueryOp::Regex | QueryOp::Size | QueryOp::All => true,
        }
    }

    fn ordered(&self, value: &Value, operand: &Value, test: impl Fn(Ordering) -> bool) -> bool {
        if value.is_null() {
            return false;
        }
        test(self.compare(value, &self.coerce(operand.clone())))
    }

    fn within(&self, value: &Value, operand: &Value) -> bool {
        let bounds = match operand.as_array() {
            Some(b) if b.len() == 2 => b,
            _ => return false,
        };
        self.ordered(value, &bounds[0], |o| o != Ordering::Less)
            && self.ordered(value, &bounds[1], |o| o != Ordering::Greater)
    }

    /// Whether an update operator applies to this type.
    pub fn supports_update(&self, op: UpdateOp) -> bool {
        if op.is_base() {
            return true;
        }
        match &self.kind {
            TypeKind::Number | TypeKind::Integer => op.is_numeric(),
            TypeKind::Array(_) => op.is_array(),
            TypeKind::Date => matches!(op, UpdateOp::Inc | UpdateOp::Dec),
            _ => false,
        }
    }

    /// Apply an update operator, returning the new value (`Null` unsets the field).
    pub fn update(&self, op: UpdateOp, value: Value, operand: &Value, doc: &mut Map) -> Result<Value> {
        if !self.supports_update(op) {
            return Ok(value);
        }
        match op {
            UpdateOp::Set => Ok(operand.clone()),
            UpdateOp::Unset => Ok(if operand.is_truthy() { Value::Null } else { value }),
            UpdateOp::Rename => {
                let target = operand.as_str().ok_or_else(|| {
                    WarehouseError::validation(&self.name, "$rename target must be a string")
                })?;
                if !value.is_null() {
                    set_path(doc, target, value);
                }
                Ok(Value::Null)
            }
            _ => match &self.kind {
                TypeKind::Date => date::update(&self.name, op, value, operand),
                TypeKind::Array(child) => Ok(array::update(child, op, value, operand)),
                _ => number::update(&self.name, op, value, operand),
            },
        }
    }

    /// Import transform: persisted raw value to runtime representation.
    pub fn parse(&self, value: Value) -> Value {
        if value.is_null() {
            return value;
        }
        match &self.kind {
            TypeKind::Boolean => boolean::parse(value),
            TypeKind::Date => date::coerce(value),
            TypeKind::Buffer => buffer::coerce(value),
            TypeKind::Array(child) => array::map(value, |v| child.parse(v)),
            _ => value,
        }
    }

    /// Export transform: runtime representation to a persistence-safe value.
    pub fn export(&self, value: Value) -> Value {
        if value.is_null() {
            return value;
        }
        match &self.kind {
            TypeKind::Boolean => boolean::export(value),
            TypeKind::Date => date::export(value),
            TypeKind::Buffer => buffer::export(value),
            TypeKind::Array(child) => array::map(value, |v| child.export(v)),
            TypeKind::Virtual(_) => Value::Null,
            _ => value,
        }
    }
}

fn candidates(operand: &Value) -> Vec<Value> {
    match operand {
        Value::Array(items) => items.clone(),
        other => vec![other.clone()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn v(value: serde_json::Value) -> Value {
        Value::from(value)
    }

    #[test]
    fn test_required_rejects_null() {
        let ty = SchemaType::string().required().with_name("title");
        let err = ty.validate(Value::Null, &mut Map::new()).unwrap_err();
        assert_eq!(err.to_string(), "Validation error: `title` is required!");
    }

    #[test]
    fn test_optional_null_is_removed() {
        let ty = SchemaType::number().with_name("age");
        assert_eq!(ty.validate(Value::Null, &mut Map::new()).unwrap(), Value::Null);
    }

    #[test]
    fn test_default_applies_only_to_null() {
        let ty = SchemaType::string().default_value("draft");
        assert_eq!(ty.cast(Value::Null), v(json!("draft")));
        assert_eq!(ty.cast(v(json!("live"))), v(json!("live")));
    }

    #[test]
    fn test_array_default_is_fresh() {
        let ty = SchemaType::array(SchemaType::string());
        let mut a = ty.cast(Value::Null);
        if let Value::Array(items) = &mut a {
            items.push(Value::from("x"));
        }
        assert_eq!(ty.cast(Value::Null), Value::Array(vec![]));
    }

    #[test]
    fn test_cuid_generates_only_when_required() {
        let required = SchemaType::cuid().required();
        let optional = SchemaType::cuid();
        assert!(required.cast(Value::Null).as_str().is_some());
        assert!(optional.cast(Value::Null).is_null());
        assert_eq!(required.cast(Value::from("abc")), Value::from("abc"));
    }

    #[test]
    fn test_comparison_operators_cast_operand() {
        let ty = SchemaType::number();
        assert!(ty.query(QueryOp::Gt, &v(json!(20)), &v(json!("15"))));
        assert!(!ty.query(QueryOp::Lt, &Value::Null, &v(json!(15))));
        assert!(ty.query(QueryOp::Lte, &v(json!(15)), &v(json!(15))));
    }

    #[test]
    fn test_in_and_nin() {
        let ty = SchemaType::string();
        assert!(ty.query(QueryOp::In, &v(json!("b")), &v(json!(["a", "b"]))));
        assert!(ty.query(QueryOp::Nin, &v(json!("c")), &v(json!(["a", "b"]))));
    }

    #[test]
    fn test_within_and_without() {
        let ty = SchemaType::number();
        assert!(ty.query(QueryOp::Within, &v(json!(5)), &v(json!([1, 5]))));
        assert!(!ty.query(QueryOp::Within, &v(json!(6)), &v(json!([1, 5]))));
        assert!(ty.query(QueryOp::Without, &v(json!(6)), &v(json!([1, 5]))));
    }

    #[test]
    fn test_exist() {
        let ty = SchemaType::mixed();
        assert!(ty.query(QueryOp::Exist, &v(json!(1)), &Value::Bool(true)));
        assert!(ty.query(QueryOp::Exist, &Value::Null, &Value::Bool(false)));
        assert!(!ty.query(QueryOp::Exist, &Value::Null, &Value::Bool(true)));
    }

    #[test]
    fn test_unsupported_update_is_noop() {
        let ty = SchemaType::string();
        let out = ty
            .update(UpdateOp::Inc, v(json!("a")), &v(json!(1)), &mut Map::new())
            .unwrap();
        assert_eq!(out, v(json!("a")));
    }

    #[test]
    fn test_rename_moves_value() {
        let ty = SchemaType::mixed().with_name("old");
        let mut doc = Map::new();
        let out = ty
            .update(UpdateOp::Rename, v(json!(1)), &v(json!("fresh")), &mut doc)
            .unwrap();
        assert!(out.is_null());
        assert_eq!(doc.get("fresh"), Some(&v(json!(1))));
    }

    #[test]
    fn test_unset() {
        let ty = SchemaType::mixed();
        let mut doc = Map::new();
        let out = ty
            .update(UpdateOp::Unset, v(json!(1)), &Value::Bool(true), &mut doc)
            .unwrap();
        assert!(out.is_null());
    }

    #[test]
    fn test_reference_target_looks_through_arrays() {
        let ty = SchemaType::array(SchemaType::cuid().reference("Tag"));
        assert_eq!(ty.reference_target(), Some("Tag"));
    }
}
