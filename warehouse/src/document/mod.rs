//! Documents: schema-bound views over a model's stored values.

mod memo;

use crate::error::{Result, WarehouseError};
use crate::model::populate::{self, Population, Populated};
use crate::model::Model;
use crate::value::{get_path, set_path, Map, Value};
use std::collections::HashMap;
use std::fmt;

pub(crate) use memo::Memo;

/// A record materialized from a model. Documents are private copies: edits
/// only reach the model through [`Document::save`] and friends.
#[derive(Clone)]
pub struct Document {
    model: Model,
    fields: Map,
    virtuals: HashMap<String, Memo<Value>>,
    populated: HashMap<String, Memo<Populated>>,
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("model", &self.model.name())
            .field("fields", &self.fields)
            .field("populated", &self.populated.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.model.name() == other.model.name() && self.fields == other.fields
    }
}

impl Document {
    /// Wrap already-cast fields, installing the schema's virtual getters.
    pub(crate) fn new(model: Model, fields: Map) -> Self {
        let virtuals = model
            .schema()
            .virtual_getters()
            .map(|(name, getter)| (name.to_string(), Memo::new(getter.clone())))
            .collect();
        Document {
            model,
            fields,
            virtuals,
            populated: HashMap::new(),
        }
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn id(&self) -> Option<&str> {
        self.fields.get(crate::schema::ID_PATH).and_then(|v| v.as_str())
    }

    /// Read a field or virtual path. Virtual values are computed once.
    pub fn get(&self, path: &str) -> Option<&Value> {
        let value = match self.virtuals.get(path) {
            Some(memo) => memo.get(&self.fields),
            None => get_path(&self.fields, path)?,
        };
        (!value.is_null()).then_some(value)
    }

    /// Assign a path. Virtual paths fan out through their setter right away.
    pub fn set(&mut self, path: &str, value: impl Into<Value>) -> &mut Self {
        let value = value.into();
        match self.model.schema().get_path(path) {
            Some(ty) if ty.is_virtual() => ty.assign_virtual(value, &mut self.fields),
            _ => set_path(&mut self.fields, path, value),
        }
        for memo in self.virtuals.values_mut() {
            memo.reset();
        }
        self
    }

    /// The stored fields, without virtuals or populated references.
    pub fn fields(&self) -> &Map {
        &self.fields
    }

    pub fn to_object(&self) -> Map {
        self.fields.clone()
    }

    pub fn into_fields(self) -> Map {
        self.fields
    }

    /// Fields plus evaluated virtuals, as JSON.
    pub fn to_json(&self) -> serde_json::Value {
        let mut out = self.fields.clone();
        for (name, memo) in &self.virtuals {
            let value = memo.get(&self.fields);
            if !value.is_null() {
                set_path(&mut out, name, value.clone());
            }
        }
        Value::Object(out).to_json()
    }

    /// Run a schema method with this document as context.
    pub fn call_method(&self, name: &str, args: &[Value]) -> Result<Value> {
        let method = self.model.schema().get_method(name).ok_or_else(|| {
            WarehouseError::Usage(format!(
                "model `{}` has no method `{name}`",
                self.model.name()
            ))
        })?;
        method(self, args)
    }

    fn require_id(&self) -> Result<String> {
        self.id().map(str::to_string).ok_or(WarehouseError::IdUndefined)
    }

    /// Insert or replace this document in its model.
    pub async fn save(&self) -> Result<Document> {
        self.model.save(self.to_object()).await
    }

    pub async fn update(&self, update: impl Into<Value>) -> Result<Document> {
        let id = self.require_id()?;
        self.model.update_by_id(&id, update).await
    }

    pub async fn replace(&self, doc: impl Into<Value>) -> Result<Document> {
        let id = self.require_id()?;
        self.model.replace_by_id(&id, doc).await
    }

    pub async fn remove(&self) -> Result<Document> {
        let id = self.require_id()?;
        self.model.remove_by_id(&id).await
    }

    /// Attach lazily resolved references. Unknown paths and target models
    /// fail here; the lookups themselves run on first access.
    pub fn populate(mut self, spec: impl Into<Population>) -> Result<Document> {
        for resolved in populate::resolve_all(&self.model, &spec.into())? {
            self.attach(&resolved);
        }
        Ok(self)
    }

    pub(crate) fn attach(&mut self, resolved: &populate::Resolved) {
        self.populated
            .insert(resolved.path().to_string(), Memo::new(resolved.compute()));
    }

    /// A populated reference, resolved (and cached) on first access.
    pub fn populated(&self, path: &str) -> Option<&Populated> {
        self.populated.get(path).map(|memo| memo.get(&self.fields))
    }
}

impl From<Document> for Value {
    fn from(doc: Document) -> Self {
        Value::Object(doc.fields)
    }
}

impl From<&Document> for Value {
    fn from(doc: &Document) -> Self {
        Value::Object(doc.fields.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Schema;
    use crate::types::SchemaType;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn people() -> (Model, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mut schema = Schema::new();
        schema.path("name.first", SchemaType::string());
        schema.path("name.last", SchemaType::string());
        schema.path(
            "fullName",
            SchemaType::virtual_field()
                .getter(move |doc| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    match (get_path(doc, "name.first"), get_path(doc, "name.last")) {
                        (Some(first), Some(last)) => Value::from(format!("{first} {last}")),
                        _ => Value::Null,
                    }
                })
                .setter(|doc, value| {
                    let text = value.to_string();
                    if let Some((first, last)) = text.split_once(' ') {
                        set_path(doc, "name.first", Value::from(first));
                        set_path(doc, "name.last", Value::from(last));
                    }
                }),
        );
        schema.method("greet", |doc, args| {
            let greeting = args.first().map(|v| v.to_string()).unwrap_or_default();
            let name = doc.get("name.first").map(|v| v.to_string()).unwrap_or_default();
            Ok(Value::from(format!("{greeting}, {name}")))
        });
        (Model::new("Person", schema), calls)
    }

    #[test]
    fn test_virtual_getter_is_memoized() {
        let (model, calls) = people();
        let doc = model
            .new_document(json!({"name": {"first": "Ada", "last": "Lovelace"}}))
            .unwrap();
        assert_eq!(doc.get("fullName"), Some(&Value::from("Ada Lovelace")));
        assert_eq!(doc.get("fullName"), Some(&Value::from("Ada Lovelace")));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_set_virtual_fans_out() {
        let (model, _) = people();
        let mut doc = model.new_document(json!({})).unwrap();
        doc.set("fullName", "Grace Hopper");
        assert_eq!(doc.get("name.first"), Some(&Value::from("Grace")));
        assert_eq!(doc.get("fullName"), Some(&Value::from("Grace Hopper")));
        assert!(doc.fields().get("fullName").is_none());
    }

    #[test]
    fn test_set_virtual_to_null_stores_nothing() {
        let (model, _) = people();
        let mut doc = model
            .new_document(json!({"_id": "a", "name": {"first": "Ada", "last": "L"}}))
            .unwrap();
        doc.set("fullName", Value::Null);
        assert_eq!(doc.fields().len(), 2);
        assert!(doc.fields().get("fullName").is_none());
        assert_eq!(doc.get("fullName"), Some(&Value::from("Ada L")));
    }

    #[test]
    fn test_to_json_includes_virtuals() {
        let (model, _) = people();
        let doc = model
            .new_document(json!({"_id": "a", "name": {"first": "Ada", "last": "L"}}))
            .unwrap();
        assert_eq!(
            doc.to_json(),
            json!({"_id": "a", "name": {"first": "Ada", "last": "L"}, "fullName": "Ada L"})
        );
    }

    #[test]
    fn test_call_method() {
        let (model, _) = people();
        let doc = model.new_document(json!({"name": {"first": "Ada"}})).unwrap();
        assert_eq!(
            doc.call_method("greet", &[Value::from("Hello")]).unwrap(),
            Value::from("Hello, Ada")
        );
        assert_eq!(doc.call_method("nope", &[]).unwrap_err().code(), "USAGE");
    }

    #[tokio::test]
    async fn test_save_round_trips_through_model() {
        let (model, _) = people();
        let mut doc = model.new_document(json!({"name": {"first": "Ada"}})).unwrap();
        let id = doc.id().unwrap().to_string();
        doc.save().await.unwrap();
        doc.set("name.first", "Augusta");
        doc.save().await.unwrap();

        assert_eq!(model.count(), 1);
        let stored = model.find_by_id(&id).unwrap();
        assert_eq!(stored.get("name.first"), Some(&Value::from("Augusta")));

        stored.remove().await.unwrap();
        assert_eq!(model.count(), 0);
    }
}
