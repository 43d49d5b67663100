//! Models: named, schema-bound, in-memory collections of documents.
//!
//! Writes are serialized per model through a FIFO [`Mutex`]; reads clone
//! the stored values and never wait for writers.

mod events;
pub mod populate;

use crate::database::{Database, DatabaseInner};
use crate::document::Document;
use crate::error::{Result, WarehouseError};
use crate::mutex::Mutex;
use crate::query::{Query, SortSpec};
use crate::schema::{HookKind, Schema, Selector, ID_PATH};
use crate::value::{Map, Value};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};

pub use events::{EventKind, Listener};
pub use populate::{PopulateSpec, Populated, Population};

/// Leading matches to drop and the maximum number to return.
#[derive(Debug, Clone, Copy, Default)]
pub struct FindOptions {
    pub skip: usize,
    pub limit: Option<usize>,
}

impl FindOptions {
    pub fn skip(mut self, skip: usize) -> Self {
        self.skip = skip;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Stored entries in insertion order. `None` slots are tombstones.
#[derive(Default)]
struct ModelData {
    order: Vec<String>,
    slots: HashMap<String, Option<Map>>,
    length: usize,
}

impl ModelData {
    fn get(&self, id: &str) -> Option<&Map> {
        self.slots.get(id).and_then(|slot| slot.as_ref())
    }

    fn live(&self) -> impl Iterator<Item = &Map> {
        self.order.iter().filter_map(|id| self.get(id))
    }

    fn put(&mut self, id: &str, fields: Map) {
        match self.slots.insert(id.to_string(), Some(fields)) {
            None => {
                self.order.push(id.to_string());
                self.length += 1;
            }
            Some(None) => self.length += 1,
            Some(Some(_)) => {}
        }
    }

    fn tombstone(&mut self, id: &str) {
        if let Some(slot) = self.slots.get_mut(id) {
            if slot.take().is_some() {
                self.length -= 1;
            }
        }
    }
}

struct ModelInner {
    name: String,
    schema: Arc<Schema>,
    data: RwLock<ModelData>,
    mutex: Mutex,
    listeners: RwLock<events::Listeners>,
    database: Weak<DatabaseInner>,
}

#[derive(Clone)]
pub struct Model {
    inner: Arc<ModelInner>,
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("name", &self.inner.name)
            .field("length", &self.count())
            .finish()
    }
}

fn into_fields(value: Value) -> Result<Map> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(WarehouseError::Usage(format!(
            "documents must be objects, got {}",
            other.type_name()
        ))),
    }
}

fn id_of(fields: &Map) -> Option<String> {
    match fields.get(ID_PATH)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(Value::Number(*n).to_string()),
        _ => None,
    }
}

impl Model {
    /// A model outside any database. Population is unavailable.
    pub fn new(name: impl Into<String>, schema: Schema) -> Self {
        Self::attached(name.into(), Arc::new(schema), Weak::new())
    }

    pub(crate) fn attached(name: String, schema: Arc<Schema>, database: Weak<DatabaseInner>) -> Self {
        Model {
            inner: Arc::new(ModelInner {
                name,
                schema,
                data: RwLock::new(ModelData::default()),
                mutex: Mutex::new(),
                listeners: RwLock::new(events::Listeners::default()),
                database,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn schema(&self) -> &Schema {
        &self.inner.schema
    }

    /// The owning database, if it is still alive.
    pub fn database(&self) -> Option<Database> {
        self.inner.database.upgrade().map(Database::from_inner)
    }

    pub fn same_model(&self, other: &Model) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    // ── Reads ────────────────────────────────────────────────────────

    /// Build a document from `value` without storing it: casts, fills in
    /// defaults and generates a missing id.
    pub fn new_document(&self, value: impl Into<Value>) -> Result<Document> {
        let fields = into_fields(value.into())?;
        Ok(self.materialize(fields))
    }

    fn materialize(&self, mut fields: Map) -> Document {
        self.inner.schema.apply_getters(&mut fields);
        Document::new(self.clone(), fields)
    }

    fn stored(&self, id: &str) -> Option<Map> {
        self.inner.data.read().get(id).cloned()
    }

    fn is_stored(&self, id: &str) -> bool {
        self.inner.data.read().get(id).is_some()
    }

    /// Deep copies of the live entries, in insertion order.
    fn snapshot(&self) -> Vec<Map> {
        self.inner.data.read().live().cloned().collect()
    }

    /// Number of live documents.
    pub fn count(&self) -> usize {
        self.inner.data.read().length
    }

    pub fn len(&self) -> usize {
        self.count()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    pub fn find_by_id(&self, id: &str) -> Option<Document> {
        self.stored(id).map(|fields| self.materialize(fields))
    }

    /// All live documents as a query.
    pub fn query(&self) -> Query<Document> {
        let docs = self
            .snapshot()
            .into_iter()
            .map(|fields| self.materialize(fields))
            .collect();
        Query::new(self.clone(), docs)
    }

    pub fn to_array(&self) -> Vec<Document> {
        self.query().into_vec()
    }

    fn scan(&self, selector: Selector, options: FindOptions) -> Result<Vec<Map>> {
        let predicate = self.inner.schema.compile_query(&selector)?;
        let data = self.inner.data.read();
        let matches = data.live().filter(|fields| predicate.test(fields)).skip(options.skip);
        Ok(match options.limit {
            Some(limit) => matches.take(limit).cloned().collect(),
            None => matches.cloned().collect(),
        })
    }

    pub fn find(&self, selector: impl Into<Selector>, options: FindOptions) -> Result<Query<Document>> {
        let docs = self
            .scan(selector.into(), options)?
            .into_iter()
            .map(|fields| self.materialize(fields))
            .collect();
        Ok(Query::new(self.clone(), docs))
    }

    /// Like [`Model::find`], returning plain field maps.
    pub fn find_lean(&self, selector: impl Into<Selector>, options: FindOptions) -> Result<Query<Map>> {
        let items = self
            .scan(selector.into(), options)?
            .into_iter()
            .map(|mut fields| {
                self.inner.schema.apply_getters(&mut fields);
                fields
            })
            .collect();
        Ok(Query::new(self.clone(), items))
    }

    pub fn find_one(&self, selector: impl Into<Selector>) -> Result<Option<Document>> {
        let mut found = self.scan(selector.into(), FindOptions::default().limit(1))?;
        Ok(found.pop().map(|fields| self.materialize(fields)))
    }

    pub fn eq(&self, index: isize) -> Option<Document> {
        self.query().eq(index)
    }

    pub fn first(&self) -> Option<Document> {
        self.query().first()
    }

    pub fn last(&self) -> Option<Document> {
        self.query().last()
    }

    pub fn slice(&self, start: isize, end: Option<isize>) -> Query<Document> {
        self.query().slice(start, end)
    }

    pub fn limit(&self, n: usize) -> Query<Document> {
        self.query().limit(n)
    }

    pub fn skip(&self, n: usize) -> Query<Document> {
        self.query().skip(n)
    }

    pub fn sort(&self, spec: impl Into<SortSpec>) -> Query<Document> {
        self.query().sort(spec)
    }

    pub fn reverse(&self) -> Query<Document> {
        self.query().reverse()
    }

    pub fn shuffle(&self) -> Query<Document> {
        self.query().shuffle()
    }

    pub fn map<U, F>(&self, f: F) -> Vec<U>
    where
        F: FnMut(&Document, usize) -> U,
    {
        self.query().map(f)
    }

    pub fn reduce<A, F>(&self, init: A, f: F) -> A
    where
        F: FnMut(A, &Document, usize) -> A,
    {
        self.query().reduce(init, f)
    }

    pub fn reduce_right<A, F>(&self, init: A, f: F) -> A
    where
        F: FnMut(A, &Document, usize) -> A,
    {
        self.query().reduce_right(init, f)
    }

    pub fn filter<F>(&self, f: F) -> Query<Document>
    where
        F: FnMut(&Document, usize) -> bool,
    {
        self.query().filter(f)
    }

    pub fn every<F>(&self, f: F) -> bool
    where
        F: FnMut(&Document, usize) -> bool,
    {
        self.query().every(f)
    }

    pub fn some<F>(&self, f: F) -> bool
    where
        F: FnMut(&Document, usize) -> bool,
    {
        self.query().some(f)
    }

    /// Every document with the given references attached.
    pub fn populate(&self, spec: impl Into<Population>) -> Result<Query<Document>> {
        self.query().populate(spec)
    }

    // ── Writes ───────────────────────────────────────────────────────

    pub async fn insert_one(&self, doc: impl Into<Value>) -> Result<Document> {
        let fields = into_fields(doc.into())?;
        let _guard = self.inner.mutex.acquire().await;
        self.insert_locked(fields).await
    }

    /// Insert in order, stopping at the first failure. Earlier inserts stay committed.
    pub async fn insert<I, V>(&self, docs: I) -> Result<Vec<Document>>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let mut out = Vec::new();
        for doc in docs {
            out.push(self.insert_one(doc).await?);
        }
        Ok(out)
    }

    /// Insert, or replace the stored document with the same id.
    pub async fn save(&self, doc: impl Into<Value>) -> Result<Document> {
        let fields = into_fields(doc.into())?;
        let _guard = self.inner.mutex.acquire().await;
        match id_of(&fields) {
            Some(id) if self.is_stored(&id) => self.replace_locked(&id, fields).await,
            _ => self.insert_locked(fields).await,
        }
    }

    pub async fn update_by_id(&self, id: &str, update: impl Into<Value>) -> Result<Document> {
        let stack = self.inner.schema.compile_update(&update.into())?;
        let _guard = self.inner.mutex.acquire().await;
        let mut fields = self
            .stored(id)
            .ok_or_else(|| WarehouseError::IdNotExist(id.to_string()))?;
        stack.apply(&mut fields)?;
        self.replace_locked(id, fields).await
    }

    pub async fn replace_by_id(&self, id: &str, doc: impl Into<Value>) -> Result<Document> {
        let fields = into_fields(doc.into())?;
        let _guard = self.inner.mutex.acquire().await;
        if !self.is_stored(id) {
            return Err(WarehouseError::IdNotExist(id.to_string()));
        }
        self.replace_locked(id, fields).await
    }

    pub async fn remove_by_id(&self, id: &str) -> Result<Document> {
        let _guard = self.inner.mutex.acquire().await;
        let fields = self
            .stored(id)
            .ok_or_else(|| WarehouseError::IdNotExist(id.to_string()))?;
        let doc = self.materialize(fields);

        self.inner.schema.hooks().run_pre(HookKind::Remove, &doc).await?;
        self.inner.data.write().tombstone(id);
        log::debug!("Removed {} from {}", id, self.inner.name);
        self.emit(EventKind::Remove, &doc);
        self.after(HookKind::Remove, &doc).await?;
        Ok(doc)
    }

    pub async fn update(&self, selector: impl Into<Selector>, update: impl Into<Value>) -> Result<Vec<Document>> {
        self.find(selector, FindOptions::default())?.update(update).await
    }

    pub async fn replace(&self, selector: impl Into<Selector>, doc: impl Into<Value>) -> Result<Vec<Document>> {
        self.find(selector, FindOptions::default())?.replace(doc).await
    }

    pub async fn remove(&self, selector: impl Into<Selector>) -> Result<Vec<Document>> {
        self.find(selector, FindOptions::default())?.remove().await
    }

    /// Caller holds the guard.
    async fn insert_locked(&self, mut fields: Map) -> Result<Document> {
        let schema = &self.inner.schema;
        schema.apply_getters(&mut fields);
        let id = id_of(&fields).ok_or(WarehouseError::IdUndefined)?;
        if self.is_stored(&id) {
            return Err(WarehouseError::IdExist(id));
        }
        schema.apply_setters(&mut fields)?;
        self.commit(&id, fields, EventKind::Insert).await
    }

    /// Caller holds the guard and has checked that `id` is stored.
    async fn replace_locked(&self, id: &str, mut fields: Map) -> Result<Document> {
        let schema = &self.inner.schema;
        fields.insert(ID_PATH.to_string(), Value::from(id));
        schema.apply_getters(&mut fields);
        schema.apply_setters(&mut fields)?;
        self.commit(id, fields, EventKind::Update).await
    }

    /// Pre-save hooks, store, emit, post-save hooks.
    async fn commit(&self, id: &str, fields: Map, event: EventKind) -> Result<Document> {
        let doc = self.materialize(fields.clone());
        self.inner.schema.hooks().run_pre(HookKind::Save, &doc).await?;
        self.inner.data.write().put(id, fields);
        log::debug!("Stored {} in {} ({:?})", id, self.inner.name, event);
        self.emit(event, &doc);
        self.after(HookKind::Save, &doc).await?;
        Ok(doc)
    }

    /// Post hooks run after the commit; their failure does not undo it.
    async fn after(&self, kind: HookKind, doc: &Document) -> Result<()> {
        if let Err(e) = self.inner.schema.hooks().run_post(kind, doc).await {
            log::warn!(
                "post-{:?} hook failed for {:?} in {}: {}",
                kind,
                doc.id(),
                self.inner.name,
                e
            );
            return Err(e);
        }
        Ok(())
    }

    // ── Events, statics, lifecycle ───────────────────────────────────

    /// Subscribe to write events. Listeners run synchronously after each commit.
    pub fn on<F>(&self, event: EventKind, listener: F)
    where
        F: Fn(&Document) + Send + Sync + 'static,
    {
        self.inner.listeners.write().add(event, Arc::new(listener));
    }

    fn emit(&self, event: EventKind, doc: &Document) {
        let listeners = self.inner.listeners.read().get(event);
        for listener in listeners {
            listener(doc);
        }
    }

    /// Run a schema static with this model as context.
    pub fn call_static(&self, name: &str, args: &[Value]) -> Result<Value> {
        let f = self.inner.schema.get_static(name).ok_or_else(|| {
            WarehouseError::Usage(format!("model `{}` has no static `{name}`", self.inner.name))
        })?;
        f(self, args)
    }

    /// Unregister from the owning database.
    pub fn destroy(&self) {
        if let Some(database) = self.database() {
            database.remove_model(&self.inner.name);
        }
    }

    // ── Persistence boundary ─────────────────────────────────────────

    /// Live documents through the export stack, in insertion order.
    pub fn export(&self) -> Vec<serde_json::Value> {
        self.snapshot()
            .into_iter()
            .map(|mut fields| {
                self.inner.schema.apply_export(&mut fields);
                Value::Object(fields).to_json()
            })
            .collect()
    }

    /// Replace the stored data with persisted documents, run through the
    /// import stack.
    pub async fn import<I>(&self, docs: I) -> Result<()>
    where
        I: IntoIterator<Item = serde_json::Value>,
    {
        let mut data = ModelData::default();
        for doc in docs {
            let mut fields = into_fields(Value::from(doc))?;
            self.inner.schema.apply_import(&mut fields);
            let id = id_of(&fields).ok_or(WarehouseError::IdUndefined)?;
            data.put(&id, fields);
        }
        let _guard = self.inner.mutex.acquire().await;
        log::debug!("Imported {} documents into {}", data.length, self.inner.name);
        *self.inner.data.write() = data;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SchemaType;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn people() -> Model {
        let mut schema = Schema::new();
        schema.add([
            ("name", SchemaType::string()),
            ("age", SchemaType::number()),
            ("comments", SchemaType::array(SchemaType::number())),
        ]);
        Model::new("Person", schema)
    }

    fn ids(docs: &Query<Document>) -> Vec<String> {
        docs.iter().filter_map(|d| d.id().map(str::to_string)).collect()
    }

    #[tokio::test]
    async fn test_insert_and_find_by_id() {
        let model = people();
        let doc = model.insert_one(json!({"name": "Ada", "age": "36"})).await.unwrap();
        let id = doc.id().unwrap().to_string();
        assert_eq!(doc.get("age"), Some(&Value::from(36)));
        assert_eq!(doc.get("comments"), Some(&Value::Array(vec![])));

        let found = model.find_by_id(&id).unwrap();
        assert_eq!(found, doc);
        assert_eq!(model.count(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_id_is_rejected() {
        let model = people();
        model.insert_one(json!({"_id": "a"})).await.unwrap();
        let err = model.insert_one(json!({"_id": "a"})).await.unwrap_err();
        assert_eq!(err.code(), "ID_EXIST");
        assert_eq!(model.count(), 1);
    }

    #[tokio::test]
    async fn test_missing_id_is_rejected() {
        let mut schema = Schema::new();
        schema.path("_id", SchemaType::string());
        let model = Model::new("Loose", schema);
        let err = model.insert_one(json!({"name": "x"})).await.unwrap_err();
        assert_eq!(err.code(), "ID_UNDEFINED");
    }

    #[tokio::test]
    async fn test_validation_error_leaves_data_untouched() {
        let model = people();
        let err = model.insert_one(json!({"_id": "a", "age": "old"})).await.unwrap_err();
        assert_eq!(err.code(), "VALIDATION");
        assert_eq!(model.count(), 0);
        assert!(model.find_by_id("a").is_none());
    }

    #[tokio::test]
    async fn test_update_by_id() {
        let model = people();
        model
            .insert_one(json!({"_id": "a", "age": 10, "comments": [1, 2, 3]}))
            .await
            .unwrap();
        let doc = model
            .update_by_id("a", json!({"$inc": {"age": 5}, "comments": {"$pull": 2}}))
            .await
            .unwrap();
        assert_eq!(doc.get("age"), Some(&Value::from(15)));
        assert_eq!(doc.get("comments"), Some(&Value::from(json!([1, 3]))));

        let err = model.update_by_id("missing", json!({"age": 1})).await.unwrap_err();
        assert_eq!(err.code(), "ID_NOT_EXIST");
    }

    #[tokio::test]
    async fn test_failed_update_does_not_commit() {
        let model = people();
        model.insert_one(json!({"_id": "a", "age": 10})).await.unwrap();
        let err = model.update_by_id("a", json!({"age": "x"})).await.unwrap_err();
        assert_eq!(err.code(), "VALIDATION");
        assert_eq!(model.find_by_id("a").unwrap().get("age"), Some(&Value::from(10)));
    }

    #[tokio::test]
    async fn test_replace_forces_id() {
        let model = people();
        model.insert_one(json!({"_id": "a", "name": "x", "age": 1})).await.unwrap();
        let doc = model
            .replace_by_id("a", json!({"_id": "other", "name": "y"}))
            .await
            .unwrap();
        assert_eq!(doc.id(), Some("a"));
        assert_eq!(doc.get("age"), None);
        assert_eq!(model.count(), 1);
    }

    #[tokio::test]
    async fn test_tombstones_keep_slot_order() {
        let model = people();
        for id in ["a", "b", "c"] {
            model.insert_one(json!({"_id": id})).await.unwrap();
        }
        model.remove_by_id("b").await.unwrap();
        assert_eq!(model.count(), 2);
        assert_eq!(ids(&model.query()), vec!["a", "c"]);
        assert_eq!(
            model.remove_by_id("b").await.unwrap_err().code(),
            "ID_NOT_EXIST"
        );

        model.insert_one(json!({"_id": "b"})).await.unwrap();
        assert_eq!(model.count(), 3);
        assert_eq!(ids(&model.query()), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_save_upserts() {
        let model = people();
        let doc = model.save(json!({"name": "x"})).await.unwrap();
        let id = doc.id().unwrap().to_string();
        model.save(json!({"_id": id, "name": "y"})).await.unwrap();
        model.save(json!({"_id": "given", "name": "z"})).await.unwrap();
        assert_eq!(model.count(), 2);
        assert_eq!(model.find_by_id(&id).unwrap().get("name"), Some(&Value::from("y")));
    }

    #[tokio::test]
    async fn test_find_with_options() {
        let model = people();
        model
            .insert([json!({"age": 10}), json!({"age": 20}), json!({"age": 30})])
            .await
            .unwrap();
        let ages = |q: Query<Document>| q.map(|d, _| d.get("age").and_then(|v| v.as_f64()));
        assert_eq!(
            ages(model.find(json!({"age": {"$gt": 15}}), FindOptions::default()).unwrap()),
            vec![Some(20.0), Some(30.0)]
        );
        assert_eq!(
            ages(model.find(json!({"$or": [{"age": 10}, {"age": 30}]}), FindOptions::default()).unwrap()),
            vec![Some(10.0), Some(30.0)]
        );
        assert_eq!(
            ages(model.find(Selector::all(), FindOptions::default().skip(1).limit(1)).unwrap()),
            vec![Some(20.0)]
        );
        let lean = model.find_lean(json!({"age": 20}), FindOptions::default()).unwrap();
        assert_eq!(lean.first().unwrap().get("age"), Some(&Value::from(20)));
        let one = model.find_one(json!({"age": {"$lt": 25}})).unwrap().unwrap();
        assert_eq!(one.get("age"), Some(&Value::from(10)));
    }

    #[tokio::test]
    async fn test_selector_writes() {
        let model = people();
        model
            .insert([json!({"age": 10}), json!({"age": 20}), json!({"age": 30})])
            .await
            .unwrap();
        let updated = model.update(json!({"age": {"$gte": 20}}), json!({"$inc": {"age": 1}})).await.unwrap();
        assert_eq!(updated.len(), 2);
        let removed = model.remove(json!({"age": 10})).await.unwrap();
        assert_eq!(removed.len(), 1);
        assert_eq!(model.count(), 2);
        assert!(model.every(|d, _| d.get("age").and_then(|v| v.as_f64()).unwrap_or(0.0) > 20.0));
    }

    #[tokio::test]
    async fn test_update_runs_operators_in_written_order() {
        let model = people();
        model.insert_one(json!({"_id": "a", "age": 10})).await.unwrap();
        let doc = model
            .update_by_id("a", json!({"$set": {"age": 1}, "$inc": {"age": 5}}))
            .await
            .unwrap();
        assert_eq!(doc.get("age"), Some(&Value::from(6)));
    }

    #[tokio::test]
    async fn test_date_shift_out_of_range_is_rejected() {
        let mut schema = Schema::new();
        schema.add([("date", SchemaType::date())]);
        let model = Model::new("Event", schema);
        model.insert_one(json!({"_id": "a", "date": "2020-01-01T00:00:00.000Z"})).await.unwrap();
        let err = model
            .update_by_id("a", json!({"$inc": {"date": -1e300}}))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "VALIDATION");
        let stored = model.find_by_id("a").unwrap();
        assert_eq!(
            stored.get("date").and_then(|d| d.as_date()).map(|d| d.timestamp_millis()),
            Some(1_577_836_800_000)
        );
    }

    #[tokio::test]
    async fn test_replace_by_selector() {
        let model = people();
        model
            .insert([
                json!({"_id": "a", "name": "x", "age": 10, "comments": [1]}),
                json!({"_id": "b", "name": "y", "age": 20}),
                json!({"_id": "c", "name": "z", "age": 30}),
            ])
            .await
            .unwrap();
        let replaced = model
            .replace(json!({"age": {"$gte": 20}}), json!({"_id": "ignored", "name": "new"}))
            .await
            .unwrap();
        assert_eq!(replaced.iter().filter_map(|d| d.id()).collect::<Vec<_>>(), vec!["b", "c"]);
        for id in ["b", "c"] {
            let doc = model.find_by_id(id).unwrap();
            assert_eq!(doc.get("name"), Some(&Value::from("new")));
            assert_eq!(doc.get("age"), None);
        }
        assert!(model.find_by_id("ignored").is_none());
        assert_eq!(model.find_by_id("a").unwrap().get("age"), Some(&Value::from(10)));
        assert_eq!(model.count(), 3);

        // Query-level replace delegates per item the same way.
        let query = model.find(json!({"name": "x"}), FindOptions::default()).unwrap();
        let out = query.replace(json!({"age": 99})).await.unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id(), Some("a"));
        let a = model.find_by_id("a").unwrap();
        assert_eq!(a.get("age"), Some(&Value::from(99)));
        assert_eq!(a.get("name"), None);
    }

    #[tokio::test]
    async fn test_events() {
        let model = people();
        let seen = Arc::new(AtomicUsize::new(0));
        for kind in [EventKind::Insert, EventKind::Update, EventKind::Remove] {
            let seen = seen.clone();
            model.on(kind, move |_| {
                seen.fetch_add(1, Ordering::SeqCst);
            });
        }
        model.insert_one(json!({"_id": "a"})).await.unwrap();
        model.update_by_id("a", json!({"age": 1})).await.unwrap();
        model.remove_by_id("a").await.unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 3);
        assert_eq!("nope".parse::<EventKind>().unwrap_err().code(), "USAGE");
    }

    #[test]
    fn test_call_static() {
        let mut schema = Schema::new();
        schema.static_fn("total", |model, _| Ok(Value::from(model.count())));
        let model = Model::new("Thing", schema);
        assert_eq!(model.call_static("total", &[]).unwrap(), Value::from(0usize));
        assert_eq!(model.call_static("missing", &[]).unwrap_err().code(), "USAGE");
    }

    #[tokio::test]
    async fn test_export_import_round_trip() {
        let mut schema = Schema::new();
        schema.add([
            ("published", SchemaType::boolean()),
            ("date", SchemaType::date()),
            ("raw", SchemaType::buffer()),
        ]);
        let model = Model::new("Post", schema.clone());
        model
            .insert_one(json!({"_id": "a", "published": true, "date": "2020-01-01", "raw": "ff00"}))
            .await
            .unwrap();
        let exported = model.export();
        assert_eq!(
            exported,
            vec![json!({"_id": "a", "published": 1, "date": "2020-01-01T00:00:00.000Z", "raw": "ff00"})]
        );

        let copy = Model::new("Post", schema);
        copy.import(exported).await.unwrap();
        assert_eq!(copy.count(), 1);
        assert_eq!(copy.find_by_id("a").unwrap(), model.find_by_id("a").unwrap());
    }
}
