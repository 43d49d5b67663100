//! A schema maps dotted field paths to [`SchemaType`]s and owns the four
//! per-document stacks (getters, setters, import, export), the query and
//! update compilers, statics, methods and lifecycle hooks.

pub mod definition;
mod hooks;
pub mod parser;
pub mod query;
pub mod update;

use crate::document::Document;
use crate::error::Result;
use crate::model::Model;
use crate::types::{SchemaType, VirtualGetter};
use crate::value::{get_path, remove_path, set_path, Map, Value};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

pub use definition::{DatabaseDefinition, FieldDefinition, FieldType, ModelDefinition};
pub use hooks::{Hook, HookKind, Hooks};
pub use parser::{parse_definition, parse_definition_str};
pub use query::{Predicate, Selector};
pub use update::UpdateStack;

/// Model-level function, called with the model as context.
pub type StaticFn = Arc<dyn Fn(&Model, &[Value]) -> Result<Value> + Send + Sync>;
/// Document-level function, called with the document as context.
pub type MethodFn = Arc<dyn Fn(&Document, &[Value]) -> Result<Value> + Send + Sync>;

pub const ID_PATH: &str = "_id";

#[derive(Clone)]
pub struct Schema {
    paths: HashMap<String, Arc<SchemaType>>,
    /// Definition order; every stack walks it.
    stack: Vec<String>,
    statics: HashMap<String, StaticFn>,
    methods: HashMap<String, MethodFn>,
    hooks: Hooks,
}

impl std::fmt::Debug for Schema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Schema")
            .field("paths", &self.stack)
            .field("statics", &self.statics.keys().collect::<Vec<_>>())
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::new()
    }
}

impl Schema {
    /// An empty schema with the implicit required `_id`.
    pub fn new() -> Self {
        let mut schema = Schema {
            paths: HashMap::new(),
            stack: Vec::new(),
            statics: HashMap::new(),
            methods: HashMap::new(),
            hooks: Hooks::default(),
        };
        schema.path(ID_PATH, SchemaType::cuid().required());
        schema
    }

    /// Build a schema from a parsed model definition.
    pub fn from_definition(definition: &ModelDefinition) -> Result<Self> {
        definition.to_schema()
    }

    /// Add several paths at once, in iteration order.
    pub fn add<I, K>(&mut self, fields: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, SchemaType)>,
        K: AsRef<str>,
    {
        for (name, ty) in fields {
            self.path(name.as_ref(), ty);
        }
        self
    }

    /// Define (or redefine) a path. Missing parents of a dotted path are
    /// registered as objects first.
    pub fn path(&mut self, name: &str, ty: SchemaType) -> &mut Self {
        let mut parent = String::new();
        let segments: Vec<&str> = name.split('.').collect();
        for segment in &segments[..segments.len().saturating_sub(1)] {
            if !parent.is_empty() {
                parent.push('.');
            }
            parent.push_str(segment);
            if !self.paths.contains_key(&parent) {
                let object = SchemaType::object();
                self.insert(parent.clone(), object);
            }
        }
        self.insert(name.to_string(), ty);
        self
    }

    fn insert(&mut self, name: String, ty: SchemaType) {
        let ty = Arc::new(ty.with_name(&name));
        if self.paths.insert(name.clone(), ty).is_none() {
            self.stack.push(name);
        }
    }

    /// Define a virtual path with a computed getter.
    pub fn virtual_path<F>(&mut self, name: &str, getter: F) -> &mut Self
    where
        F: Fn(&Map) -> Value + Send + Sync + 'static,
    {
        self.path(name, SchemaType::virtual_field().getter(getter))
    }

    pub fn get_path(&self, name: &str) -> Option<&SchemaType> {
        self.paths.get(name).map(|ty| ty.as_ref())
    }

    /// Paths in definition order.
    pub fn paths(&self) -> impl Iterator<Item = (&str, &SchemaType)> {
        self.stack
            .iter()
            .filter_map(|name| self.paths.get(name).map(|ty| (name.as_str(), ty.as_ref())))
    }

    /// The type governing `path`; untyped paths behave as Mixed.
    pub fn type_for(&self, path: &str) -> Arc<SchemaType> {
        self.paths
            .get(path)
            .cloned()
            .unwrap_or_else(|| Arc::new(SchemaType::mixed().with_name(path)))
    }

    pub(crate) fn virtual_getters(&self) -> impl Iterator<Item = (&str, &VirtualGetter)> {
        self.paths()
            .filter_map(|(name, ty)| ty.virtual_getter().map(|g| (name, g)))
    }

    // ── Statics, methods, hooks ──────────────────────────────────────

    pub fn static_fn<F>(&mut self, name: &str, f: F) -> &mut Self
    where
        F: Fn(&Model, &[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        self.statics.insert(name.to_string(), Arc::new(f));
        self
    }

    pub fn method<F>(&mut self, name: &str, f: F) -> &mut Self
    where
        F: Fn(&Document, &[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        self.methods.insert(name.to_string(), Arc::new(f));
        self
    }

    pub(crate) fn get_static(&self, name: &str) -> Option<&StaticFn> {
        self.statics.get(name)
    }

    pub(crate) fn get_method(&self, name: &str) -> Option<&MethodFn> {
        self.methods.get(name)
    }

    /// Register a hook that runs before documents are saved or removed.
    pub fn pre<F, Fut>(&mut self, kind: HookKind, f: F) -> &mut Self
    where
        F: Fn(Document) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.hooks.pre(kind).push(hooks::boxed(f));
        self
    }

    /// Register a hook that runs after documents are saved or removed.
    pub fn post<F, Fut>(&mut self, kind: HookKind, f: F) -> &mut Self
    where
        F: Fn(Document) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.hooks.post(kind).push(hooks::boxed(f));
        self
    }

    pub fn hooks(&self) -> &Hooks {
        &self.hooks
    }

    // ── Stacks ───────────────────────────────────────────────────────

    /// Cast every path in definition order, filling in defaults.
    pub fn apply_getters(&self, doc: &mut Map) {
        for (name, ty) in self.paths() {
            if ty.is_virtual() {
                continue;
            }
            let current = get_path(doc, name).cloned().unwrap_or(Value::Null);
            let cast = ty.cast(current);
            if !cast.is_null() {
                set_path(doc, name, cast);
            }
        }
    }

    /// Validate every path in definition order. Null results remove the
    /// field; virtual paths fan their assigned value out to siblings.
    pub fn apply_setters(&self, doc: &mut Map) -> Result<()> {
        for (name, ty) in self.paths() {
            let current = get_path(doc, name).cloned().unwrap_or(Value::Null);
            let validated = ty.validate(current, doc)?;
            if validated.is_null() {
                remove_path(doc, name);
            } else {
                set_path(doc, name, validated);
            }
        }
        Ok(())
    }

    /// Persisted representation to runtime values.
    pub fn apply_import(&self, doc: &mut Map) {
        for (name, ty) in self.paths() {
            if let Some(current) = get_path(doc, name).cloned() {
                let parsed = ty.parse(current);
                set_path(doc, name, parsed);
            }
        }
    }

    /// Runtime values to their persisted representation.
    pub fn apply_export(&self, doc: &mut Map) {
        for (name, ty) in self.paths() {
            let current = get_path(doc, name).cloned().unwrap_or(Value::Null);
            let exported = ty.export(current);
            if exported.is_null() {
                remove_path(doc, name);
            } else {
                set_path(doc, name, exported);
            }
        }
    }

    // ── Compilers ────────────────────────────────────────────────────

    pub fn compile_query(&self, selector: &Selector) -> Result<Predicate> {
        query::compile(self, selector)
    }

    pub fn compile_update(&self, update: &Value) -> Result<UpdateStack> {
        update::compile(self, update)
    }
}
