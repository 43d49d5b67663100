//! Population: resolving stored ids into documents of another model.

use super::Model;
use crate::document::Document;
use crate::error::{Result, WarehouseError};
use crate::query::{Query, SortSpec};
use crate::schema::{Predicate, Selector};
use crate::types::TypeKind;
use crate::value::{get_path, Map, Value};
use std::sync::Arc;

/// One path to populate, with optional filtering of array references.
#[derive(Debug, Clone, Default)]
pub struct PopulateSpec {
    pub path: String,
    /// Target model; defaults to the path's `ref` option.
    pub model: Option<String>,
    pub matcher: Option<Selector>,
    pub sort: Option<SortSpec>,
    pub skip: usize,
    pub limit: Option<usize>,
}

impl PopulateSpec {
    pub fn new(path: impl Into<String>) -> Self {
        PopulateSpec {
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn matching(mut self, selector: impl Into<Selector>) -> Self {
        self.matcher = Some(selector.into());
        self
    }

    pub fn sort(mut self, sort: impl Into<SortSpec>) -> Self {
        self.sort = Some(sort.into());
        self
    }

    pub fn skip(mut self, skip: usize) -> Self {
        self.skip = skip;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    fn from_object(map: &Map) -> Result<Self> {
        let path = map
            .get("path")
            .and_then(|v| v.as_str())
            .ok_or_else(|| WarehouseError::Population("population spec needs a `path`".into()))?;
        let mut spec = PopulateSpec::new(path);
        spec.model = map.get("model").and_then(|v| v.as_str()).map(str::to_string);
        spec.matcher = map.get("match").cloned().map(Selector::from);
        spec.sort = map.get("sort").cloned().map(SortSpec::from);
        spec.skip = map.get("skip").and_then(|v| v.as_f64()).unwrap_or(0.0).max(0.0) as usize;
        spec.limit = map.get("limit").and_then(|v| v.as_f64()).map(|n| n.max(0.0) as usize);
        Ok(spec)
    }
}

/// A list of paths to populate.
#[derive(Debug, Clone, Default)]
pub struct Population(pub Vec<PopulateSpec>);

impl Population {
    /// Accepts a path string (space separated), a spec object, or an array of either.
    pub fn from_value(value: &Value) -> Result<Self> {
        let mut specs = Vec::new();
        collect(value, &mut specs)?;
        Ok(Population(specs))
    }
}

fn collect(value: &Value, out: &mut Vec<PopulateSpec>) -> Result<()> {
    match value {
        Value::String(paths) => out.extend(paths.split_whitespace().map(PopulateSpec::new)),
        Value::Object(map) => out.push(PopulateSpec::from_object(map)?),
        Value::Array(items) => {
            for item in items {
                collect(item, out)?;
            }
        }
        other => {
            return Err(WarehouseError::Population(format!(
                "invalid population spec: {}",
                other.type_name()
            )))
        }
    }
    Ok(())
}

impl From<&str> for Population {
    fn from(paths: &str) -> Self {
        Population(paths.split_whitespace().map(PopulateSpec::new).collect())
    }
}

impl From<String> for Population {
    fn from(paths: String) -> Self {
        Population::from(paths.as_str())
    }
}

impl From<PopulateSpec> for Population {
    fn from(spec: PopulateSpec) -> Self {
        Population(vec![spec])
    }
}

impl From<Vec<PopulateSpec>> for Population {
    fn from(specs: Vec<PopulateSpec>) -> Self {
        Population(specs)
    }
}

/// The result of a populated path.
#[derive(Debug, Clone)]
pub enum Populated {
    One(Option<Document>),
    Many(Query<Document>),
}

impl Populated {
    pub fn one(&self) -> Option<&Document> {
        match self {
            Populated::One(doc) => doc.as_ref(),
            Populated::Many(_) => None,
        }
    }

    pub fn many(&self) -> Option<&Query<Document>> {
        match self {
            Populated::Many(query) => Some(query),
            Populated::One(_) => None,
        }
    }
}

/// A population spec checked against the schema and registry.
pub(crate) struct Resolved {
    spec: PopulateSpec,
    target: Model,
    many: bool,
    matcher: Option<Arc<Predicate>>,
}

impl Resolved {
    pub(crate) fn path(&self) -> &str {
        &self.spec.path
    }

    pub(crate) fn compute(&self) -> Arc<dyn Fn(&Map) -> Populated + Send + Sync> {
        let spec = self.spec.clone();
        let target = self.target.clone();
        let many = self.many;
        let matcher = self.matcher.clone();
        Arc::new(move |fields: &Map| {
            let stored = get_path(fields, &spec.path);
            if !many {
                let doc = stored.and_then(|v| v.as_str()).and_then(|id| target.find_by_id(id));
                return Populated::One(doc);
            }
            let docs = stored
                .and_then(|v| v.as_array())
                .map(|ids| {
                    ids.iter()
                        .filter_map(|id| id.as_str())
                        .filter_map(|id| target.find_by_id(id))
                        .filter(|doc| matcher.as_ref().map_or(true, |p| p.test(doc.fields())))
                        .collect()
                })
                .unwrap_or_default();
            let mut query = Query::new(target.clone(), docs);
            if let Some(sort) = &spec.sort {
                query = query.sort(sort.clone());
            }
            query = query.skip(spec.skip);
            if let Some(limit) = spec.limit {
                query = query.limit(limit);
            }
            Populated::Many(query)
        })
    }
}

fn resolve(model: &Model, spec: &PopulateSpec) -> Result<Resolved> {
    let ty = model.schema().get_path(&spec.path).ok_or_else(|| {
        WarehouseError::Population(format!(
            "`{}` is not a path of model `{}`",
            spec.path,
            model.name()
        ))
    })?;
    let target_name = spec
        .model
        .clone()
        .or_else(|| ty.reference_target().map(str::to_string))
        .ok_or_else(|| {
            WarehouseError::Population(format!("no model is referenced by `{}`", spec.path))
        })?;
    let database = model.database().ok_or_else(|| {
        WarehouseError::Population(format!(
            "model `{}` is not attached to a database",
            model.name()
        ))
    })?;
    let target = database.get(&target_name).map_err(|_| {
        WarehouseError::Population(format!("model `{target_name}` does not exist"))
    })?;
    let matcher = match &spec.matcher {
        Some(selector) => Some(Arc::new(target.schema().compile_query(selector)?)),
        None => None,
    };
    Ok(Resolved {
        spec: spec.clone(),
        target,
        many: matches!(ty.kind(), TypeKind::Array(_)),
        matcher,
    })
}

pub(crate) fn resolve_all(model: &Model, population: &Population) -> Result<Vec<Resolved>> {
    population.0.iter().map(|spec| resolve(model, spec)).collect()
}
