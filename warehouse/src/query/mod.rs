//! Query: an immutable, chainable result set over a model's records.

mod sort;

use crate::document::Document;
use crate::error::Result;
use crate::model::populate::{self, Population};
use crate::model::Model;
use crate::schema::{Selector, ID_PATH};
use crate::value::{Map, Value};
use rand::seq::SliceRandom;
use std::fmt;

pub use sort::SortSpec;

/// Anything a query can hold: documents, or plain field maps in lean mode.
pub trait Record: Clone + Send + Sync + 'static {
    fn fields(&self) -> &Map;

    fn id(&self) -> Option<&str> {
        self.fields().get(ID_PATH).and_then(|v| v.as_str())
    }
}

impl Record for Document {
    fn fields(&self) -> &Map {
        Document::fields(self)
    }
}

impl Record for Map {
    fn fields(&self) -> &Map {
        self
    }
}

/// An ordered snapshot of records. Every transform returns a new query.
#[derive(Clone)]
pub struct Query<T: Record = Document> {
    model: Model,
    items: Vec<T>,
}

impl<T: Record + fmt::Debug> fmt::Debug for Query<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("model", &self.model.name())
            .field("items", &self.items)
            .finish()
    }
}

/// Resolve a possibly negative index against `len`.
fn offset(index: isize, len: usize) -> usize {
    if index < 0 {
        len.saturating_sub(index.unsigned_abs())
    } else {
        (index as usize).min(len)
    }
}

impl<T: Record> Query<T> {
    pub fn new(model: Model, items: Vec<T>) -> Self {
        Query { model, items }
    }

    fn derive(&self, items: Vec<T>) -> Self {
        Query {
            model: self.model.clone(),
            items,
        }
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn count(&self) -> usize {
        self.items.len()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn to_array(&self) -> Vec<T> {
        self.items.clone()
    }

    pub fn into_vec(self) -> Vec<T> {
        self.items
    }

    /// The item at `index`; negative indexes count from the end.
    pub fn eq(&self, index: isize) -> Option<T> {
        let len = self.items.len();
        let i = if index < 0 {
            len.checked_sub(index.unsigned_abs())?
        } else {
            index as usize
        };
        self.items.get(i).cloned()
    }

    pub fn first(&self) -> Option<T> {
        self.items.first().cloned()
    }

    pub fn last(&self) -> Option<T> {
        self.items.last().cloned()
    }

    /// Items in `[start, end)`; negative bounds count from the end.
    pub fn slice(&self, start: isize, end: Option<isize>) -> Self {
        let len = self.items.len();
        let start = offset(start, len);
        let end = end.map_or(len, |e| offset(e, len));
        if start >= end {
            return self.derive(Vec::new());
        }
        self.derive(self.items[start..end].to_vec())
    }

    pub fn limit(&self, n: usize) -> Self {
        self.derive(self.items.iter().take(n).cloned().collect())
    }

    pub fn skip(&self, n: usize) -> Self {
        self.derive(self.items.iter().skip(n).cloned().collect())
    }

    pub fn reverse(&self) -> Self {
        self.derive(self.items.iter().rev().cloned().collect())
    }

    pub fn shuffle(&self) -> Self {
        let mut items = self.items.clone();
        items.shuffle(&mut rand::thread_rng());
        self.derive(items)
    }

    /// Stable sort by `"-date title"` style keys, compared with each path's type.
    pub fn sort(&self, spec: impl Into<SortSpec>) -> Self {
        let spec = spec.into();
        let schema = self.model.schema();
        let mut items = self.items.clone();
        items.sort_by(|a, b| spec.compare(schema, a.fields(), b.fields()));
        self.derive(items)
    }

    /// Keep the items matching `selector`.
    pub fn find(&self, selector: impl Into<Selector>) -> Result<Self> {
        let predicate = self.model.schema().compile_query(&selector.into())?;
        Ok(self.derive(
            self.items
                .iter()
                .filter(|item| predicate.test(item.fields()))
                .cloned()
                .collect(),
        ))
    }

    pub fn find_one(&self, selector: impl Into<Selector>) -> Result<Option<T>> {
        let predicate = self.model.schema().compile_query(&selector.into())?;
        Ok(self
            .items
            .iter()
            .find(|item| predicate.test(item.fields()))
            .cloned())
    }

    pub fn map<U, F>(&self, mut f: F) -> Vec<U>
    where
        F: FnMut(&T, usize) -> U,
    {
        self.items.iter().enumerate().map(|(i, item)| f(item, i)).collect()
    }

    pub fn reduce<A, F>(&self, init: A, mut f: F) -> A
    where
        F: FnMut(A, &T, usize) -> A,
    {
        self.items
            .iter()
            .enumerate()
            .fold(init, |acc, (i, item)| f(acc, item, i))
    }

    pub fn reduce_right<A, F>(&self, init: A, mut f: F) -> A
    where
        F: FnMut(A, &T, usize) -> A,
    {
        self.items
            .iter()
            .enumerate()
            .rev()
            .fold(init, |acc, (i, item)| f(acc, item, i))
    }

    pub fn filter<F>(&self, mut f: F) -> Self
    where
        F: FnMut(&T, usize) -> bool,
    {
        self.derive(
            self.items
                .iter()
                .enumerate()
                .filter(|(i, item)| f(item, *i))
                .map(|(_, item)| item.clone())
                .collect(),
        )
    }

    pub fn every<F>(&self, mut f: F) -> bool
    where
        F: FnMut(&T, usize) -> bool,
    {
        self.items.iter().enumerate().all(|(i, item)| f(item, i))
    }

    pub fn some<F>(&self, mut f: F) -> bool
    where
        F: FnMut(&T, usize) -> bool,
    {
        self.items.iter().enumerate().any(|(i, item)| f(item, i))
    }

    fn ids(&self) -> Vec<String> {
        self.items
            .iter()
            .filter_map(|item| item.id().map(str::to_string))
            .collect()
    }

    /// Apply `update` to every item, one after another.
    pub async fn update(&self, update: impl Into<Value>) -> Result<Vec<Document>> {
        let update = update.into();
        let mut out = Vec::with_capacity(self.items.len());
        for id in self.ids() {
            out.push(self.model.update_by_id(&id, update.clone()).await?);
        }
        Ok(out)
    }

    pub async fn replace(&self, doc: impl Into<Value>) -> Result<Vec<Document>> {
        let doc = doc.into();
        let mut out = Vec::with_capacity(self.items.len());
        for id in self.ids() {
            out.push(self.model.replace_by_id(&id, doc.clone()).await?);
        }
        Ok(out)
    }

    pub async fn remove(&self) -> Result<Vec<Document>> {
        let mut out = Vec::with_capacity(self.items.len());
        for id in self.ids() {
            out.push(self.model.remove_by_id(&id).await?);
        }
        Ok(out)
    }
}

impl Query<Document> {
    /// Attach lazily resolved references to every document.
    pub fn populate(&self, spec: impl Into<Population>) -> Result<Self> {
        let resolved = populate::resolve_all(&self.model, &spec.into())?;
        let items = self
            .items
            .iter()
            .cloned()
            .map(|mut doc| {
                for r in &resolved {
                    doc.attach(r);
                }
                doc
            })
            .collect();
        Ok(self.derive(items))
    }
}

impl<T: Record> IntoIterator for Query<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a, T: Record> IntoIterator for &'a Query<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
