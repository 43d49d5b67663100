use crate::document::Document;
use crate::error::WarehouseError;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

pub type Listener = Arc<dyn Fn(&Document) + Send + Sync>;

/// Write events a model emits after each commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Insert,
    Update,
    Remove,
}

impl FromStr for EventKind {
    type Err = WarehouseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "insert" => Ok(EventKind::Insert),
            "update" => Ok(EventKind::Update),
            "remove" => Ok(EventKind::Remove),
            other => Err(WarehouseError::Usage(format!("unknown event `{other}`"))),
        }
    }
}

#[derive(Default)]
pub(super) struct Listeners {
    by_kind: HashMap<EventKind, Vec<Listener>>,
}

impl Listeners {
    pub(super) fn add(&mut self, kind: EventKind, listener: Listener) {
        self.by_kind.entry(kind).or_default().push(listener);
    }

    pub(super) fn get(&self, kind: EventKind) -> Vec<Listener> {
        self.by_kind.get(&kind).cloned().unwrap_or_default()
    }
}
