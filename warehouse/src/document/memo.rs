use crate::value::Map;
use once_cell::sync::OnceCell;
use std::sync::Arc;

pub(crate) type Compute<T> = Arc<dyn Fn(&Map) -> T + Send + Sync>;

/// A lazily computed value derived from a document's fields, cached after
/// the first access.
pub(crate) struct Memo<T> {
    cell: OnceCell<T>,
    compute: Compute<T>,
}

impl<T: Clone> Clone for Memo<T> {
    fn clone(&self) -> Self {
        Memo {
            cell: self.cell.clone(),
            compute: self.compute.clone(),
        }
    }
}

impl<T> Memo<T> {
    pub(crate) fn new(compute: Compute<T>) -> Self {
        Memo {
            cell: OnceCell::new(),
            compute,
        }
    }

    pub(crate) fn get(&self, fields: &Map) -> &T {
        self.cell.get_or_init(|| (self.compute)(fields))
    }

    pub(crate) fn reset(&mut self) {
        self.cell = OnceCell::new();
    }
}
