use crate::value::{Map, Value};
use std::fmt;
use std::sync::Arc;

/// Computes a virtual field from the rest of the document.
pub type VirtualGetter = Arc<dyn Fn(&Map) -> Value + Send + Sync>;

/// Fans an assigned virtual value out into sibling fields.
pub type VirtualSetter = Arc<dyn Fn(&mut Map, Value) + Send + Sync>;

#[derive(Clone, Default)]
pub struct VirtualType {
    pub(super) getter: Option<VirtualGetter>,
    pub(super) setter: Option<VirtualSetter>,
}

impl fmt::Debug for VirtualType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VirtualType")
            .field("getter", &self.getter.is_some())
            .field("setter", &self.setter.is_some())
            .finish()
    }
}

pub(super) fn assign(virtual_type: &VirtualType, value: Value, doc: &mut Map) {
    if value.is_null() {
        return;
    }
    if let Some(setter) = &virtual_type.setter {
        setter(doc, value);
    }
}
