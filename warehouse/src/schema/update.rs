//! Compiles update objects into an ordered list of mutations.

use super::Schema;
use crate::error::{Result, WarehouseError};
use crate::types::{SchemaType, UpdateOp};
use crate::value::{get_path, remove_path, set_path, Map, Value};
use std::sync::Arc;

#[derive(Clone, Debug)]
enum Mutation {
    Set {
        path: String,
        value: Value,
    },
    Op {
        path: String,
        ty: Arc<SchemaType>,
        op: UpdateOp,
        operand: Value,
    },
}

/// Compiled update: applied left to right.
#[derive(Clone, Debug, Default)]
pub struct UpdateStack {
    mutations: Vec<Mutation>,
}

impl UpdateStack {
    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }

    /// Fold every mutation over `doc`. Callers pass a copy of the stored value.
    pub fn apply(&self, doc: &mut Map) -> Result<()> {
        for mutation in &self.mutations {
            match mutation {
                Mutation::Set { path, value } => set_path(doc, path, value.clone()),
                Mutation::Op {
                    path,
                    ty,
                    op,
                    operand,
                } => {
                    let current = get_path(doc, path).cloned().unwrap_or(Value::Null);
                    let next = ty.update(*op, current, operand, doc)?;
                    if next.is_null() {
                        remove_path(doc, path);
                    } else {
                        set_path(doc, path, next);
                    }
                }
            }
        }
        Ok(())
    }
}

pub(super) fn compile(schema: &Schema, update: &Value) -> Result<UpdateStack> {
    let map = update.as_object().ok_or_else(|| {
        WarehouseError::Usage(format!("update must be an object, got {}", update.type_name()))
    })?;
    let mut mutations = Vec::new();
    for (key, value) in map {
        if !key.starts_with('$') {
            compile_path(schema, key, value, &mut mutations);
            continue;
        }
        let Some(op) = UpdateOp::from_name(key) else {
            log::debug!("Skipping unknown update operator `{key}`");
            continue;
        };
        let fields = value.as_object().ok_or_else(|| {
            WarehouseError::Usage(format!("`{key}` expects an object of fields"))
        })?;
        for (path, operand) in fields {
            push_op(schema, path, op, operand, &mut mutations);
        }
    }
    Ok(UpdateStack { mutations })
}

fn compile_path(schema: &Schema, path: &str, value: &Value, out: &mut Vec<Mutation>) {
    match value {
        Value::Object(map) if !map.is_empty() && map.keys().any(|k| k.starts_with('$')) => {
            for (key, operand) in map {
                if !key.starts_with('$') {
                    compile_path(schema, &format!("{path}.{key}"), operand, out);
                    continue;
                }
                match UpdateOp::from_name(key) {
                    Some(op) => push_op(schema, path, op, operand, out),
                    None => log::debug!("Skipping unknown update operator `{key}` on `{path}`"),
                }
            }
        }
        Value::Object(map) if !map.is_empty() => {
            for (key, nested) in map {
                compile_path(schema, &format!("{path}.{key}"), nested, out);
            }
        }
        _ => out.push(Mutation::Set {
            path: path.to_string(),
            value: value.clone(),
        }),
    }
}

fn push_op(schema: &Schema, path: &str, op: UpdateOp, operand: &Value, out: &mut Vec<Mutation>) {
    let ty = schema.type_for(path);
    if !ty.supports_update(op) {
        log::debug!("Skipping {}: not supported by `{path}`", op.name());
        return;
    }
    out.push(Mutation::Op {
        path: path.to_string(),
        ty,
        op,
        operand: operand.clone(),
    });
}
