use crate::error::{Result, WarehouseError};
use crate::id::IdStrategy;
use crate::types::SchemaType;
use crate::value::Value;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::Schema;

/// Top-level definition file: a version and the models it declares.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseDefinition {
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub models: BTreeMap<String, ModelDefinition>,
}

/// Definition of a single model
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelDefinition {
    #[serde(default)]
    pub fields: BTreeMap<String, FieldDefinition>,
}

/// Definition of a single field in a model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDefinition {
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub default: Option<serde_yaml::Value>,
    #[serde(rename = "ref", default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub items: Option<ItemType>,
    #[serde(default)]
    pub fields: BTreeMap<String, FieldDefinition>,
    #[serde(default)]
    pub values: Vec<serde_yaml::Value>,
    #[serde(default)]
    pub id: Option<IdStrategy>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Mixed,
    String,
    Number,
    Integer,
    Boolean,
    Date,
    Array,
    Object,
    Buffer,
    Cuid,
    Enum,
}

/// Item type for arrays: either a bare type name or a full field definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ItemType {
    Simple(FieldType),
    Complex(Box<FieldDefinition>),
}

fn to_value(yaml: &serde_yaml::Value) -> Result<Value> {
    Ok(Value::from(serde_json::to_value(yaml)?))
}

fn bare(field_type: FieldType) -> SchemaType {
    match field_type {
        FieldType::Mixed | FieldType::Enum => SchemaType::mixed(),
        FieldType::String => SchemaType::string(),
        FieldType::Number => SchemaType::number(),
        FieldType::Integer => SchemaType::integer(),
        FieldType::Boolean => SchemaType::boolean(),
        FieldType::Date => SchemaType::date(),
        FieldType::Array => SchemaType::array(SchemaType::mixed()),
        FieldType::Object => SchemaType::object(),
        FieldType::Buffer => SchemaType::buffer(),
        FieldType::Cuid => SchemaType::cuid(),
    }
}

impl FieldDefinition {
    /// Build the runtime type for this field. Nested `fields` of an object
    /// are registered separately by [`ModelDefinition::to_schema`].
    pub fn to_schema_type(&self, path: &str) -> Result<SchemaType> {
        let mut ty = match self.field_type {
            FieldType::Array => SchemaType::array(match &self.items {
                Some(ItemType::Simple(t)) => bare(*t),
                Some(ItemType::Complex(def)) => def.to_schema_type(path)?,
                None => SchemaType::mixed(),
            }),
            FieldType::Cuid => SchemaType::cuid_with(self.id.unwrap_or_default()),
            FieldType::Enum => {
                if self.values.is_empty() {
                    return Err(WarehouseError::Usage(format!(
                        "enum field `{path}` must list its values"
                    )));
                }
                let values = self
                    .values
                    .iter()
                    .map(to_value)
                    .collect::<Result<Vec<_>>>()?;
                SchemaType::enumeration(values)
            }
            other => bare(other),
        };

        if self.required {
            ty = ty.required();
        }
        if let Some(target) = &self.reference {
            ty = ty.reference(target.clone());
        }
        match (&self.default, self.field_type) {
            (Some(serde_yaml::Value::String(s)), FieldType::Date) if s == "now" => {
                ty = ty.default_with(|| Value::Date(Utc::now()));
            }
            (Some(default), _) => ty = ty.default_value(to_value(default)?),
            (None, _) => {}
        }
        Ok(ty)
    }

    fn register(&self, schema: &mut Schema, path: &str) -> Result<()> {
        schema.path(path, self.to_schema_type(path)?);
        for (name, child) in &self.fields {
            child.register(schema, &format!("{path}.{name}"))?;
        }
        Ok(())
    }
}

impl ModelDefinition {
    pub fn to_schema(&self) -> Result<Schema> {
        let mut schema = Schema::new();
        for (name, field) in &self.fields {
            field.register(&mut schema, name)?;
        }
        Ok(schema)
    }
}
