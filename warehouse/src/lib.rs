pub mod database;
pub mod document;
pub mod error;
pub mod id;
pub mod model;
pub mod mutex;
pub mod query;
pub mod schema;
pub mod types;
pub mod validation;
pub mod value;

pub use database::{Database, DatabaseOptions};
pub use document::Document;
pub use error::{Result, WarehouseError};
pub use id::IdStrategy;
pub use model::{EventKind, FindOptions, Model, PopulateSpec, Populated, Population};
pub use mutex::{Mutex, MutexGuard};
pub use query::{Query, Record, SortSpec};
pub use schema::{HookKind, Schema, Selector};
pub use types::{QueryOp, SchemaType, UpdateOp};
pub use validation::{validate_model, ValidationReport};
pub use value::{Map, Value};
