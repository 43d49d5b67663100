//! The model registry and the JSON file persistence boundary.

use crate::error::{Result, WarehouseError};
use crate::model::Model;
use crate::schema::{DatabaseDefinition, Schema};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Called with `(stored_version, configured_version)` after a load.
pub type VersionCallback = Arc<dyn Fn(u32, u32) -> Result<()> + Send + Sync>;

/// Engine version written into every saved file.
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Clone, Default)]
pub struct DatabaseOptions {
    /// JSON file backing `load` and `save`.
    pub path: Option<PathBuf>,
    pub version: u32,
    pub on_upgrade: Option<VersionCallback>,
    pub on_downgrade: Option<VersionCallback>,
}

impl fmt::Debug for DatabaseOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseOptions")
            .field("path", &self.path)
            .field("version", &self.version)
            .field("on_upgrade", &self.on_upgrade.is_some())
            .field("on_downgrade", &self.on_downgrade.is_some())
            .finish()
    }
}

impl DatabaseOptions {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DatabaseOptions {
            path: Some(path.into()),
            ..Default::default()
        }
    }

    pub fn version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    pub fn on_upgrade<F>(mut self, f: F) -> Self
    where
        F: Fn(u32, u32) -> Result<()> + Send + Sync + 'static,
    {
        self.on_upgrade = Some(Arc::new(f));
        self
    }

    pub fn on_downgrade<F>(mut self, f: F) -> Self
    where
        F: Fn(u32, u32) -> Result<()> + Send + Sync + 'static,
    {
        self.on_downgrade = Some(Arc::new(f));
        self
    }
}

/// On-disk layout.
#[derive(Debug, Serialize, Deserialize)]
struct Persisted {
    #[serde(default)]
    meta: Meta,
    #[serde(default)]
    models: BTreeMap<String, Vec<serde_json::Value>>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Meta {
    #[serde(default)]
    version: u32,
    #[serde(default)]
    engine_version: String,
}

pub(crate) struct DatabaseInner {
    options: DatabaseOptions,
    models: RwLock<HashMap<String, Model>>,
}

#[derive(Clone)]
pub struct Database {
    inner: Arc<DatabaseInner>,
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("options", &self.inner.options)
            .field("models", &self.model_names())
            .finish()
    }
}

impl Database {
    pub fn new(options: DatabaseOptions) -> Self {
        Database {
            inner: Arc::new(DatabaseInner {
                options,
                models: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Register every model of a parsed definition file.
    pub fn from_definition(options: DatabaseOptions, definition: &DatabaseDefinition) -> Result<Self> {
        let db = Database::new(options);
        for (name, model) in &definition.models {
            db.model(name, Schema::from_definition(model)?);
        }
        Ok(db)
    }

    pub(crate) fn from_inner(inner: Arc<DatabaseInner>) -> Self {
        Database { inner }
    }

    pub fn options(&self) -> &DatabaseOptions {
        &self.inner.options
    }

    /// Register a model, or return the one already registered under `name`.
    pub fn model(&self, name: &str, schema: Schema) -> Model {
        let mut models = self.inner.models.write();
        if let Some(existing) = models.get(name) {
            return existing.clone();
        }
        let model = Model::attached(name.to_string(), Arc::new(schema), Arc::downgrade(&self.inner));
        models.insert(name.to_string(), model.clone());
        model
    }

    /// Look up a registered model.
    pub fn get(&self, name: &str) -> Result<Model> {
        self.inner
            .models
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| WarehouseError::Usage(format!("model `{name}` is not registered")))
    }

    pub fn has_model(&self, name: &str) -> bool {
        self.inner.models.read().contains_key(name)
    }

    /// Registered model names, sorted.
    pub fn model_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.models.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub(crate) fn remove_model(&self, name: &str) {
        self.inner.models.write().remove(name);
    }

    fn path(&self) -> Result<&Path> {
        self.inner
            .options
            .path
            .as_deref()
            .ok_or_else(|| WarehouseError::Usage("database has no path".into()))
    }

    /// Load the backing file, if it exists. Models found in the file but not
    /// registered are created with an empty schema.
    pub async fn load(&self) -> Result<()> {
        let path = self.path()?.to_path_buf();
        if !path.exists() {
            log::info!("No database file at {}, starting empty", path.display());
            return Ok(());
        }

        let content = std::fs::read_to_string(&path)?;
        let persisted: Persisted = serde_json::from_str(&content)?;
        for (name, docs) in persisted.models {
            let model = self.model(&name, Schema::new());
            model.import(docs).await?;
        }
        log::info!(
            "Loaded {} (version {}, engine {})",
            path.display(),
            persisted.meta.version,
            persisted.meta.engine_version
        );

        let stored = persisted.meta.version;
        let configured = self.inner.options.version;
        if configured > stored {
            if let Some(upgrade) = &self.inner.options.on_upgrade {
                log::info!("Upgrading database from version {stored} to {configured}");
                upgrade(stored, configured)?;
            }
        } else if configured < stored {
            if let Some(downgrade) = &self.inner.options.on_downgrade {
                log::info!("Downgrading database from version {stored} to {configured}");
                downgrade(stored, configured)?;
            }
        }
        Ok(())
    }

    /// Write every model to the backing file, atomically.
    pub fn save(&self) -> Result<()> {
        let path = self.path()?;
        let models = self
            .inner
            .models
            .read()
            .iter()
            .map(|(name, model)| (name.clone(), model.export()))
            .collect();
        let persisted = Persisted {
            meta: Meta {
                version: self.inner.options.version,
                engine_version: ENGINE_VERSION.to_string(),
            },
            models,
        };
        let json = serde_json::to_string(&persisted)?;

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)?;
        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        tmp.write_all(json.as_bytes())?;
        tmp.flush()?;
        tmp.persist(path).map_err(|e| WarehouseError::Io(e.error))?;
        log::info!("Saved {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SchemaType;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tempfile::TempDir;

    fn posts_schema() -> Schema {
        let mut schema = Schema::new();
        schema.add([("title", SchemaType::string()), ("date", SchemaType::date())]);
        schema
    }

    #[test]
    fn test_model_registry() {
        let db = Database::new(DatabaseOptions::default());
        let posts = db.model("Post", posts_schema());
        let again = db.model("Post", Schema::new());
        assert!(posts.same_model(&again));
        assert!(db.get("Post").unwrap().same_model(&posts));
        assert_eq!(db.get("Nope").unwrap_err().code(), "USAGE");

        posts.destroy();
        assert!(!db.has_model("Post"));
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("db.json");

        let db = Database::new(DatabaseOptions::new(&path).version(1));
        let posts = db.model("Post", posts_schema());
        posts
            .insert_one(json!({"_id": "a", "title": "Hello", "date": "2020-01-01"}))
            .await
            .unwrap();
        db.save().unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["meta"]["version"], json!(1));
        assert_eq!(raw["meta"]["engineVersion"], json!(ENGINE_VERSION));
        assert_eq!(raw["models"]["Post"][0]["date"], json!("2020-01-01T00:00:00.000Z"));

        let reopened = Database::new(DatabaseOptions::new(&path).version(1));
        let posts = reopened.model("Post", posts_schema());
        reopened.load().await.unwrap();
        let doc = posts.find_by_id("a").unwrap();
        assert_eq!(doc.get("title"), Some(&crate::Value::from("Hello")));
        assert!(doc.get("date").unwrap().as_date().is_some());
    }

    #[tokio::test]
    async fn test_unregistered_models_load_with_empty_schema() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("db.json");
        std::fs::write(
            &path,
            r#"{"meta":{"version":0,"engineVersion":"0.0.0"},"models":{"Tag":[{"_id":"t","name":"rust"}]}}"#,
        )
        .unwrap();

        let db = Database::new(DatabaseOptions::new(&path));
        db.load().await.unwrap();
        assert_eq!(db.get("Tag").unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_version_callbacks() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("db.json");
        Database::new(DatabaseOptions::new(&path).version(2)).save().unwrap();

        let upgraded = Arc::new(AtomicU32::new(0));
        let seen = upgraded.clone();
        let db = Database::new(DatabaseOptions::new(&path).version(3).on_upgrade(move |old, new| {
            seen.store(old * 10 + new, Ordering::SeqCst);
            Ok(())
        }));
        db.load().await.unwrap();
        assert_eq!(upgraded.load(Ordering::SeqCst), 23);

        let downgraded = Arc::new(AtomicU32::new(0));
        let seen = downgraded.clone();
        let db = Database::new(DatabaseOptions::new(&path).version(1).on_downgrade(move |old, new| {
            seen.store(old * 10 + new, Ordering::SeqCst);
            Ok(())
        }));
        db.load().await.unwrap();
        assert_eq!(downgraded.load(Ordering::SeqCst), 21);
    }

    #[tokio::test]
    async fn test_missing_file_loads_empty() {
        let tmp = TempDir::new().unwrap();
        let db = Database::new(DatabaseOptions::new(tmp.path().join("absent.json")));
        db.load().await.unwrap();
        assert!(db.model_names().is_empty());
    }
}
