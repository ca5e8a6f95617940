use std::collections::HashMap;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};

use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::errors::{Result, SchemaError};

/// Scheme used for identifiers of documents served by a [`DocumentSource`].
pub const SCHEMA_SCHEME: &str = "schema";
/// File suffix appended to logical schema names.
pub const SCHEMA_SUFFIX: &str = ".schema.json";

/// Backing storage for schema documents.
///
/// Identifiers are `schema:///<relative path>` URLs; a source answers `None`
/// when it holds nothing under that path.
pub trait DocumentSource: Send + Sync {
    fn read(&self, id: &Url) -> Result<Option<Value>>;
}

/// Serves documents from a directory on disk.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, id: &Url) -> Option<PathBuf> {
        let relative = relative_path(id)?;
        let relative = Path::new(&relative);
        // Identifiers may not climb out of the root.
        if relative
            .components()
            .any(|component| !matches!(component, Component::Normal(_)))
        {
            return None;
        }
        Some(self.root.join(relative))
    }
}

impl DocumentSource for DirectorySource {
    fn read(&self, id: &Url) -> Result<Option<Value>> {
        let Some(path) = self.path_for(id) else {
            return Ok(None);
        };
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        Ok(Some(serde_json::from_str(&contents)?))
    }
}

/// Serves documents held in memory, keyed by relative path.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    documents: HashMap<String, Value>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `document` under a logical schema name (`<name>.schema.json`).
    pub fn with_schema(mut self, name: &str, document: Value) -> Self {
        self.insert(format!("{name}{SCHEMA_SUFFIX}"), document);
        self
    }

    /// Registers `document` under an explicit relative path.
    pub fn with_document(mut self, path: impl Into<String>, document: Value) -> Self {
        self.insert(path, document);
        self
    }

    pub fn insert(&mut self, path: impl Into<String>, document: Value) {
        self.documents.insert(path.into(), document);
    }
}

impl DocumentSource for MemorySource {
    fn read(&self, id: &Url) -> Result<Option<Value>> {
        Ok(relative_path(id).and_then(|path| self.documents.get(&path).cloned()))
    }
}

/// A loaded root document and the identifier its references resolve against.
#[derive(Debug, Clone)]
pub struct LoadedSchema {
    pub root: Arc<Value>,
    pub base: Url,
}

type Slot = Mutex<Option<Arc<Value>>>;

/// Loads schema documents once per identifier and keeps them for the
/// lifetime of the store.
pub struct DocumentStore {
    source: Box<dyn DocumentSource>,
    cache: RwLock<HashMap<Url, Arc<Slot>>>,
}

impl std::fmt::Debug for DocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentStore")
            .field("cached", &self.cached_count())
            .finish_non_exhaustive()
    }
}

impl DocumentStore {
    pub fn new(source: impl DocumentSource + 'static) -> Self {
        Self {
            source: Box::new(source),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Loads the document backing a logical schema name.
    pub fn load(&self, name: &str) -> Result<LoadedSchema> {
        let not_found = || SchemaError::NotFound {
            name: name.to_string(),
        };
        let base = document_id(name).ok_or_else(not_found)?;
        let root = self.fetch(&base)?.ok_or_else(not_found)?;
        Ok(LoadedSchema { root, base })
    }

    /// Returns the parsed document for `id`, reading it on first access.
    ///
    /// Concurrent first requests for the same identifier read the source once;
    /// later requests share the cached parse.
    pub fn fetch(&self, id: &Url) -> Result<Option<Arc<Value>>> {
        let mut id = id.clone();
        id.set_fragment(None);

        if let Some(document) = self.cached(&id)? {
            return Ok(Some(document));
        }

        let slot = self.slot(&id)?;
        let mut entry = slot
            .lock()
            .map_err(|_| SchemaError::Cache("document slot poisoned".to_string()))?;
        if let Some(document) = entry.as_ref() {
            return Ok(Some(Arc::clone(document)));
        }

        let Some(document) = self.source.read(&id)? else {
            debug!(document = %id, "schema document missing");
            return Ok(None);
        };
        debug!(document = %id, "schema document loaded");
        let document = Arc::new(document);
        *entry = Some(Arc::clone(&document));
        Ok(Some(document))
    }

    /// Number of documents currently cached.
    pub fn cached_count(&self) -> usize {
        let Ok(cache) = self.cache.read() else {
            return 0;
        };
        cache
            .values()
            .filter(|slot| slot.lock().map(|entry| entry.is_some()).unwrap_or(false))
            .count()
    }

    fn cached(&self, id: &Url) -> Result<Option<Arc<Value>>> {
        let cache = self
            .cache
            .read()
            .map_err(|_| SchemaError::Cache("document cache poisoned".to_string()))?;
        let Some(slot) = cache.get(id) else {
            return Ok(None);
        };
        let entry = slot
            .lock()
            .map_err(|_| SchemaError::Cache("document slot poisoned".to_string()))?;
        Ok(entry.clone())
    }

    fn slot(&self, id: &Url) -> Result<Arc<Slot>> {
        let mut cache = self
            .cache
            .write()
            .map_err(|_| SchemaError::Cache("document cache poisoned".to_string()))?;
        Ok(Arc::clone(cache.entry(id.clone()).or_default()))
    }
}

/// Identifier of the document backing a logical schema name.
pub fn document_id(name: &str) -> Option<Url> {
    if name.trim().is_empty() {
        return None;
    }
    let root = Url::parse(&format!("{SCHEMA_SCHEME}:///")).ok()?;
    root.join(&format!("{name}{SCHEMA_SUFFIX}")).ok()
}

fn relative_path(id: &Url) -> Option<String> {
    if id.scheme() != SCHEMA_SCHEME {
        return None;
    }
    let path = id.path().trim_start_matches('/');
    urlencoding::decode(path).ok().map(|path| path.into_owned())
}
