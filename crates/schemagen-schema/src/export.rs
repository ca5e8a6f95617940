use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;
use tracing::info;

use crate::effective::ensure_types_deep;
use crate::errors::Result;
use crate::inliner::SchemaInliner;
use crate::reference::RefResolver;
use crate::store::DocumentStore;

/// Suffix of exported effective schema files.
pub const EFFECTIVE_SUFFIX: &str = ".effective.schema.json";

/// Writes the reference-free, fully typed form of a schema for inspection.
#[derive(Debug, Clone)]
pub struct EffectiveSchemaExporter {
    inliner: SchemaInliner,
}

impl EffectiveSchemaExporter {
    pub fn new(store: Arc<DocumentStore>) -> Self {
        Self {
            inliner: SchemaInliner::new(RefResolver::new(store)),
        }
    }

    /// Inlines the named schema and assigns a `type` at every schema position.
    pub fn compile(&self, name: &str) -> Result<Value> {
        let inlined = self.inliner.inline_schema(name)?;
        Ok(ensure_types_deep(inlined))
    }

    /// Compiles `name` and writes it to `<out_dir>/<name>.effective.schema.json`.
    pub fn export(&self, name: &str, out_dir: &Path) -> Result<PathBuf> {
        let compiled = self.compile(name)?;
        let path = out_dir.join(format!("{name}{EFFECTIVE_SUFFIX}"));
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut contents = serde_json::to_string_pretty(&compiled)?;
        contents.push('\n');
        fs::write(&path, contents)?;
        info!(schema = %name, path = %path.display(), "effective schema exported");
        Ok(path)
    }
}
