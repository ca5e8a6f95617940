use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};

use indexmap::IndexMap;
use tracing::debug;

use crate::errors::{GenerationError, Result};

/// One dataset row: column name -> cell text, in header order.
pub type Row = IndexMap<String, String>;

/// Row-oriented tabular resources addressed by name.
pub trait DatasetSource: Send + Sync {
    fn load_rows(&self, name: &str) -> Result<Arc<Vec<Row>>>;
}

/// In-memory datasets.
#[derive(Debug, Clone, Default)]
pub struct MemoryDatasets {
    datasets: HashMap<String, Arc<Vec<Row>>>,
}

impl MemoryDatasets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(mut self, name: impl Into<String>, rows: Vec<Row>) -> Self {
        self.datasets.insert(name.into(), Arc::new(rows));
        self
    }

    /// Builds rows from a header and positional records.
    pub fn with_table<'a, R>(self, name: impl Into<String>, header: &[&str], records: &[R]) -> Self
    where
        R: AsRef<[&'a str]>,
    {
        let rows = records
            .iter()
            .map(|record| {
                header
                    .iter()
                    .zip(record.as_ref().iter())
                    .map(|(column, cell)| (column.to_string(), cell.to_string()))
                    .collect()
            })
            .collect();
        self.with_rows(name, rows)
    }
}

impl DatasetSource for MemoryDatasets {
    fn load_rows(&self, name: &str) -> Result<Arc<Vec<Row>>> {
        self.datasets
            .get(name)
            .cloned()
            .ok_or_else(|| GenerationError::Dataset(format!("unknown dataset '{name}'")))
    }
}

type Slot = Mutex<Option<Arc<Vec<Row>>>>;

/// CSV files under a root directory, parsed once per name.
#[derive(Debug)]
pub struct CsvDatasets {
    root: PathBuf,
    delimiter: u8,
    cache: RwLock<HashMap<String, Arc<Slot>>>,
}

impl CsvDatasets {
    pub const DEFAULT_DELIMITER: u8 = b';';

    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            delimiter: Self::DEFAULT_DELIMITER,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn slot(&self, name: &str) -> Result<Arc<Slot>> {
        if let Some(slot) = self
            .cache
            .read()
            .map_err(|_| GenerationError::Dataset("dataset cache poisoned".to_string()))?
            .get(name)
        {
            return Ok(Arc::clone(slot));
        }
        let mut cache = self
            .cache
            .write()
            .map_err(|_| GenerationError::Dataset("dataset cache poisoned".to_string()))?;
        Ok(Arc::clone(cache.entry(name.to_string()).or_default()))
    }

    fn read(&self, name: &str) -> Result<Vec<Row>> {
        let relative = Path::new(name);
        if relative
            .components()
            .any(|component| !matches!(component, Component::Normal(_)))
        {
            return Err(GenerationError::Dataset(format!(
                "dataset name '{name}' must be a relative path"
            )));
        }
        let path = self.root.join(relative);
        if !path.is_file() {
            return Err(GenerationError::Dataset(format!(
                "dataset '{name}' not found under {}",
                self.root.display()
            )));
        }

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(&path)?;
        let header: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(
                header
                    .iter()
                    .zip(record.iter())
                    .map(|(column, cell)| (column.clone(), cell.to_string()))
                    .collect(),
            );
        }
        debug!(dataset = %name, rows = rows.len(), "dataset loaded");
        Ok(rows)
    }
}

impl DatasetSource for CsvDatasets {
    fn load_rows(&self, name: &str) -> Result<Arc<Vec<Row>>> {
        let slot = self.slot(name)?;
        let mut entry = slot
            .lock()
            .map_err(|_| GenerationError::Dataset("dataset slot poisoned".to_string()))?;
        if let Some(rows) = entry.as_ref() {
            return Ok(Arc::clone(rows));
        }
        let rows = Arc::new(self.read(name)?);
        *entry = Some(Arc::clone(&rows));
        Ok(rows)
    }
}
