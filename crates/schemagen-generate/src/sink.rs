use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::errors::Result;
use crate::value::GeneratedValue;

/// File name of the NDJSON stream written per job.
pub const EVENTS_FILE: &str = "events.ndjson";

/// A generated record together with its routing metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    /// Name of the schema the record was generated from.
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
    pub timestamp: String,
    pub data: GeneratedValue,
}

/// Destination for generated records.
pub trait RecordSink {
    /// Called once before the first record of a job.
    fn begin(&mut self, _job_id: &str) -> Result<()> {
        Ok(())
    }

    fn accept(&mut self, record: &Envelope) -> Result<()>;

    /// Called once after the last record of a job.
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Appends one JSON object per line to `<out_dir>/<job_id>/events.ndjson`.
#[derive(Debug)]
pub struct NdjsonFileSink {
    out_dir: PathBuf,
    path: Option<PathBuf>,
    writer: Option<BufWriter<File>>,
}

impl NdjsonFileSink {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
            path: None,
            writer: None,
        }
    }

    /// Path of the file opened by the last [`RecordSink::begin`].
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

impl RecordSink for NdjsonFileSink {
    fn begin(&mut self, job_id: &str) -> Result<()> {
        let dir = self.out_dir.join(job_id);
        fs::create_dir_all(&dir)?;
        let path = dir.join(EVENTS_FILE);
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        self.writer = Some(BufWriter::new(file));
        self.path = Some(path);
        Ok(())
    }

    fn accept(&mut self, record: &Envelope) -> Result<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| io::Error::other("ndjson sink used before begin"))?;
        serde_json::to_writer(&mut *writer, record)?;
        writer.write_all(b"\n")?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }
        Ok(())
    }
}

/// Keeps records in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    pub job_id: Option<String>,
    pub records: Vec<Envelope>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordSink for MemorySink {
    fn begin(&mut self, job_id: &str) -> Result<()> {
        self.job_id = Some(job_id.to_string());
        Ok(())
    }

    fn accept(&mut self, record: &Envelope) -> Result<()> {
        self.records.push(record.clone());
        Ok(())
    }
}
