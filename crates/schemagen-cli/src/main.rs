mod logging;
mod settings;

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use schemagen_generate::{
    CsvDatasets, Envelope, GenerateOptions, GenerationError, LocaleKey, NdjsonFileSink,
    RecordSink, SchemaGenerator, x_source_schema,
};
use schemagen_schema::{DirectorySource, DocumentStore, EffectiveSchemaExporter, SchemaError};
use thiserror::Error;

use logging::init_logging;
use settings::{Settings, load_settings};

#[derive(Debug, Error)]
enum CliError {
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),
    #[error("generation error: {0}")]
    Generation(#[from] GenerationError),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("toml decode error: {0}")]
    TomlDecode(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("logging error: {0}")]
    Logging(String),
}

type CliResult<T> = Result<T, CliError>;

#[derive(Parser, Debug)]
#[command(name = "schemagen", version, about = "Schema-driven synthetic data generator")]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Directory holding `<name>.schema.json` documents.
    #[arg(long, global = true)]
    schemas_dir: Option<PathBuf>,
    /// Directory holding CSV datasets.
    #[arg(long, global = true)]
    datasets_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate records from a named schema.
    Generate(GenerateArgs),
    /// Write the fully inlined, typed form of a named schema.
    Export(ExportArgs),
    /// Print the JSON Schema of the `x-source` keyword.
    XSourceSchema,
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// Schema name, resolved to `<schemas_dir>/<name>.schema.json`.
    #[arg(long)]
    schema: String,
    #[arg(long, default_value_t = 1)]
    count: u64,
    /// Seed for reproducible output.
    #[arg(long)]
    seed: Option<u64>,
    /// Faker locale (en_US, fr_FR, pt_BR).
    #[arg(long)]
    locale: Option<String>,
    /// Pins the clock (RFC 3339) used by `now` and `date-time` values.
    #[arg(long)]
    now: Option<DateTime<Utc>>,
    /// Output directory for `<job_id>/events.ndjson`.
    #[arg(long)]
    out: Option<PathBuf>,
    /// Print records to stdout instead of writing files.
    #[arg(long, default_value_t = false)]
    stdout: bool,
}

#[derive(Args, Debug)]
struct ExportArgs {
    #[arg(long)]
    schema: String,
    #[arg(long)]
    out: Option<PathBuf>,
}

fn main() -> Result<(), CliError> {
    let cli = Cli::parse();
    let mut settings = load_settings(cli.config.as_deref())?;
    if let Some(dir) = cli.schemas_dir {
        settings.schemas_dir = dir;
    }
    if let Some(dir) = cli.datasets_dir {
        settings.datasets_dir = dir;
    }
    init_logging(&settings.log_level, settings.log_json)?;

    match cli.command {
        Command::Generate(args) => run_generate(&settings, args),
        Command::Export(args) => run_export(&settings, args),
        Command::XSourceSchema => {
            let schema = x_source_schema()?;
            println!("{}", serde_json::to_string_pretty(&schema)?);
            Ok(())
        }
    }
}

fn document_store(settings: &Settings) -> Arc<DocumentStore> {
    Arc::new(DocumentStore::new(DirectorySource::new(
        settings.schemas_dir.clone(),
    )))
}

fn run_generate(settings: &Settings, args: GenerateArgs) -> CliResult<()> {
    let locale_name = args.locale.as_deref().unwrap_or(&settings.locale);
    let locale = LocaleKey::parse(locale_name)
        .ok_or_else(|| CliError::InvalidConfig(format!("unsupported locale '{locale_name}'")))?;
    let datasets = CsvDatasets::new(settings.datasets_dir.clone())
        .with_delimiter(settings.delimiter_byte()?);
    let options = GenerateOptions {
        seed: args.seed,
        locale,
        fixed_now: args.now,
    };
    let generator = SchemaGenerator::new(document_store(settings), Arc::new(datasets), options);

    let report = if args.stdout {
        generator.simulate(&args.schema, args.count, &mut StdoutSink)?
    } else {
        let out = args.out.unwrap_or_else(|| settings.out_dir.clone());
        let mut sink = NdjsonFileSink::new(out);
        let report = generator.simulate(&args.schema, args.count, &mut sink)?;
        if let Some(path) = sink.path() {
            tracing::info!(event = "records_written", path = %path.display());
        }
        report
    };

    tracing::info!(
        event = "run_finished",
        job_id = %report.job_id,
        records = report.records,
        duration_ms = report.duration_ms
    );
    Ok(())
}

fn run_export(settings: &Settings, args: ExportArgs) -> CliResult<()> {
    let out = args.out.unwrap_or_else(|| settings.out_dir.clone());
    let exporter = EffectiveSchemaExporter::new(document_store(settings));
    let path = exporter.export(&args.schema, &out)?;
    println!("{}", path.display());
    Ok(())
}

/// Writes each envelope as one JSON line on stdout.
struct StdoutSink;

impl RecordSink for StdoutSink {
    fn accept(&mut self, record: &Envelope) -> schemagen_generate::Result<()> {
        let mut stdout = io::stdout().lock();
        serde_json::to_writer(&mut stdout, record)?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}
