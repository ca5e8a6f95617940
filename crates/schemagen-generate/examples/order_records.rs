use std::path::Path;
use std::sync::Arc;

use schemagen_generate::{CsvDatasets, GenerateOptions, MemorySink, SchemaGenerator};
use schemagen_schema::{DirectorySource, DocumentStore};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures");
    let store = Arc::new(DocumentStore::new(DirectorySource::new(
        fixtures.join("schemas"),
    )));
    let datasets = Arc::new(CsvDatasets::new(fixtures.join("datasets")));
    let options = GenerateOptions {
        seed: Some(7),
        ..GenerateOptions::default()
    };
    let generator = SchemaGenerator::new(store, datasets, options);

    let mut sink = MemorySink::new();
    generator.simulate("order", 3, &mut sink)?;
    for envelope in &sink.records {
        println!("{}", serde_json::to_string(envelope)?);
    }
    Ok(())
}
