use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use serde_json::{Value, json};

use schemagen_generate::{
    CsvDatasets, GenerateOptions, GeneratedValue, MemoryDatasets, MemorySink, NdjsonFileSink,
    SchemaGenerator,
};
use schemagen_schema::{
    DirectorySource, DocumentStore, EffectiveSchemaExporter, MemorySource,
};

fn fixtures() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn fixture_store() -> Arc<DocumentStore> {
    Arc::new(DocumentStore::new(DirectorySource::new(
        fixtures().join("schemas"),
    )))
}

fn order_generator(options: GenerateOptions) -> SchemaGenerator {
    let datasets = CsvDatasets::new(fixtures().join("datasets"));
    SchemaGenerator::new(fixture_store(), Arc::new(datasets), options)
}

fn memory_generator(name: &str, schema: Value) -> SchemaGenerator {
    let store = Arc::new(DocumentStore::new(
        MemorySource::new().with_schema(name, schema),
    ));
    SchemaGenerator::new(
        store,
        Arc::new(MemoryDatasets::new()),
        GenerateOptions::default(),
    )
}

fn scratch_dir() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("schemagen-e2e-{}", uuid::Uuid::new_v4()));
    fs::create_dir_all(&dir).expect("create scratch dir");
    dir
}

fn assert_valid(validator: &jsonschema::JSONSchema, instance: &Value) {
    if let Err(errors) = validator.validate(instance) {
        let messages: Vec<String> = errors.map(|error| error.to_string()).collect();
        panic!("{instance} is invalid: {messages:?}");
    }
}

#[test]
fn uuid_and_pinned_integer() {
    let generator = memory_generator(
        "person",
        json!({
            "type": "object",
            "properties": {
                "id": {"type": "string", "x-source": {"strategy": "uuid"}},
                "age": {"type": "integer", "minimum": 18, "maximum": 18}
            }
        }),
    );

    for _ in 0..20 {
        let value = generator.generate("person").expect("generate").to_json();
        let id = value["id"].as_str().expect("id text");
        assert!(uuid::Uuid::parse_str(id).is_ok(), "{id} is not a uuid");
        assert_eq!(value["age"], json!(18));
    }
}

#[test]
fn expression_reads_sibling_constant() {
    let generator = memory_generator(
        "pair",
        json!({
            "type": "object",
            "properties": {
                "a": {"type": "integer", "x-source": {"strategy": "constant", "value": 7}},
                "b": {"type": "integer", "x-source": {"strategy": "expression", "expr": "a*2"}}
            }
        }),
    );

    for _ in 0..5 {
        let value = generator.generate("pair").expect("generate").to_json();
        assert_eq!(value, json!({"a": 7, "b": 14}));
    }
}

#[test]
fn order_records_validate_against_the_effective_schema() {
    let compiled = EffectiveSchemaExporter::new(fixture_store())
        .compile("order")
        .expect("compile order");
    let validator = jsonschema::JSONSchema::compile(&compiled).expect("valid schema");
    let generator = order_generator(GenerateOptions {
        seed: Some(99),
        ..GenerateOptions::default()
    });

    let mut sink = MemorySink::new();
    let report = generator.simulate("order", 25, &mut sink).expect("simulate");
    assert_eq!(report.records, 25);
    assert_eq!(sink.records.len(), 25);
    assert_eq!(sink.job_id.as_deref(), Some(report.job_id.as_str()));

    for envelope in &sink.records {
        assert_eq!(envelope.kind, "order");
        let record = envelope.data.to_json();
        assert_valid(&validator, &record);

        let quantity = record["quantity"].as_f64().expect("quantity");
        let unit_price = record["unitPrice"].as_f64().expect("unit price");
        let total = record["total"].as_f64().expect("total");
        assert!((total - quantity * unit_price).abs() < 1e-9);
        assert!((1.0..=100.0).contains(&unit_price));
        assert_eq!(record["status"], json!("NEW"));
        assert_eq!(record["customer"]["vip"], json!(false));

        let lines = record["lines"].as_array().expect("lines");
        assert!((1..=3).contains(&lines.len()));
        assert!(lines.iter().all(|line| line["sku"] == json!("SKU-1")));
    }
}

#[test]
fn round_robin_datasets_advance_across_records_and_runs() {
    let generator = order_generator(GenerateOptions::default());
    let city = |sink: &MemorySink| -> Vec<String> {
        sink.records
            .iter()
            .map(|envelope| envelope.data.to_json()["city"].as_str().unwrap_or_default().to_string())
            .collect()
    };

    let mut first = MemorySink::new();
    generator.simulate("order", 4, &mut first).expect("first run");
    assert_eq!(city(&first), ["Lisbon", "Paris", "Berlin", "Lisbon"]);

    let mut second = MemorySink::new();
    generator.simulate("order", 2, &mut second).expect("second run");
    assert_eq!(city(&second), ["Paris", "Berlin"]);
}

#[test]
fn property_order_follows_declaration() {
    let generator = order_generator(GenerateOptions::default());

    let GeneratedValue::Record(record) = generator.generate("order").expect("generate") else {
        panic!("order should generate a record");
    };
    let keys: Vec<&str> = record.keys().map(String::as_str).collect();
    assert_eq!(
        keys,
        [
            "id",
            "status",
            "city",
            "customer",
            "total",
            "quantity",
            "unitPrice",
            "lines",
            "createdAt"
        ]
    );
}

#[test]
fn seed_and_fixed_clock_make_runs_reproducible() {
    let instant = Utc
        .with_ymd_and_hms(2024, 5, 6, 7, 8, 9)
        .single()
        .expect("valid instant");
    let options = GenerateOptions {
        seed: Some(2024),
        fixed_now: Some(instant),
        ..GenerateOptions::default()
    };

    let first = order_generator(options.clone())
        .generate("order")
        .expect("first")
        .to_json();
    let second = order_generator(options)
        .generate("order")
        .expect("second")
        .to_json();
    assert_eq!(first, second);
    assert_eq!(first["createdAt"], json!("2024-05-06T07:08:09.000Z"));
}

#[test]
fn ndjson_sink_writes_one_envelope_per_line() {
    let out = scratch_dir();
    let generator = order_generator(GenerateOptions {
        seed: Some(5),
        ..GenerateOptions::default()
    });
    let mut sink = NdjsonFileSink::new(&out);

    let report = generator.simulate("order", 3, &mut sink).expect("simulate");

    let path = out.join(&report.job_id).join("events.ndjson");
    assert_eq!(sink.path(), Some(path.as_path()));
    let contents = fs::read_to_string(&path).expect("read events");
    let lines: Vec<Value> = contents
        .lines()
        .map(|line| serde_json::from_str(line).expect("json line"))
        .collect();
    assert_eq!(lines.len(), 3);
    for line in &lines {
        assert_eq!(line["type"], json!("order"));
        assert!(uuid::Uuid::parse_str(line["id"].as_str().expect("id")).is_ok());
        assert!(line["timestamp"].as_str().is_some_and(|ts| ts.ends_with('Z')));
        assert!(line["data"]["customer"].is_object());
    }

    fs::remove_dir_all(&out).expect("cleanup");
}

#[test]
fn missing_dataset_fails_the_run() {
    let generator = SchemaGenerator::new(
        fixture_store(),
        Arc::new(MemoryDatasets::new()),
        GenerateOptions::default(),
    );

    let mut sink = MemorySink::new();
    let err = generator
        .simulate("order", 1, &mut sink)
        .expect_err("cities dataset is not registered");
    assert!(err.to_string().contains("cities.csv"), "{err}");
    assert!(sink.records.is_empty());
}
