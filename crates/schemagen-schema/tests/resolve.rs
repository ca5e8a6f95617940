use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use serde_json::{Value, json};
use url::Url;

use schemagen_schema::reference::rebase;
use schemagen_schema::store::document_id;
use schemagen_schema::{
    DirectorySource, DocumentSource, DocumentStore, MemorySource, RefResolver, ResolutionStack,
    SchemaError,
};

fn temp_dir(label: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("schemagen_{label}_{}", uuid::Uuid::new_v4()));
    fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

struct CountingSource {
    inner: MemorySource,
    reads: Arc<AtomicUsize>,
}

impl DocumentSource for CountingSource {
    fn read(&self, id: &Url) -> schemagen_schema::Result<Option<Value>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.read(id)
    }
}

#[test]
fn store_returns_the_cached_parse() {
    let store = DocumentStore::new(MemorySource::new().with_schema("user", json!({"type": "object"})));

    let first = store.load("user").expect("first load");
    let second = store.load("user").expect("second load");

    assert!(Arc::ptr_eq(&first.root, &second.root));
    assert_eq!(first.base.as_str(), "schema:///user.schema.json");
    assert_eq!(store.cached_count(), 1);
}

#[test]
fn concurrent_first_loads_read_the_source_once() {
    let reads = Arc::new(AtomicUsize::new(0));
    let store = Arc::new(DocumentStore::new(CountingSource {
        inner: MemorySource::new().with_schema("event", json!({"type": "string"})),
        reads: Arc::clone(&reads),
    }));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let store = Arc::clone(&store);
            thread::spawn(move || store.load("event").expect("load"))
        })
        .collect();
    let loaded: Vec<_> = handles
        .into_iter()
        .map(|handle| handle.join().expect("join"))
        .collect();

    assert_eq!(reads.load(Ordering::SeqCst), 1);
    assert!(loaded.windows(2).all(|pair| Arc::ptr_eq(&pair[0].root, &pair[1].root)));
}

#[test]
fn missing_schema_is_not_found() {
    let store = DocumentStore::new(MemorySource::new());

    let err = store.load("absent").expect_err("not found");
    assert!(matches!(err, SchemaError::NotFound { .. }));
    assert!(err.to_string().contains("absent"));
}

#[test]
fn directory_source_reads_schema_files() {
    let dir = temp_dir("directory_source");
    fs::write(
        dir.join("person.schema.json"),
        r#"{"type":"object","properties":{"name":{"type":"string"}}}"#,
    )
    .expect("write schema");
    let store = DocumentStore::new(DirectorySource::new(&dir));

    let loaded = store.load("person").expect("load");
    assert_eq!(loaded.root["properties"]["name"]["type"], "string");
    assert!(matches!(store.load("other"), Err(SchemaError::NotFound { .. })));

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn directory_source_rejects_malformed_documents() {
    let dir = temp_dir("directory_malformed");
    fs::write(dir.join("bad.schema.json"), "{ not json").expect("write schema");
    let store = DocumentStore::new(DirectorySource::new(&dir));

    assert!(matches!(store.load("bad"), Err(SchemaError::Json(_))));

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn deref_returns_unreferenced_nodes_unchanged() {
    let resolver = RefResolver::new(Arc::new(DocumentStore::new(MemorySource::new())));
    let base = document_id("any").expect("id");
    let node = json!({"type": "integer", "minimum": 1});

    let resolved = resolver.deref(&node, &base).expect("deref");
    assert_eq!(resolved.node, node);
    assert_eq!(resolved.base, base);

    let scalar = resolver.deref(&json!("text"), &base).expect("deref scalar");
    assert_eq!(scalar.node, json!("text"));
}

#[test]
fn deref_collapses_reference_chains() {
    let document = json!({
        "$defs": {
            "alias": {"$ref": "#/$defs/middle"},
            "middle": {"$ref": "#/$defs/target"},
            "target": {"type": "boolean"}
        }
    });
    let resolver = RefResolver::new(Arc::new(DocumentStore::new(
        MemorySource::new().with_schema("chain", document),
    )));
    let base = document_id("chain").expect("id");

    let resolved = resolver
        .deref(&json!({"$ref": "#/$defs/alias"}), &base)
        .expect("deref");
    assert_eq!(resolved.node, json!({"type": "boolean"}));
}

#[test]
fn deref_decodes_pointer_escapes() {
    let document = json!({
        "$defs": {
            "with space": {"type": "string"},
            "a/b": {"type": "number"}
        }
    });
    let resolver = RefResolver::new(Arc::new(DocumentStore::new(
        MemorySource::new().with_schema("escaped", document),
    )));
    let base = document_id("escaped").expect("id");

    let spaced = resolver
        .deref(&json!({"$ref": "#/$defs/with%20space"}), &base)
        .expect("percent-encoded");
    assert_eq!(spaced.node["type"], "string");

    let slashed = resolver
        .deref(&json!({"$ref": "#/$defs/a~1b"}), &base)
        .expect("pointer escape");
    assert_eq!(slashed.node["type"], "number");
}

#[test]
fn deref_across_documents_moves_the_base() {
    let resolver = RefResolver::new(Arc::new(DocumentStore::new(
        MemorySource::new()
            .with_schema("main", json!({"type": "object"}))
            .with_schema(
                "shared",
                json!({
                    "$defs": {
                        "id": {"type": "object", "properties": {"raw": {"$ref": "#/$defs/raw"}}},
                        "raw": {"type": "string"}
                    }
                }),
            ),
    )));
    let base = document_id("main").expect("id");

    let resolved = resolver
        .deref(&json!({"$ref": "shared.schema.json#/$defs/id"}), &base)
        .expect("deref");
    assert_eq!(resolved.base, document_id("shared").expect("id"));
    assert_eq!(
        resolved.node["properties"]["raw"]["$ref"],
        "schema:///shared.schema.json#/$defs/raw"
    );
}

#[test]
fn self_referencing_chain_fails_with_cycle() {
    let document = json!({
        "$defs": {
            "a": {"$ref": "#/$defs/b"},
            "b": {"$ref": "#/$defs/a"}
        }
    });
    let resolver = RefResolver::new(Arc::new(DocumentStore::new(
        MemorySource::new().with_schema("loop", document),
    )));
    let base = document_id("loop").expect("id");

    let err = resolver
        .deref(&json!({"$ref": "#/$defs/a"}), &base)
        .expect_err("cycle");
    let message = err.to_string();
    assert!(message.contains("/$defs/a"));
    assert!(message.contains("/$defs/b"));
}

#[test]
fn follow_keeps_expanded_keys_on_the_stack() {
    let resolver = RefResolver::new(Arc::new(DocumentStore::new(
        MemorySource::new().with_schema("doc", json!({"$defs": {"x": {"type": "string"}}})),
    )));
    let base = document_id("doc").expect("id");
    let node = json!({"$ref": "#/$defs/x"});
    let mut stack = ResolutionStack::new();

    resolver.follow(&node, &base, &mut stack).expect("first follow");
    assert_eq!(stack.len(), 1);
    assert_eq!(stack.keys()[0].to_string(), "schema:///doc.schema.json#/$defs/x");

    let err = resolver
        .follow(&node, &base, &mut stack)
        .expect_err("re-entering a key");
    assert!(matches!(err, SchemaError::Cycle { .. }));

    stack.truncate(0);
    assert!(resolver.follow(&node, &base, &mut stack).is_ok());
}

#[test]
fn rebase_rewrites_schema_positions_only() {
    let base = document_id("shared").expect("id");
    let node = json!({
        "type": "object",
        "properties": {
            "default": {"$ref": "#/$defs/inner"},
            "enum": {"items": {"$ref": "#/$defs/inner"}}
        },
        "allOf": [{"$ref": "other.schema.json"}],
        "default": {"$ref": "#/kept"},
        "x-source": {"strategy": "constant", "value": {"$ref": "#/kept"}}
    });

    let rebased = rebase(&node, &base);
    assert_eq!(
        rebased["properties"]["default"]["$ref"],
        "schema:///shared.schema.json#/$defs/inner"
    );
    assert_eq!(
        rebased["properties"]["enum"]["items"]["$ref"],
        "schema:///shared.schema.json#/$defs/inner"
    );
    assert_eq!(rebased["allOf"][0]["$ref"], "schema:///other.schema.json");
    assert_eq!(rebased["default"], json!({"$ref": "#/kept"}));
    assert_eq!(rebased["x-source"]["value"], json!({"$ref": "#/kept"}));
}
