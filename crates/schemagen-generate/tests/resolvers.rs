use std::collections::HashSet;
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use serde_json::{Value, json};

use schemagen_generate::{
    Clock, GenerateOptions, GenerationContext, GenerationError, MemoryDatasets, SchemaGenerator,
    TypeResolver,
};
use schemagen_schema::{DocumentStore, MemorySource, SchemaError};

fn generator_with(schema: Value, datasets: MemoryDatasets) -> SchemaGenerator {
    let store = Arc::new(DocumentStore::new(
        MemorySource::new().with_schema("subject", schema),
    ));
    SchemaGenerator::new(store, Arc::new(datasets), GenerateOptions::default())
}

fn generator(schema: Value) -> SchemaGenerator {
    generator_with(schema, MemoryDatasets::new())
}

fn generate(generator: &SchemaGenerator, ctx: &mut GenerationContext) -> Value {
    generator
        .generate_with("subject", ctx)
        .expect("generate value")
        .to_json()
}

#[test]
fn type_names_map_to_resolvers() {
    assert_eq!(TypeResolver::by_type("string"), TypeResolver::String);
    assert_eq!(TypeResolver::by_type("integer"), TypeResolver::Integer);
    assert_eq!(TypeResolver::by_type("object"), TypeResolver::Object);
    assert_eq!(TypeResolver::by_type("null"), TypeResolver::Unsupported);
    assert_eq!(TypeResolver::by_type("geo"), TypeResolver::Unsupported);
}

#[test]
fn integers_respect_bounds_and_multiple_of() {
    let generator = generator(json!({
        "type": "integer", "minimum": 0, "maximum": 1000, "multipleOf": 5
    }));
    let mut ctx = GenerationContext::with_seed(11);

    for _ in 0..1000 {
        let value = generate(&generator, &mut ctx).as_i64().expect("integer");
        assert_eq!(value % 5, 0);
        assert!((0..=1000).contains(&value), "{value} out of range");
    }
}

#[test]
fn integer_window_defaults_above_minimum() {
    let generator = generator(json!({"type": "integer", "minimum": 10}));
    let mut ctx = GenerationContext::with_seed(3);

    for _ in 0..200 {
        let value = generate(&generator, &mut ctx).as_i64().expect("integer");
        assert!((10..=110).contains(&value));
    }
}

#[test]
fn integer_maximum_below_minimum_yields_minimum() {
    let generator = generator(json!({"type": "integer", "minimum": 5, "maximum": 1}));
    let mut ctx = GenerationContext::with_seed(3);

    assert_eq!(generate(&generator, &mut ctx), json!(5));
}

#[test]
fn numbers_stay_within_bounds() {
    let generator = generator(json!({"type": "number", "minimum": 1.5, "maximum": 2.5}));
    let mut ctx = GenerationContext::with_seed(5);

    for _ in 0..200 {
        let value = generate(&generator, &mut ctx).as_f64().expect("number");
        assert!((1.5..=2.5).contains(&value));
    }
}

#[test]
fn booleans_fall_back_to_default() {
    let generator = generator(json!({"type": "boolean", "default": true}));
    let mut ctx = GenerationContext::with_seed(1);

    for _ in 0..20 {
        assert_eq!(generate(&generator, &mut ctx), json!(true));
    }
}

#[test]
fn strings_follow_enum_then_format() {
    let generator = generator(json!({
        "type": "object",
        "properties": {
            "status": {"type": "string", "enum": ["NEW", "PAID"]},
            "code": {"type": "string", "enum": [7, 8]},
            "id": {"type": "string", "format": "uuid"},
            "at": {"type": "string", "format": "date-time"},
            "mail": {"type": "string", "format": "email"},
            "plain": {"type": "string"}
        }
    }));
    let instant = Utc
        .with_ymd_and_hms(2024, 1, 2, 3, 4, 5)
        .single()
        .expect("valid instant");
    let mut ctx = GenerationContext::with_seed(9).with_clock(Clock::Fixed(instant));

    let value = generate(&generator, &mut ctx);
    assert_eq!(value["status"], "NEW");
    assert_eq!(value["code"], "7");
    let id = value["id"].as_str().expect("uuid text");
    assert!(uuid::Uuid::parse_str(id).is_ok());
    assert_eq!(value["at"], "2024-01-02T03:04:05.000Z");
    assert_eq!(value["mail"], "user@example.com");
    assert_eq!(value["plain"], "text");
}

#[test]
fn arrays_are_sized_and_deduplicated() {
    let generator = generator(json!({
        "type": "array",
        "minItems": 2,
        "maxItems": 5,
        "uniqueItems": true,
        "items": {"type": "integer", "minimum": 0, "maximum": 1_000_000_000_000_i64}
    }));
    let mut ctx = GenerationContext::with_seed(21);

    for _ in 0..1000 {
        let value = generate(&generator, &mut ctx);
        let items = value.as_array().expect("array");
        assert!((2..=5).contains(&items.len()), "unexpected length {}", items.len());
        let distinct: HashSet<String> = items.iter().map(Value::to_string).collect();
        assert_eq!(distinct.len(), items.len());
    }
}

#[test]
fn unique_items_may_return_fewer_than_min_items() {
    let generator = generator(json!({
        "type": "array",
        "minItems": 3,
        "maxItems": 3,
        "uniqueItems": true,
        "items": {"type": "string"}
    }));
    let mut ctx = GenerationContext::with_seed(2);

    assert_eq!(generate(&generator, &mut ctx), json!(["text"]));
}

#[test]
fn array_defaults_to_one_item() {
    let generator = generator(json!({"type": "array", "items": {"type": "boolean", "default": false}}));
    let mut ctx = GenerationContext::with_seed(2);

    assert_eq!(generate(&generator, &mut ctx), json!([false]));
}

#[test]
fn tuple_items_generate_one_value_per_schema() {
    let generator = generator(json!({
        "type": "array",
        "items": [
            {"type": "string", "format": "email"},
            {"type": "integer", "minimum": 4, "maximum": 4}
        ]
    }));
    let mut ctx = GenerationContext::with_seed(2);

    assert_eq!(generate(&generator, &mut ctx), json!(["user@example.com", 4]));
}

#[test]
fn first_non_null_type_selects_the_resolver() {
    let generator = generator(json!({"type": ["null", "integer"], "minimum": 3, "maximum": 3}));
    let mut ctx = GenerationContext::with_seed(2);

    assert_eq!(generate(&generator, &mut ctx), json!(3));
}

#[test]
fn unsupported_types_generate_null() {
    let generator = generator(json!({
        "type": "object",
        "properties": {
            "where": {"type": "geo", "x-source": {"strategy": "constant", "value": "ignored"}},
            "nothing": {"type": "null"}
        }
    }));
    let mut ctx = GenerationContext::with_seed(2);

    assert_eq!(generate(&generator, &mut ctx), json!({"where": null, "nothing": null}));
}

#[test]
fn untyped_nodes_are_inferred() {
    let generator = generator(json!({
        "properties": {
            "code": {"maxLength": 3},
            "even": {"multipleOf": 2, "minimum": 2, "maximum": 2},
            "flags": {"items": {"const": true}, "minItems": 1},
            "choice": {"anyOf": [{"minimum": 1}, {"type": "integer", "minimum": 9, "maximum": 9}]}
        }
    }));
    let mut ctx = GenerationContext::with_seed(2);

    let value = generate(&generator, &mut ctx);
    assert_eq!(value["code"], "text");
    assert_eq!(value["even"], json!(2.0));
    assert!(value["flags"].is_array());
    assert_eq!(value["choice"], json!(9));
}

#[test]
fn overrides_are_coerced_to_the_resolver_type() {
    let datasets = MemoryDatasets::new().with_table("flags", &["flag", "count"], &[&["true", "12"]]);
    let generator = generator_with(
        json!({
            "type": "object",
            "properties": {
                "ranged": {"type": "integer", "x-source": {"strategy": "range", "min": 10, "max": 20}},
                "label": {"type": "string", "x-source": {"strategy": "constant", "value": 42}},
                "ratio": {"type": "number", "x-source": {"strategy": "constant", "value": 3}},
                "enabled": {"type": "boolean", "x-source": {"strategy": "dataset", "file": "flags", "column": "flag"}},
                "count": {"type": "integer", "x-source": {"strategy": "dataset", "file": "flags", "column": "count"}}
            }
        }),
        datasets,
    );
    let mut ctx = GenerationContext::with_seed(8);

    let value = generate(&generator, &mut ctx);
    let ranged = value["ranged"].as_i64().expect("integer override");
    assert!((10..20).contains(&ranged));
    assert_eq!(value["label"], "42");
    assert_eq!(value["ratio"], json!(3.0));
    assert_eq!(value["enabled"], json!(true));
    assert_eq!(value["count"], json!(12));
}

#[test]
fn expression_fields_see_siblings_declared_after_them() {
    let generator = generator(json!({
        "type": "object",
        "properties": {
            "b": {"type": "integer", "x-source": {"strategy": "expression", "expr": "a + 1"}},
            "a": {"type": "integer", "minimum": 1, "maximum": 1},
            "label": {"$ref": "#/$defs/label"}
        },
        "$defs": {
            "label": {"type": "string", "x-source": {"strategy": "expression", "expr": "'n' + b"}}
        }
    }));
    let mut ctx = GenerationContext::with_seed(4);

    let value = generate(&generator, &mut ctx);
    let keys: Vec<&str> = value
        .as_object()
        .expect("object")
        .keys()
        .map(String::as_str)
        .collect();
    assert_eq!(keys, ["b", "a", "label"]);
    assert_eq!(value["b"], json!(2));
    assert_eq!(value["label"], "n2");
}

#[test]
fn repeated_references_to_one_definition_are_not_cycles() {
    let generator = generator(json!({
        "type": "object",
        "properties": {
            "a": {"$ref": "#/$defs/one"},
            "b": {"$ref": "#/$defs/one"},
            "list": {"type": "array", "minItems": 2, "maxItems": 2, "items": {"$ref": "#/$defs/one"}}
        },
        "$defs": {"one": {"type": "integer", "minimum": 1, "maximum": 1}}
    }));
    let mut ctx = GenerationContext::with_seed(4);

    assert_eq!(
        generate(&generator, &mut ctx),
        json!({"a": 1, "b": 1, "list": [1, 1]})
    );
}

#[test]
fn recursive_schema_fails_with_cycle() {
    let generator = generator(json!({
        "type": "object",
        "properties": {"child": {"$ref": "#"}}
    }));
    let mut ctx = GenerationContext::with_seed(4);

    let err = generator
        .generate_with("subject", &mut ctx)
        .expect_err("recursion");
    assert!(matches!(err, GenerationError::Schema(SchemaError::Cycle { .. })));
}

#[test]
fn seeded_contexts_are_reproducible() {
    let generator = generator(json!({
        "type": "object",
        "properties": {
            "n": {"type": "integer"},
            "x": {"type": "number"},
            "flag": {"type": "boolean"},
            "id": {"type": "string", "format": "uuid"},
            "tags": {"type": "array", "minItems": 1, "maxItems": 4, "items": {"type": "integer"}}
        }
    }));

    let first = generate(&generator, &mut GenerationContext::with_seed(99));
    let second = generate(&generator, &mut GenerationContext::with_seed(99));
    assert_eq!(first, second);
}

#[test]
fn numbers_cover_the_widest_finite_range() {
    let generator = generator(json!({"type": "number", "minimum": -1.0e308, "maximum": 1.0e308}));
    let mut ctx = GenerationContext::with_seed(8);

    for _ in 0..200 {
        let value = generate(&generator, &mut ctx).as_f64().expect("number");
        assert!(value.is_finite());
        assert!((-1.0e308..=1.0e308).contains(&value));
    }
}

#[test]
fn fractional_integer_bounds_round_inward() {
    let generator = generator(json!({"type": "integer", "minimum": 1.5, "maximum": 3.5}));
    let mut ctx = GenerationContext::with_seed(12);

    let seen: HashSet<i64> = (0..300)
        .map(|_| generate(&generator, &mut ctx).as_i64().expect("integer"))
        .collect();
    assert_eq!(seen, HashSet::from([2, 3]));
}

#[test]
fn large_arrays_grow_past_the_preallocation() {
    let generator = generator(json!({
        "type": "array", "minItems": 500, "maxItems": 500, "items": {"type": "boolean"}
    }));
    let mut ctx = GenerationContext::with_seed(2);

    let value = generate(&generator, &mut ctx);
    assert_eq!(value.as_array().expect("array").len(), 500);
}

#[test]
fn expressions_composed_through_all_of_run_after_siblings() {
    let generator = generator(json!({
        "type": "object",
        "properties": {
            "total": {
                "allOf": [
                    {"type": "integer"},
                    {"x-source": {"strategy": "expression", "expr": "base + 1"}}
                ]
            },
            "pick": {
                "oneOf": [
                    {"type": "integer", "x-source": {"strategy": "expression", "expr": "base * 2"}},
                    {"type": "string"}
                ]
            },
            "base": {"type": "integer", "x-source": {"strategy": "constant", "value": 4}}
        }
    }));
    let mut ctx = GenerationContext::with_seed(6);

    let value = generate(&generator, &mut ctx);
    assert_eq!(value, json!({"total": 5, "pick": 8, "base": 4}));
}

#[test]
fn cross_document_all_of_keeps_nested_references_in_their_document() {
    let store = Arc::new(DocumentStore::new(
        MemorySource::new()
            .with_schema(
                "subject",
                json!({"allOf": [{"$ref": "common.schema.json#/$defs/obj"}]}),
            )
            .with_schema(
                "common",
                json!({
                    "$defs": {
                        "obj": {
                            "type": "object",
                            "properties": {
                                "plain": {"$ref": "#/$defs/inner"},
                                "default": {"$ref": "#/$defs/inner"}
                            }
                        },
                        "inner": {"type": "integer", "minimum": 5, "maximum": 5}
                    }
                }),
            ),
    ));
    let generator = SchemaGenerator::new(
        store,
        Arc::new(MemoryDatasets::new()),
        GenerateOptions::default(),
    );
    let mut ctx = GenerationContext::with_seed(1);

    let value = generate(&generator, &mut ctx);
    assert_eq!(value, json!({"plain": 5, "default": 5}));
}
