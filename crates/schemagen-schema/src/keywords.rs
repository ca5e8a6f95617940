//! Schema keyword tables and traversal over schema-bearing positions.

use serde_json::{Map, Value};

pub const REF: &str = "$ref";
pub const TYPE: &str = "type";
pub const ALL_OF: &str = "allOf";
pub const ANY_OF: &str = "anyOf";
pub const ONE_OF: &str = "oneOf";
pub const PROPERTIES: &str = "properties";
pub const REQUIRED: &str = "required";
pub const ITEMS: &str = "items";

/// Keywords whose value is a single sub-schema (`items` may also be a list).
pub const SCHEMA_KEYWORDS: &[&str] = &[
    "additionalProperties",
    "propertyNames",
    "items",
    "additionalItems",
    "contains",
    "not",
    "if",
    "then",
    "else",
];

/// Keywords whose value maps names to sub-schemas.
pub const SCHEMA_MAP_KEYWORDS: &[&str] = &[
    "properties",
    "patternProperties",
    "dependentSchemas",
    "$defs",
    "definitions",
];

/// Keywords whose value is a list of sub-schemas.
pub const SCHEMA_LIST_KEYWORDS: &[&str] = &["allOf", "anyOf", "oneOf", "prefixItems"];

/// Rebuilds `schema` with `f` applied to every direct sub-schema.
///
/// Keys keep their order; values at non-schema positions are copied as-is.
pub fn try_map_subschemas<E, F>(schema: &Map<String, Value>, mut f: F) -> Result<Map<String, Value>, E>
where
    F: FnMut(&Value) -> Result<Value, E>,
{
    let mut mapped = Map::with_capacity(schema.len());
    for (key, value) in schema {
        let keyword = key.as_str();
        let value = if SCHEMA_KEYWORDS.contains(&keyword) {
            match value {
                Value::Array(items) if keyword == ITEMS => {
                    Value::Array(items.iter().map(&mut f).collect::<Result<_, E>>()?)
                }
                _ => f(value)?,
            }
        } else if SCHEMA_MAP_KEYWORDS.contains(&keyword) {
            match value {
                Value::Object(entries) => {
                    let mut out = Map::with_capacity(entries.len());
                    for (name, sub) in entries {
                        out.insert(name.clone(), f(sub)?);
                    }
                    Value::Object(out)
                }
                _ => value.clone(),
            }
        } else if SCHEMA_LIST_KEYWORDS.contains(&keyword) {
            match value {
                Value::Array(items) => {
                    Value::Array(items.iter().map(&mut f).collect::<Result<_, E>>()?)
                }
                _ => value.clone(),
            }
        } else {
            value.clone()
        };
        mapped.insert(key.clone(), value);
    }
    Ok(mapped)
}

/// Removes any `$ref` keyword left anywhere in a compiled schema.
pub fn strip_refs(schema: Value) -> Value {
    match schema {
        Value::Object(mut map) => {
            map.remove(REF);
            let stripped: Result<_, std::convert::Infallible> =
                try_map_subschemas(&map, |sub| Ok(strip_refs(sub.clone())));
            match stripped {
                Ok(map) => Value::Object(map),
                Err(never) => match never {},
            }
        }
        other => other,
    }
}
