use std::fmt;

use serde_json::{Map, Value};
use url::Url;

use crate::errors::Result;
use crate::keywords::{ALL_OF, ANY_OF, ONE_OF, TYPE, try_map_subschemas};
use crate::merge::{merge, merge_into};
use crate::reference::{RefResolver, ResolutionStack, reference_of, split_local_keywords};

/// Primitive JSON Schema types the generator knows how to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaType {
    Object,
    Array,
    String,
    Integer,
    Number,
    Boolean,
    Null,
}

impl SchemaType {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "object" => Some(Self::Object),
            "array" => Some(Self::Array),
            "string" => Some(Self::String),
            "integer" => Some(Self::Integer),
            "number" => Some(Self::Number),
            "boolean" => Some(Self::Boolean),
            "null" => Some(Self::Null),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Object => "object",
            Self::Array => "array",
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Null => "null",
        }
    }

    /// Type of a literal instance value (used for `enum` / `const` inference).
    pub fn of_value(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(_) => Self::Boolean,
            Value::Number(number) if number.is_i64() || number.is_u64() => Self::Integer,
            Value::Number(_) => Self::Number,
            Value::String(_) => Self::String,
            Value::Array(_) => Self::Array,
            Value::Object(_) => Self::Object,
        }
    }
}

impl fmt::Display for SchemaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const OBJECT_HINTS: &[&str] = &[
    "properties",
    "additionalProperties",
    "patternProperties",
    "required",
];
const ARRAY_HINTS: &[&str] = &["items", "additionalItems", "prefixItems"];
const STRING_HINTS: &[&str] = &["pattern", "format", "minLength", "maxLength"];
const NUMBER_HINTS: &[&str] = &[
    "minimum",
    "maximum",
    "exclusiveMinimum",
    "exclusiveMaximum",
    "multipleOf",
];

/// The `type` a schema declares.
///
/// For a list of types the first non-`null` entry wins; a list holding only
/// `null` yields `"null"`.
pub fn declared_type(schema: &Value) -> Option<&str> {
    match schema.as_object()?.get(TYPE)? {
        Value::String(name) => Some(name.as_str()),
        Value::Array(names) => {
            let mut names = names.iter().filter_map(Value::as_str);
            let first = names.clone().next();
            names.find(|name| *name != "null").or(first)
        }
        _ => None,
    }
}

/// Structural type inference for a schema without a `type` keyword.
pub fn infer_type(schema: &Map<String, Value>) -> SchemaType {
    let has_any = |keys: &[&str]| keys.iter().any(|key| schema.contains_key(*key));

    if has_any(OBJECT_HINTS) {
        return SchemaType::Object;
    }
    if has_any(ARRAY_HINTS) {
        return SchemaType::Array;
    }
    if let Some(first) = schema
        .get("enum")
        .and_then(Value::as_array)
        .and_then(|values| values.first())
    {
        return SchemaType::of_value(first);
    }
    if let Some(constant) = schema.get("const") {
        return SchemaType::of_value(constant);
    }
    if has_any(STRING_HINTS) {
        return SchemaType::String;
    }
    if has_any(NUMBER_HINTS) {
        return SchemaType::Number;
    }
    // Bare combinators and empty schemas both end up as objects.
    SchemaType::Object
}

/// Adds an inferred `type` to a schema object that lacks one.
pub fn ensure_type(schema: Value) -> Value {
    match schema {
        Value::Object(mut map) if !map.contains_key(TYPE) => {
            let inferred = infer_type(&map);
            map.insert(TYPE.to_string(), Value::String(inferred.as_str().to_string()));
            Value::Object(map)
        }
        other => other,
    }
}

/// [`ensure_type`] applied at every schema-bearing position of a tree.
pub fn ensure_types_deep(schema: Value) -> Value {
    match ensure_type(schema) {
        Value::Object(map) => {
            let typed: std::result::Result<_, std::convert::Infallible> =
                try_map_subschemas(&map, |sub| Ok(ensure_types_deep(sub.clone())));
            match typed {
                Ok(map) => Value::Object(map),
                Err(never) => match never {},
            }
        }
        other => other,
    }
}

/// A type-bearing schema and the document its remaining references resolve against.
#[derive(Debug, Clone, PartialEq)]
pub struct Effective {
    pub schema: Value,
    pub base: Url,
}

impl Effective {
    pub fn schema_type(&self) -> Option<&str> {
        declared_type(&self.schema)
    }
}

/// Computes the single applicable form of a schema node for generation.
///
/// Only the node itself is flattened: `$ref` is followed, `allOf` folded and
/// one `anyOf` / `oneOf` branch selected. Nested `properties` and `items`
/// keep their references and are resolved when the generator reaches them.
#[derive(Debug, Clone)]
pub struct EffectiveSchema {
    resolver: RefResolver,
}

impl EffectiveSchema {
    pub fn new(resolver: RefResolver) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &RefResolver {
        &self.resolver
    }

    pub fn of(&self, node: &Value, base: &Url) -> Result<Effective> {
        let mut stack = ResolutionStack::new();
        self.of_with(node, base, &mut stack)
    }

    /// Like [`EffectiveSchema::of`], tracking expanded references on `stack`.
    ///
    /// References followed on the way to the result stay on the stack; the
    /// caller truncates it once it is done with the returned schema.
    pub fn of_with(&self, node: &Value, base: &Url, stack: &mut ResolutionStack) -> Result<Effective> {
        let Effective { schema, base } = self.raw(node, base, stack)?;
        Ok(Effective {
            schema: ensure_type(schema),
            base,
        })
    }

    fn raw(&self, node: &Value, base: &Url, stack: &mut ResolutionStack) -> Result<Effective> {
        if let Some((plain, local)) = split_local_keywords(node) {
            let target = self.raw(&plain, base, stack)?;
            let local = self.raw(&Value::Object(local), base, stack)?;
            return Ok(Effective {
                schema: merge(&target.schema, &local.schema),
                base: base.clone(),
            });
        }

        if reference_of(node).is_some() {
            let resolved = self.resolver.follow(node, base, stack)?;
            return self.raw(&resolved.node, &resolved.base, stack);
        }

        let Some(map) = node.as_object() else {
            return Ok(Effective {
                schema: node.clone(),
                base: base.clone(),
            });
        };

        let mut schema = match map.get(ALL_OF) {
            Some(Value::Array(branches)) => {
                let mark = stack.len();
                let mut merged = Map::new();
                for branch in branches {
                    let branch = self.raw(branch, base, stack)?;
                    stack.truncate(mark);
                    if let Value::Object(branch) = branch.schema {
                        merge_into(&mut merged, &branch);
                    }
                }
                let mut carrier = map.clone();
                carrier.remove(ALL_OF);
                merge_into(&mut merged, &carrier);
                merged
            }
            _ => map.clone(),
        };

        for combinator in [ANY_OF, ONE_OF] {
            let Some(Value::Array(branches)) = schema.get(combinator) else {
                continue;
            };
            let mark = stack.len();
            let mut chosen = None;
            for branch in branches {
                let branch = self.raw(branch, base, stack)?;
                stack.truncate(mark);
                if declared_type(&branch.schema).is_some() {
                    chosen = Some(branch.schema);
                    break;
                }
            }
            if let Some(Value::Object(branch)) = chosen {
                schema.remove(ANY_OF);
                schema.remove(ONE_OF);
                merge_into(&mut schema, &branch);
                break;
            }
        }

        Ok(Effective {
            schema: Value::Object(schema),
            base: base.clone(),
        })
    }
}
