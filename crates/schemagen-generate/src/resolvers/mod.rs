//! Type-directed value generation.
//!
//! Every node is first reduced to its effective schema, then dispatched on
//! its `type` to one of the resolvers below. Each resolver consults the
//! node's `x-source` before generating structurally.

mod array;
mod boolean;
mod numeric;
mod object;
mod string;

use serde_json::{Map, Value};
use tracing::debug;
use url::Url;

use schemagen_schema::{Effective, EffectiveSchema, SchemaType};

use crate::context::GenerationContext;
use crate::errors::{GenerationError, Result};
use crate::strategy::StrategyEvaluator;
use crate::value::GeneratedValue;

/// Generator selected by a schema's `type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeResolver {
    String,
    Number,
    Integer,
    Boolean,
    Array,
    Object,
    /// Unknown or `null` types; always produces `null`.
    Unsupported,
}

impl TypeResolver {
    pub fn by_type(name: &str) -> Self {
        match SchemaType::parse(name) {
            Some(SchemaType::String) => Self::String,
            Some(SchemaType::Number) => Self::Number,
            Some(SchemaType::Integer) => Self::Integer,
            Some(SchemaType::Boolean) => Self::Boolean,
            Some(SchemaType::Array) => Self::Array,
            Some(SchemaType::Object) => Self::Object,
            Some(SchemaType::Null) | None => Self::Unsupported,
        }
    }
}

/// Dispatch table from effective schemas to resolvers.
#[derive(Debug, Clone)]
pub struct ResolverRegistry {
    effective: EffectiveSchema,
    strategies: StrategyEvaluator,
}

impl ResolverRegistry {
    pub fn new(effective: EffectiveSchema, strategies: StrategyEvaluator) -> Self {
        Self {
            effective,
            strategies,
        }
    }

    pub fn by_type(&self, name: &str) -> TypeResolver {
        TypeResolver::by_type(name)
    }

    pub fn strategies(&self) -> &StrategyEvaluator {
        &self.strategies
    }

    pub fn effective(&self) -> &EffectiveSchema {
        &self.effective
    }

    /// Generates a value for any schema node read in the document `base`.
    pub fn generate(
        &self,
        schema: &Value,
        ctx: &mut GenerationContext,
        base: &Url,
    ) -> Result<GeneratedValue> {
        self.with_effective(schema, ctx, base, |registry, effective, ctx| {
            registry.dispatch(effective, ctx)
        })
    }

    /// Runs `resolver` on an already effective schema.
    pub fn resolve(
        &self,
        resolver: TypeResolver,
        schema: &Value,
        ctx: &mut GenerationContext,
        base: &Url,
    ) -> Result<GeneratedValue> {
        match resolver {
            TypeResolver::String => string::resolve(&self.strategies, schema, ctx),
            TypeResolver::Number => numeric::resolve_number(&self.strategies, schema, ctx),
            TypeResolver::Integer => numeric::resolve_integer(&self.strategies, schema, ctx),
            TypeResolver::Boolean => boolean::resolve(&self.strategies, schema, ctx),
            TypeResolver::Array => array::resolve(self, schema, ctx, base),
            TypeResolver::Object => object::resolve(self, schema, ctx, base),
            TypeResolver::Unsupported => {
                debug!(schema_type = ?schema.get("type"), "unsupported schema type, generating null");
                Ok(GeneratedValue::Null)
            }
        }
    }

    fn dispatch(&self, effective: &Effective, ctx: &mut GenerationContext) -> Result<GeneratedValue> {
        let resolver = self.by_type(effective.schema_type().unwrap_or("object"));
        self.resolve(resolver, &effective.schema, ctx, &effective.base)
    }

    /// Computes the effective form of `schema` and hands it to `f`.
    ///
    /// References expanded on the way stay on the context's trail while `f`
    /// runs, so a nested node re-entering one of them fails as a cycle.
    pub(crate) fn with_effective<T>(
        &self,
        schema: &Value,
        ctx: &mut GenerationContext,
        base: &Url,
        f: impl FnOnce(&Self, &Effective, &mut GenerationContext) -> Result<T>,
    ) -> Result<T> {
        let mark = ctx.trail().len();
        let result = self
            .effective
            .of_with(schema, base, ctx.trail())
            .map_err(GenerationError::from)
            .and_then(|effective| f(self, &effective, ctx));
        ctx.trail().truncate(mark);
        result
    }
}

/// An empty schema, used where a position holds no sub-schema.
fn any_schema() -> Value {
    Value::Object(Map::new())
}

/// Integer keyword value; fractional numbers go through `round`, so a
/// lower bound can pass `f64::ceil` and an upper bound `f64::floor`.
fn int_keyword(schema: &Value, keyword: &str, round: fn(f64) -> f64) -> Option<i64> {
    let value = schema.get(keyword)?;
    value.as_i64().or_else(|| value.as_f64().map(|value| round(value) as i64))
}

fn float_keyword(schema: &Value, keyword: &str) -> Option<f64> {
    schema.get(keyword)?.as_f64()
}
