use rand::Rng;
use serde_json::Value;
use url::Url;

use schemagen_schema::keywords::ITEMS;

use crate::context::GenerationContext;
use crate::errors::Result;
use crate::value::GeneratedValue;

use super::{ResolverRegistry, any_schema};

const PREALLOCATED_ITEMS: usize = 64;

pub(super) fn resolve(
    registry: &ResolverRegistry,
    schema: &Value,
    ctx: &mut GenerationContext,
    base: &Url,
) -> Result<GeneratedValue> {
    let overridden = registry.strategies().apply(schema, ctx)?;
    if !overridden.is_null() {
        return Ok(overridden);
    }

    let min = count_keyword(schema, "minItems").unwrap_or(1);
    let max = count_keyword(schema, "maxItems").unwrap_or(min).max(min);
    let count = if max > min {
        ctx.rng().random_range(min..=max)
    } else {
        min
    };

    let items = match schema.get(ITEMS) {
        Some(Value::Array(tuple)) => {
            let mut items = Vec::with_capacity(tuple.len());
            for item in tuple {
                items.push(registry.generate(item, ctx, base)?);
            }
            items
        }
        item => {
            let fallback = any_schema();
            let item = item.unwrap_or(&fallback);
            registry.with_effective(item, ctx, base, |registry, effective, ctx| {
                let mut items = Vec::with_capacity(count.min(PREALLOCATED_ITEMS));
                for _ in 0..count {
                    items.push(registry.dispatch(effective, ctx)?);
                }
                Ok(items)
            })?
        }
    };

    let unique = schema
        .get("uniqueItems")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    if !unique {
        return Ok(GeneratedValue::List(items));
    }
    let mut distinct: Vec<GeneratedValue> = Vec::with_capacity(items.len());
    for item in items {
        if !distinct.contains(&item) {
            distinct.push(item);
        }
    }
    Ok(GeneratedValue::List(distinct))
}

fn count_keyword(schema: &Value, keyword: &str) -> Option<usize> {
    schema
        .get(keyword)?
        .as_u64()
        .and_then(|count| usize::try_from(count).ok())
}
