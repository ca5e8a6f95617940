use serde_json::Value;
use url::Url;

use schemagen_schema::keywords::{ALL_OF, ANY_OF, ONE_OF, PROPERTIES};
use schemagen_schema::reference::reference_of;

use crate::context::GenerationContext;
use crate::errors::Result;
use crate::strategy::declares_expression;
use crate::value::{GeneratedValue, Record};

use super::ResolverRegistry;

/// Generates declared properties in two passes: plain properties first,
/// binding each into the context, then `expression` properties, which may
/// read any sibling. The record keeps declaration order.
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

    let Some(Value::Object(properties)) = schema.get(PROPERTIES) else {
        return Ok(GeneratedValue::Record(Record::new()));
    };

    let mut record = Record::with_capacity(properties.len());
    let mut deferred = Vec::new();
    for (name, property) in properties {
        record.insert(name.clone(), GeneratedValue::Null);
        if is_expression(registry, property, base)? {
            deferred.push((name, property));
            continue;
        }
        let value = registry.generate(property, ctx, base)?;
        ctx.set_var(name.clone(), value.clone());
        record.insert(name.clone(), value);
    }

    for (name, property) in deferred {
        let value = registry.generate(property, ctx, base)?;
        ctx.set_var(name.clone(), value.clone());
        record.insert(name.clone(), value);
    }

    Ok(GeneratedValue::Record(record))
}

fn is_expression(registry: &ResolverRegistry, property: &Value, base: &Url) -> Result<bool> {
    if declares_expression(property) {
        return Ok(true);
    }
    let composed = reference_of(property).is_some()
        || [ALL_OF, ANY_OF, ONE_OF]
            .iter()
            .any(|keyword| property.get(keyword).is_some());
    if !composed {
        return Ok(false);
    }
    let effective = registry.effective().of(property, base)?;
    Ok(declares_expression(&effective.schema))
}
