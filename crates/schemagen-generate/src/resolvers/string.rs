use serde_json::Value;

use crate::context::GenerationContext;
use crate::errors::Result;
use crate::strategy::{StrategyEvaluator, random_uuid};
use crate::value::GeneratedValue;

const PLACEHOLDER_EMAIL: &str = "user@example.com";
const PLACEHOLDER_TEXT: &str = "text";

pub(super) fn resolve(
    strategies: &StrategyEvaluator,
    schema: &Value,
    ctx: &mut GenerationContext,
) -> Result<GeneratedValue> {
    let overridden = strategies.apply(schema, ctx)?;
    if !overridden.is_null() {
        return Ok(coerce(overridden));
    }

    if let Some(first) = schema
        .get("enum")
        .and_then(Value::as_array)
        .and_then(|values| values.first())
    {
        let text = match first {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        };
        return Ok(GeneratedValue::Text(text));
    }

    let value = match schema.get("format").and_then(Value::as_str) {
        Some("uuid") => GeneratedValue::Uuid(random_uuid(ctx)),
        Some("date-time") => GeneratedValue::Timestamp(ctx.now()),
        Some("email") => GeneratedValue::Text(PLACEHOLDER_EMAIL.to_string()),
        _ => GeneratedValue::Text(PLACEHOLDER_TEXT.to_string()),
    };
    Ok(value)
}

fn coerce(value: GeneratedValue) -> GeneratedValue {
    match value {
        GeneratedValue::Text(_) | GeneratedValue::Uuid(_) | GeneratedValue::Timestamp(_) => value,
        other => GeneratedValue::Text(other.render()),
    }
}
