use rand::Rng;
use serde_json::Value;

use crate::context::GenerationContext;
use crate::errors::Result;
use crate::strategy::StrategyEvaluator;
use crate::value::GeneratedValue;

pub(super) fn resolve(
    strategies: &StrategyEvaluator,
    schema: &Value,
    ctx: &mut GenerationContext,
) -> Result<GeneratedValue> {
    let overridden = strategies.apply(schema, ctx)?;
    if !overridden.is_null() {
        return Ok(coerce(overridden));
    }
    if let Some(default) = schema.get("default") {
        return Ok(GeneratedValue::Bool(default.as_bool().unwrap_or(false)));
    }
    Ok(GeneratedValue::Bool(ctx.rng().random_bool(0.5)))
}

fn coerce(value: GeneratedValue) -> GeneratedValue {
    match value {
        GeneratedValue::Text(text) if text.trim().eq_ignore_ascii_case("true") => {
            GeneratedValue::Bool(true)
        }
        GeneratedValue::Text(text) if text.trim().eq_ignore_ascii_case("false") => {
            GeneratedValue::Bool(false)
        }
        other => other,
    }
}
