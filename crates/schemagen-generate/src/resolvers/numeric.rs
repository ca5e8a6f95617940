use rand::Rng;
use serde_json::Value;

use crate::context::GenerationContext;
use crate::errors::Result;
use crate::strategy::StrategyEvaluator;
use crate::value::GeneratedValue;

use super::{float_keyword, int_keyword};

const DEFAULT_SPAN: i64 = 100;

pub(super) fn resolve_integer(
    strategies: &StrategyEvaluator,
    schema: &Value,
    ctx: &mut GenerationContext,
) -> Result<GeneratedValue> {
    let overridden = strategies.apply(schema, ctx)?;
    if !overridden.is_null() {
        return Ok(coerce_integer(overridden));
    }

    let min = int_keyword(schema, "minimum", f64::ceil).unwrap_or(0);
    let max = int_keyword(schema, "maximum", f64::floor)
        .unwrap_or(min.saturating_add(DEFAULT_SPAN));
    let drawn = if max > min {
        ctx.rng().random_range(min..=max)
    } else {
        min
    };
    let value = match float_keyword(schema, "multipleOf") {
        Some(step) if step > 0.0 => round_to_multiple(drawn as f64, step) as i64,
        _ => drawn,
    };
    Ok(GeneratedValue::Int(value))
}

pub(super) fn resolve_number(
    strategies: &StrategyEvaluator,
    schema: &Value,
    ctx: &mut GenerationContext,
) -> Result<GeneratedValue> {
    let overridden = strategies.apply(schema, ctx)?;
    if !overridden.is_null() {
        return Ok(coerce_number(overridden));
    }

    let min = float_keyword(schema, "minimum").unwrap_or(0.0);
    let max = float_keyword(schema, "maximum").unwrap_or(min + DEFAULT_SPAN as f64);
    let drawn = if max > min {
        let unit: f64 = ctx.rng().random();
        interpolate(min, max, unit)
    } else {
        min
    };
    let value = match float_keyword(schema, "multipleOf") {
        Some(step) if step > 0.0 => round_to_multiple(drawn, step),
        _ => drawn,
    };
    Ok(GeneratedValue::Float(value))
}

/// Point `unit` of the way from `min` to `max`. Wide ranges whose span
/// overflows are blended instead of subtracted.
fn interpolate(min: f64, max: f64, unit: f64) -> f64 {
    let span = max - min;
    if span.is_finite() {
        min + unit * span
    } else {
        min * (1.0 - unit) + max * unit
    }
}

/// Nearest multiple of `step`, halves rounding up. May leave `[min, max]`
/// by at most half a step.
fn round_to_multiple(value: f64, step: f64) -> f64 {
    ((value / step) + 0.5).floor() * step
}

fn coerce_integer(value: GeneratedValue) -> GeneratedValue {
    match value {
        GeneratedValue::Float(number) => GeneratedValue::Int(number.trunc() as i64),
        GeneratedValue::Text(text) => {
            let trimmed = text.trim();
            if let Ok(number) = trimmed.parse::<i64>() {
                GeneratedValue::Int(number)
            } else if let Ok(number) = trimmed.parse::<f64>() {
                GeneratedValue::Int(number.trunc() as i64)
            } else {
                GeneratedValue::Text(text)
            }
        }
        other => other,
    }
}

fn coerce_number(value: GeneratedValue) -> GeneratedValue {
    match value {
        GeneratedValue::Int(number) => GeneratedValue::Float(number as f64),
        GeneratedValue::Text(text) => match text.trim().parse::<f64>() {
            Ok(number) => GeneratedValue::Float(number),
            Err(_) => GeneratedValue::Text(text),
        },
        other => other,
    }
}
