use std::sync::Arc;

use rand::Rng;
use schemars::{JsonSchema, schema_for};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::context::GenerationContext;
use crate::dataset::DatasetSource;
use crate::errors::{GenerationError, Result};
use crate::expression::Expression;
use crate::faker::fake_value;
use crate::value::GeneratedValue;

/// Schema keyword carrying an extension-source strategy.
pub const X_SOURCE: &str = "x-source";

const STRATEGIES: &[&str] = &[
    "uuid",
    "now",
    "constant",
    "range",
    "probability",
    "faker",
    "dataset",
    "expression",
];

const DEFAULT_RANGE_SPAN: f64 = 100.0;
const DEFAULT_PROBABILITY: f64 = 0.5;

/// An `x-source` declaration: overrides structural generation for one node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "strategy", rename_all = "lowercase")]
pub enum XSource {
    /// Random UUID text.
    Uuid,
    /// Current instant as RFC 3339 text.
    Now,
    /// A literal value; arrays and objects are rendered as JSON text.
    Constant { value: Option<Value> },
    /// Uniform draw in `[min, max)`; defaults to `[0, min + 100)`.
    Range { min: Option<f64>, max: Option<f64> },
    /// `true` with probability `p` (default 0.5).
    Probability { p: Option<f64> },
    /// Realistic text from a named provider such as `name.firstName`.
    Faker { provider: Option<String> },
    /// Column of a row picked from a tabular dataset.
    Dataset {
        file: Option<String>,
        column: Option<String>,
        /// `random` (default) or `roundrobin`.
        mode: Option<String>,
    },
    /// Expression over fields generated earlier in the same run.
    Expression { expr: Option<String> },
}

impl XSource {
    /// Reads the `x-source` keyword of `schema`.
    ///
    /// Unknown strategy names and malformed declarations yield `None`, which
    /// leaves the node to structural generation.
    pub fn from_schema(schema: &Value) -> Option<Self> {
        let raw = schema.as_object()?.get(X_SOURCE)?;
        let Some(strategy) = raw.get("strategy").and_then(Value::as_str) else {
            warn!(x_source = %raw, "x-source without a strategy ignored");
            return None;
        };
        if !STRATEGIES.contains(&strategy) {
            debug!(strategy, "unknown x-source strategy");
            return None;
        }
        match serde_json::from_value(raw.clone()) {
            Ok(source) => Some(source),
            Err(err) => {
                warn!(strategy, error = %err, "malformed x-source ignored");
                None
            }
        }
    }

    pub fn is_expression(&self) -> bool {
        matches!(self, XSource::Expression { .. })
    }

    pub fn name(&self) -> &'static str {
        match self {
            XSource::Uuid => "uuid",
            XSource::Now => "now",
            XSource::Constant { .. } => "constant",
            XSource::Range { .. } => "range",
            XSource::Probability { .. } => "probability",
            XSource::Faker { .. } => "faker",
            XSource::Dataset { .. } => "dataset",
            XSource::Expression { .. } => "expression",
        }
    }
}

/// JSON Schema describing the `x-source` keyword.
pub fn x_source_schema() -> Result<Value> {
    Ok(serde_json::to_value(schema_for!(XSource))?)
}

/// Whether the raw `x-source` of `schema` names the `expression` strategy.
pub fn declares_expression(schema: &Value) -> bool {
    schema
        .get(X_SOURCE)
        .and_then(|raw| raw.get("strategy"))
        .and_then(Value::as_str)
        == Some("expression")
}

/// Applies `x-source` declarations against a generation context.
#[derive(Clone)]
pub struct StrategyEvaluator {
    datasets: Arc<dyn DatasetSource>,
}

impl std::fmt::Debug for StrategyEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StrategyEvaluator").finish_non_exhaustive()
    }
}

impl StrategyEvaluator {
    pub fn new(datasets: Arc<dyn DatasetSource>) -> Self {
        Self { datasets }
    }

    /// Override value for `schema`, or [`GeneratedValue::Null`] when it
    /// declares nothing usable.
    pub fn apply(&self, schema: &Value, ctx: &mut GenerationContext) -> Result<GeneratedValue> {
        match XSource::from_schema(schema) {
            Some(source) => self.evaluate(&source, ctx),
            None => Ok(GeneratedValue::Null),
        }
    }

    pub fn evaluate(&self, source: &XSource, ctx: &mut GenerationContext) -> Result<GeneratedValue> {
        let value = match source {
            XSource::Uuid => GeneratedValue::Uuid(random_uuid(ctx)),
            XSource::Now => GeneratedValue::Timestamp(ctx.now()),
            XSource::Constant { value } => constant(value.as_ref()),
            XSource::Range { min, max } => {
                let min = min.unwrap_or(0.0);
                let max = max.unwrap_or(min + DEFAULT_RANGE_SPAN);
                let unit: f64 = ctx.rng().random();
                GeneratedValue::Float(min + unit * (max - min))
            }
            XSource::Probability { p } => {
                let p = p.unwrap_or(DEFAULT_PROBABILITY);
                let unit: f64 = ctx.rng().random();
                GeneratedValue::Bool(unit < p)
            }
            XSource::Faker { provider } => {
                let locale = ctx.locale();
                fake_value(provider.as_deref().unwrap_or_default(), locale, ctx.rng())
            }
            XSource::Dataset { file, column, mode } => {
                self.dataset_pick(file.as_deref(), column.as_deref(), mode.as_deref(), ctx)?
            }
            XSource::Expression { expr } => {
                let expr = expr.as_deref().unwrap_or_default();
                Expression::parse(expr)?.evaluate(ctx.vars())?
            }
        };
        Ok(value)
    }

    fn dataset_pick(
        &self,
        file: Option<&str>,
        column: Option<&str>,
        mode: Option<&str>,
        ctx: &mut GenerationContext,
    ) -> Result<GeneratedValue> {
        let file = file.ok_or_else(|| {
            GenerationError::Dataset("dataset strategy requires a 'file'".to_string())
        })?;
        let rows = self.datasets.load_rows(file)?;
        if rows.is_empty() {
            return Ok(GeneratedValue::Null);
        }

        let index = if mode.is_some_and(|mode| mode.eq_ignore_ascii_case("roundrobin")) {
            (ctx.next_index(file) % rows.len() as u64) as usize
        } else {
            ctx.rng().random_range(0..rows.len())
        };
        let cell = column.and_then(|column| rows[index].get(column));
        Ok(cell
            .map(|cell| GeneratedValue::Text(cell.clone()))
            .unwrap_or(GeneratedValue::Null))
    }
}

fn constant(value: Option<&Value>) -> GeneratedValue {
    match value {
        None | Some(Value::Null) => GeneratedValue::Null,
        Some(composite @ (Value::Array(_) | Value::Object(_))) => {
            GeneratedValue::Text(composite.to_string())
        }
        Some(scalar) => GeneratedValue::from_json(scalar),
    }
}

/// Version 4 UUID drawn from the context's random source.
pub fn random_uuid(ctx: &mut GenerationContext) -> String {
    let mut bytes = [0_u8; 16];
    ctx.rng().fill(&mut bytes);
    bytes[6] = (bytes[6] & 0x0f) | 0x40;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;
    uuid::Uuid::from_bytes(bytes).to_string()
}
