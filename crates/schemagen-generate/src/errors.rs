use thiserror::Error;

use schemagen_schema::SchemaError;

use crate::expression::ExpressionError;

/// Errors emitted while generating values from a schema.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error("expression evaluation failed: {0}")]
    Expression(#[from] ExpressionError),
    #[error("dataset error: {0}")]
    Dataset(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

/// Result type for generation operations.
pub type Result<T> = std::result::Result<T, GenerationError>;
