use thiserror::Error;

/// Errors raised while loading, dereferencing, or compiling schema documents.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// No document backs the requested schema name.
    #[error("schema not found: {name}")]
    NotFound { name: String },
    /// A `$ref` points at a document or pointer that does not exist.
    #[error("cannot resolve $ref '{reference}' from {base}: {reason}")]
    Resolution {
        reference: String,
        base: String,
        reason: String,
    },
    /// A reference chain re-entered a key that was still being expanded.
    #[error("cyclic $ref detected: {}", chain.join(" -> "))]
    Cycle { chain: Vec<String> },
    #[error("schema cache error: {0}")]
    Cache(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SchemaError {
    pub(crate) fn resolution(
        reference: impl Into<String>,
        base: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        SchemaError::Resolution {
            reference: reference.into(),
            base: base.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type for schema operations.
pub type Result<T> = std::result::Result<T, SchemaError>;
