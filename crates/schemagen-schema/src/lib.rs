//! JSON Schema loading, `$ref` resolution and compilation.
//!
//! Documents are addressed by logical name through a [`DocumentStore`]. The
//! [`SchemaInliner`] produces reference-free trees for export, while
//! [`EffectiveSchema`] computes the single type-bearing form of one node on
//! demand during generation.

pub mod effective;
pub mod errors;
pub mod export;
pub mod inliner;
pub mod keywords;
pub mod merge;
pub mod reference;
pub mod store;

pub use effective::{
    Effective, EffectiveSchema, SchemaType, declared_type, ensure_type, ensure_types_deep,
    infer_type,
};
pub use errors::{Result, SchemaError};
pub use export::EffectiveSchemaExporter;
pub use inliner::SchemaInliner;
pub use reference::{RefKey, RefResolver, Resolved, ResolutionStack};
pub use store::{DirectorySource, DocumentSource, DocumentStore, LoadedSchema, MemorySource};
