//! Schema-driven synthetic value generation.
//!
//! A [`SchemaGenerator`] loads a named schema, reduces each node to its
//! effective form and dispatches on its `type`. Nodes may override
//! structural generation through the `x-source` keyword (see [`XSource`]).

pub mod context;
pub mod dataset;
pub mod engine;
pub mod errors;
pub mod expression;
pub mod faker;
pub mod locale;
pub mod model;
pub mod resolvers;
pub mod sink;
pub mod strategy;
pub mod value;

pub use context::{Clock, GenerationContext, RoundRobin};
pub use dataset::{CsvDatasets, DatasetSource, MemoryDatasets, Row};
pub use engine::SchemaGenerator;
pub use errors::{GenerationError, Result};
pub use expression::{Expression, ExpressionError};
pub use locale::LocaleKey;
pub use model::{GenerateOptions, SimulationReport};
pub use resolvers::{ResolverRegistry, TypeResolver};
pub use sink::{Envelope, MemorySink, NdjsonFileSink, RecordSink};
pub use strategy::{StrategyEvaluator, XSource, x_source_schema};
pub use value::{GeneratedValue, Record};
