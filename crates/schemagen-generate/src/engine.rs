use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use schemagen_schema::{DocumentStore, EffectiveSchema, RefResolver};

use crate::context::{Clock, GenerationContext, RoundRobin};
use crate::dataset::DatasetSource;
use crate::errors::Result;
use crate::model::{GenerateOptions, SimulationReport};
use crate::resolvers::ResolverRegistry;
use crate::sink::{Envelope, RecordSink};
use crate::strategy::{StrategyEvaluator, random_uuid};
use crate::value::{GeneratedValue, format_timestamp};

/// Entry point for generating values from named schemas.
#[derive(Debug, Clone)]
pub struct SchemaGenerator {
    store: Arc<DocumentStore>,
    registry: ResolverRegistry,
    counters: Arc<RoundRobin>,
    options: GenerateOptions,
}

impl SchemaGenerator {
    pub fn new(
        store: Arc<DocumentStore>,
        datasets: Arc<dyn DatasetSource>,
        options: GenerateOptions,
    ) -> Self {
        let effective = EffectiveSchema::new(RefResolver::new(Arc::clone(&store)));
        let registry = ResolverRegistry::new(effective, StrategyEvaluator::new(datasets));
        Self {
            store,
            registry,
            counters: Arc::new(RoundRobin::new()),
            options,
        }
    }

    pub fn options(&self) -> &GenerateOptions {
        &self.options
    }

    pub fn registry(&self) -> &ResolverRegistry {
        &self.registry
    }

    /// A fresh context configured from the generator's options.
    ///
    /// Contexts made by one generator share its round-robin counters, so
    /// dataset cycling continues across runs.
    pub fn context(&self) -> GenerationContext {
        let ctx = match self.options.seed {
            Some(seed) => GenerationContext::with_seed(seed),
            None => GenerationContext::new(),
        };
        let clock = self
            .options
            .fixed_now
            .map(Clock::Fixed)
            .unwrap_or(Clock::System);
        ctx.with_counters(Arc::clone(&self.counters))
            .with_clock(clock)
            .with_locale(self.options.locale)
    }

    /// Generates one value for the schema named `name` in a fresh context.
    pub fn generate(&self, name: &str) -> Result<GeneratedValue> {
        let mut ctx = self.context();
        self.generate_with(name, &mut ctx)
    }

    pub fn generate_with(&self, name: &str, ctx: &mut GenerationContext) -> Result<GeneratedValue> {
        let loaded = self.store.load(name)?;
        debug!(schema = %name, base = %loaded.base, "generating value");
        self.registry.generate(&loaded.root, ctx, &loaded.base)
    }

    /// Generates `count` records sharing one context and hands each, wrapped
    /// in an [`Envelope`], to `sink`.
    pub fn simulate(
        &self,
        name: &str,
        count: u64,
        sink: &mut dyn RecordSink,
    ) -> Result<SimulationReport> {
        let start = Instant::now();
        let mut ctx = self.context();
        let job_id = random_uuid(&mut ctx);
        sink.begin(&job_id)?;
        info!(job_id = %job_id, schema = %name, count, "simulation started");

        for index in 0..count {
            ctx.clear_vars();
            let data = match self.generate_with(name, &mut ctx) {
                Ok(data) => data,
                Err(err) => {
                    warn!(job_id = %job_id, schema = %name, record = index, error = %err, "simulation failed");
                    return Err(err);
                }
            };
            let envelope = Envelope {
                kind: name.to_string(),
                id: random_uuid(&mut ctx),
                timestamp: format_timestamp(&ctx.now()),
                data,
            };
            sink.accept(&envelope)?;
        }
        sink.finish()?;

        let report = SimulationReport {
            job_id,
            schema: name.to_string(),
            records: count,
            duration_ms: start.elapsed().as_millis() as u64,
        };
        info!(
            job_id = %report.job_id,
            schema = %name,
            records = report.records,
            duration_ms = report.duration_ms,
            "simulation completed"
        );
        Ok(report)
    }
}
