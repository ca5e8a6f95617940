use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::locale::LocaleKey;

/// Options for [`crate::SchemaGenerator`].
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    /// Seed for the random source; entropy-seeded when absent.
    pub seed: Option<u64>,
    /// Locale used by the `faker` strategy.
    pub locale: LocaleKey,
    /// Pins the clock used by `now` and `date-time` values.
    pub fixed_now: Option<DateTime<Utc>>,
}

/// Summary of a batch simulation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationReport {
    pub job_id: String,
    pub schema: String,
    pub records: u64,
    pub duration_ms: u64,
}
