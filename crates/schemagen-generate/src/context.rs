use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use schemagen_schema::ResolutionStack;

use crate::locale::LocaleKey;
use crate::value::{GeneratedValue, Record};

/// Named, monotonically increasing counters used for round-robin selection.
///
/// Counters are shared across every context holding the same registry;
/// increments are atomic so concurrent runs never lose an update.
#[derive(Debug, Default)]
pub struct RoundRobin {
    counters: RwLock<HashMap<String, Arc<AtomicU64>>>,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current value of the counter named `key` and advances it.
    pub fn next(&self, key: &str) -> u64 {
        let existing = self
            .counters
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned();
        let counter = match existing {
            Some(counter) => counter,
            None => {
                let mut counters = self.counters.write().unwrap_or_else(PoisonError::into_inner);
                Arc::clone(counters.entry(key.to_string()).or_default())
            }
        };
        counter.fetch_add(1, Ordering::SeqCst)
    }
}

/// Source of the current instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Clock {
    #[default]
    System,
    Fixed(DateTime<Utc>),
}

impl Clock {
    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Clock::System => Utc::now(),
            Clock::Fixed(instant) => *instant,
        }
    }
}

/// Per-run mutable generation state.
///
/// A context is owned by a single run: variables bound by earlier fields, the
/// random source, the clock, and the trail of references being expanded.
#[derive(Debug)]
pub struct GenerationContext {
    vars: Record,
    counters: Arc<RoundRobin>,
    rng: ChaCha8Rng,
    clock: Clock,
    locale: LocaleKey,
    trail: ResolutionStack,
}

impl Default for GenerationContext {
    fn default() -> Self {
        Self::new()
    }
}

impl GenerationContext {
    /// Context with an entropy-seeded random source.
    pub fn new() -> Self {
        Self::with_seed(rand::random())
    }

    /// Context whose random draws are reproducible for `seed`.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            vars: Record::new(),
            counters: Arc::new(RoundRobin::new()),
            rng: ChaCha8Rng::seed_from_u64(seed),
            clock: Clock::System,
            locale: LocaleKey::default(),
            trail: ResolutionStack::new(),
        }
    }

    pub fn with_counters(mut self, counters: Arc<RoundRobin>) -> Self {
        self.counters = counters;
        self
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_locale(mut self, locale: LocaleKey) -> Self {
        self.locale = locale;
        self
    }

    pub fn set_var(&mut self, name: impl Into<String>, value: GeneratedValue) {
        self.vars.insert(name.into(), value);
    }

    pub fn var(&self, name: &str) -> Option<&GeneratedValue> {
        self.vars.get(name)
    }

    pub fn vars(&self) -> &Record {
        &self.vars
    }

    pub fn clear_vars(&mut self) {
        self.vars.clear();
    }

    /// Next round-robin index for `key`, starting at zero.
    pub fn next_index(&self, key: &str) -> u64 {
        self.counters.next(key)
    }

    pub fn counters(&self) -> &Arc<RoundRobin> {
        &self.counters
    }

    pub fn rng(&mut self) -> &mut ChaCha8Rng {
        &mut self.rng
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn locale(&self) -> LocaleKey {
        self.locale
    }

    pub(crate) fn trail(&mut self) -> &mut ResolutionStack {
        &mut self.trail
    }
}
