//! Line classification against configured patterns

use std::fmt;
use std::sync::Arc;

use log::debug;
use regex::Regex;

use crate::config::{CounterConfig, WrapperConfig};
use crate::error::WrapperError;
use crate::metrics::{CounterHandle, MetricsRegistry};
use crate::process::StreamKind;

/// Anything that can decide whether a line matches
pub trait LineMatcher: Send + Sync + 'static {
    fn matches(&self, line: &str) -> bool;
}

impl LineMatcher for Regex {
    fn matches(&self, line: &str) -> bool {
        self.is_match(line)
    }
}

/// A compiled pattern paired with the counter it drives
///
/// Clones share the same matcher and the same counter.
#[derive(Clone)]
pub struct PatternCounter {
    name: String,
    matcher: Arc<dyn LineMatcher>,
    counter: Arc<dyn CounterHandle>,
}

impl PatternCounter {
    pub fn new<M, C>(name: impl Into<String>, matcher: M, counter: C) -> Self
    where
        M: LineMatcher,
        C: CounterHandle,
    {
        Self {
            name: name.into(),
            matcher: Arc::new(matcher),
            counter: Arc::new(counter),
        }
    }

    /// Compile the pattern and register the counter for one declaration
    pub fn from_config(
        config: &CounterConfig,
        registry: &MetricsRegistry,
    ) -> Result<Self, WrapperError> {
        let regex = Regex::new(&config.regex).map_err(|e| {
            WrapperError::Config(format!("Invalid pattern for counter '{}': {}", config.name, e))
        })?;
        let counter = registry.counter(&config.name, &config.help)?;

        Ok(Self::new(config.name.clone(), regex, counter))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Increment the counter if `line` matches; returns whether it did
    pub fn observe(&self, line: &str) -> bool {
        if self.matcher.matches(line) {
            self.counter.increment();
            true
        } else {
            false
        }
    }

    pub fn value(&self) -> u64 {
        self.counter.value()
    }
}

impl fmt::Debug for PatternCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PatternCounter")
            .field("name", &self.name)
            .field("value", &self.value())
            .finish()
    }
}

/// Ordered pattern counters applied to one stream
#[derive(Debug, Clone)]
pub struct PatternCounterSet {
    kind: StreamKind,
    counters: Vec<PatternCounter>,
}

impl PatternCounterSet {
    pub fn new(kind: StreamKind) -> Self {
        Self {
            kind,
            counters: Vec::new(),
        }
    }

    pub fn kind(&self) -> StreamKind {
        self.kind
    }

    pub fn push(&mut self, counter: PatternCounter) {
        self.counters.push(counter);
    }

    pub fn extend<I: IntoIterator<Item = PatternCounter>>(&mut self, counters: I) {
        self.counters.extend(counters);
    }

    pub fn len(&self) -> usize {
        self.counters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PatternCounter> {
        self.counters.iter()
    }

    /// Test `line` against every counter in order, without stopping at the
    /// first match. Returns the number of counters incremented.
    pub fn classify(&self, line: &str) -> usize {
        self.counters.iter().filter(|c| c.observe(line)).count()
    }
}

/// The effective counter sets for both output streams
#[derive(Debug, Clone)]
pub struct CounterSets {
    pub stdout: PatternCounterSet,
    pub stderr: PatternCounterSet,
}

impl CounterSets {
    /// Compile every declaration and register its counter
    ///
    /// Stream-specific entries come first, followed by the shared `both`
    /// entries, which are registered once and appear in both sets.
    pub fn build(config: &WrapperConfig, registry: &MetricsRegistry) -> Result<Self, WrapperError> {
        let compile = |configs: &[CounterConfig]| {
            configs
                .iter()
                .map(|c| PatternCounter::from_config(c, registry))
                .collect::<Result<Vec<_>, _>>()
        };

        let stdout_only = compile(config.stdout.as_slice())?;
        let stderr_only = compile(config.stderr.as_slice())?;
        let shared = compile(config.both.as_slice())?;

        let mut stdout = PatternCounterSet::new(StreamKind::Stdout);
        stdout.extend(stdout_only);
        stdout.extend(shared.iter().cloned());

        let mut stderr = PatternCounterSet::new(StreamKind::Stderr);
        stderr.extend(stderr_only);
        stderr.extend(shared);

        debug!(
            "Built {} stdout and {} stderr pattern counter(s)",
            stdout.len(),
            stderr.len()
        );

        Ok(Self { stdout, stderr })
    }
}
