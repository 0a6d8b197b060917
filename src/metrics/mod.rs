//! Counter registry backing the metrics endpoint
//!
//! Counters are created once at startup and handed out to the pattern
//! counters that increment them. The registry owns its own Prometheus
//! [`Registry`] rather than the process-wide default one.

mod server;

use std::collections::HashMap;
use std::sync::RwLock;

use log::debug;
use prometheus::{Encoder, IntCounter, Opts, Registry, TextEncoder};

use crate::error::WrapperError;

pub use server::{MetricsServer, normalize_addr};

/// A monotonically increasing counter that can be shared between threads
pub trait CounterHandle: Send + Sync + 'static {
    /// Add one to the counter
    fn increment(&self);

    /// Current value
    fn value(&self) -> u64;
}

impl CounterHandle for IntCounter {
    fn increment(&self) {
        self.inc();
    }

    fn value(&self) -> u64 {
        self.get()
    }
}

/// Registry of named counters
pub struct MetricsRegistry {
    registry: Registry,
    counters: RwLock<HashMap<String, IntCounter>>,
}

impl MetricsRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            registry: Registry::new(),
            counters: RwLock::new(HashMap::new()),
        }
    }

    /// Create and register a counter
    ///
    /// Fails if `name` is already registered or is not a valid metric name.
    pub fn counter(&self, name: &str, help: &str) -> Result<IntCounter, WrapperError> {
        let mut counters = self
            .counters
            .write()
            .map_err(|_| WrapperError::Other("Lock poisoned".to_string()))?;

        if counters.contains_key(name) {
            return Err(WrapperError::Config(format!("Duplicate counter name: {}", name)));
        }

        // Prometheus refuses an empty help string
        let help = if help.is_empty() { name } else { help };
        let counter = IntCounter::with_opts(Opts::new(name, help))
            .map_err(|e| WrapperError::Config(format!("Invalid counter '{}': {}", name, e)))?;
        self.registry.register(Box::new(counter.clone()))?;

        debug!("Registered counter {}", name);
        counters.insert(name.to_string(), counter.clone());

        Ok(counter)
    }

    /// Current value of a registered counter
    pub fn value(&self, name: &str) -> Option<u64> {
        let counters = self.counters.read().ok()?;
        counters.get(name).map(|c| c.get())
    }

    /// Number of registered counters
    pub fn len(&self) -> usize {
        self.counters.read().map_or(0, |c| c.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Render every registered metric in the Prometheus text format
    pub fn encode(&self) -> Result<String, WrapperError> {
        let families = self.registry.gather();
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&families, &mut buffer)
            .map_err(|e| WrapperError::Metrics(e.to_string()))?;

        String::from_utf8(buffer).map_err(|e| WrapperError::Metrics(e.to_string()))
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}
