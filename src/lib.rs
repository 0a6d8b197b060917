//! Wrap a child process, relay its output and count pattern-matched lines
//!
//! The child's stdout and stderr are piped through [`process::classify`],
//! which copies every line to this process's own streams and increments the
//! counters of every pattern the line matches. Counters are exposed by
//! [`metrics::MetricsServer`]; signals are forwarded to the child and its
//! termination status becomes the wrapper's own.

pub mod cli;
pub mod config;
pub mod error;
pub mod metrics;
pub mod pattern;
pub mod process;
pub mod util;

pub use util::logging::init as init_logging;

/// Re-export of commonly used types for convenience
pub mod prelude {
    pub use crate::config::{CounterConfig, WrapperConfig, load_config};
    pub use crate::error::{Result, WrapperError};
    pub use crate::metrics::{CounterHandle, MetricsRegistry, MetricsServer};
    pub use crate::pattern::{CounterSets, LineMatcher, PatternCounter, PatternCounterSet};
    pub use crate::process::{Command, StreamKind, Supervisor, TerminationStatus};
}

/// Library version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
