use config::{self, File, FileFormat};
use log::{debug, error};
use serde::Deserialize;
use std::path::Path;

use crate::error::WrapperError;

/// A single counter declaration
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct CounterConfig {
    /// Metric name, unique across all groups
    #[serde(rename = "counterName", alias = "countername", alias = "name")]
    pub name: String,
    /// Help text exposed alongside the metric
    #[serde(default)]
    pub help: String,
    /// Pattern tested against every line of the stream
    pub regex: String,
}

impl CounterConfig {
    pub fn new(name: impl Into<String>, help: impl Into<String>, regex: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            help: help.into(),
            regex: regex.into(),
        }
    }
}

/// Wrapper configuration: one group of counters per stream, plus a shared group
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct WrapperConfig {
    /// Counters evaluated against both stdout and stderr
    #[serde(default)]
    pub both: Vec<CounterConfig>,
    /// Counters evaluated against stdout only
    #[serde(default)]
    pub stdout: Vec<CounterConfig>,
    /// Counters evaluated against stderr only
    #[serde(default)]
    pub stderr: Vec<CounterConfig>,
}

impl WrapperConfig {
    /// Total number of declared counters
    pub fn counter_count(&self) -> usize {
        self.both.len() + self.stdout.len() + self.stderr.len()
    }

    /// Parse configuration held in memory
    pub fn from_content(content: &str, format: FileFormat) -> Result<Self, WrapperError> {
        let config = config::Config::builder()
            .add_source(File::from_str(content, format))
            .build()
            .map_err(|e| WrapperError::Config(e.to_string()))?;

        config
            .try_deserialize()
            .map_err(|e| WrapperError::Config(e.to_string()))
    }
}

/// Logging level
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Error level
    Error,
    /// Warning level
    Warn,
    /// Info level
    Info,
    /// Debug level
    Debug,
    /// Trace level
    Trace,
}

impl Default for LogLevel {
    fn default() -> Self {
        LogLevel::Warn
    }
}

/// Pick a file format from the extension of `path`
fn format_for(path: &Path) -> Result<FileFormat, WrapperError> {
    let extension = match path.extension() {
        Some(ext) => ext.to_string_lossy().to_lowercase(),
        None => {
            error!("Configuration file has no extension");
            return Err(WrapperError::Config(format!(
                "Configuration file has no extension: {}",
                path.display()
            )));
        }
    };

    match extension.as_str() {
        "toml" => Ok(FileFormat::Toml),
        "json" => Ok(FileFormat::Json),
        "yaml" | "yml" => Ok(FileFormat::Yaml),
        format => {
            error!("Unsupported configuration format: {}", format);
            Err(WrapperError::Config(format!("Unsupported config format: {}", format)))
        }
    }
}

/// Load wrapper configuration from a file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<WrapperConfig, WrapperError> {
    let path = path.as_ref();
    debug!("Loading configuration from {}", path.display());

    if !path.exists() {
        error!("Configuration file {} does not exist", path.display());
        return Err(WrapperError::Config(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let format = format_for(path)?;

    let config = config::Config::builder()
        .add_source(File::from(path).format(format))
        .build()
        .map_err(|e| WrapperError::Config(format!("Reading {}: {}", path.display(), e)))?;

    let config: WrapperConfig = config
        .try_deserialize()
        .map_err(|e| WrapperError::Config(format!("Parsing {}: {}", path.display(), e)))?;

    debug!(
        "Loaded {} counter(s) from {}",
        config.counter_count(),
        path.display()
    );

    Ok(config)
}
