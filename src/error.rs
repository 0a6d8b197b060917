// src/error.rs
use std::io;
use thiserror::Error;

// Re-export anyhow's Result type
pub use anyhow::Result;

/// Exit code for a failure anywhere in the binary
///
/// Errors that carry a [`WrapperError`] under added context keep its code.
pub fn exit_code_for(err: &anyhow::Error) -> u8 {
    err.downcast_ref::<WrapperError>()
        .map_or(1, WrapperError::exit_code)
}

/// Custom Error type for the promwrap library
#[derive(Error, Debug)]
pub enum WrapperError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Argument error: {0}")]
    Argument(String),

    #[error("Spawn error: {0}")]
    Spawn(String),

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("Metrics error: {0}")]
    Metrics(String),

    #[error("Other error: {0}")]
    Other(String),

    /// `--help` or `--version` was requested; the rendered text is the payload
    #[error("{0}")]
    Help(clap::Error),
}

impl WrapperError {
    /// Exit code the binary reports when it fails with this error
    pub fn exit_code(&self) -> u8 {
        match self {
            WrapperError::Help(_) => 0,
            WrapperError::Argument(_) => 2,
            _ => 1,
        }
    }
}

impl From<regex::Error> for WrapperError {
    fn from(err: regex::Error) -> Self {
        WrapperError::Config(format!("Invalid pattern: {}", err))
    }
}

impl From<prometheus::Error> for WrapperError {
    fn from(err: prometheus::Error) -> Self {
        match err {
            prometheus::Error::AlreadyReg => {
                WrapperError::Config("Duplicate counter name".to_string())
            }
            other => WrapperError::Metrics(other.to_string()),
        }
    }
}
