use std::io;
use thiserror::Error;

use super::StreamKind;
use crate::error::WrapperError;

/// Result type for process operations
pub type ProcessResult<T> = std::result::Result<T, ProcessError>;

/// Errors that can occur while supervising the child process
#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("Failed to spawn {0}: {1}")]
    SpawnError(String, io::Error),

    #[error("Child {0} pipe was not captured")]
    MissingPipe(StreamKind),

    #[error("Child exited before its pid could be read")]
    MissingPid,

    #[error("Failed to read child {0}: {1}")]
    ReadError(StreamKind, io::Error),

    #[error("Failed to relay child {0}: {1}")]
    WriteError(StreamKind, io::Error),

    #[error("Failed to wait for child: {0}")]
    WaitError(io::Error),

    #[error("Failed to install signal handlers: {0}")]
    SignalSetup(io::Error),

    #[error("Classifier task failed: {0}")]
    JoinError(String),
}

impl From<tokio::task::JoinError> for ProcessError {
    fn from(err: tokio::task::JoinError) -> Self {
        ProcessError::JoinError(err.to_string())
    }
}

impl From<ProcessError> for WrapperError {
    fn from(err: ProcessError) -> Self {
        match err {
            ProcessError::SpawnError(..)
            | ProcessError::MissingPipe(_)
            | ProcessError::MissingPid
            | ProcessError::SignalSetup(_) => WrapperError::Spawn(err.to_string()),
            ProcessError::ReadError(..)
            | ProcessError::WriteError(..)
            | ProcessError::JoinError(_) => WrapperError::Stream(err.to_string()),
            ProcessError::WaitError(_) => WrapperError::Other(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_startup_failures_map_to_spawn_errors() {
        let err = ProcessError::SpawnError(
            "missing".to_string(),
            io::Error::new(io::ErrorKind::NotFound, "not found"),
        );
        let err: WrapperError = err.into();
        assert!(matches!(err, WrapperError::Spawn(_)));
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn test_relay_failures_map_to_stream_errors() {
        let err = ProcessError::ReadError(StreamKind::Stderr, io::Error::other("boom"));
        assert_eq!(err.to_string(), "Failed to read child stderr: boom");
        let err: WrapperError = err.into();
        assert!(matches!(err, WrapperError::Stream(_)));
    }
}
