use std::fmt;
use std::os::unix::process::ExitStatusExt;
use std::process::ExitStatus;

use nix::sys::signal::Signal;

/// How the child process terminated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationStatus {
    /// Exited normally with this code
    Exited(i32),
    /// Killed by this signal number
    Signaled(i32),
}

impl TerminationStatus {
    /// Exit code for the wrapper itself
    ///
    /// Normal exits pass the child's code through. Signal deaths use the shell
    /// convention of `128 + signal`.
    pub fn exit_code(&self) -> u8 {
        match *self {
            TerminationStatus::Exited(code) => u8::try_from(code).unwrap_or(u8::MAX),
            TerminationStatus::Signaled(signal) => {
                u8::try_from(128 + signal).unwrap_or(u8::MAX)
            }
        }
    }

    pub fn success(&self) -> bool {
        matches!(self, TerminationStatus::Exited(0))
    }
}

impl From<ExitStatus> for TerminationStatus {
    fn from(status: ExitStatus) -> Self {
        match (status.code(), status.signal()) {
            (Some(code), _) => TerminationStatus::Exited(code),
            (None, Some(signal)) => TerminationStatus::Signaled(signal),
            // Stopped/continued statuses are never returned by wait()
            (None, None) => TerminationStatus::Exited(-1),
        }
    }
}

impl fmt::Display for TerminationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            TerminationStatus::Exited(code) => write!(f, "exited with code {}", code),
            TerminationStatus::Signaled(signal) => match Signal::try_from(signal) {
                Ok(name) => write!(f, "killed by signal {} ({})", signal, name.as_str()),
                Err(_) => write!(f, "killed by signal {}", signal),
            },
        }
    }
}
