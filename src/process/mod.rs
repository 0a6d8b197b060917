//! Supervision of the wrapped child process
//!
//! This module spawns the child with its output piped, relays each output
//! stream line by line while counting pattern matches, forwards signals to
//! the child and reports how it terminated.

mod command;
mod error;
mod signal;
mod status;
mod stream;
mod supervisor;

pub use command::{Command, ProcessHandle};
pub use error::{ProcessError, ProcessResult};
pub use signal::{FORWARDED_SIGNALS, RelayHandle, SignalRelay, forward};
pub use status::TerminationStatus;
pub use stream::{LineStream, StreamKind, classify};
pub use supervisor::Supervisor;
