use std::process::Stdio;

use log::debug;
use tokio::process::{Child, ChildStderr, ChildStdout, Command as TokioCommand};

use super::{ProcessError, ProcessResult, StreamKind, TerminationStatus};
use crate::error::WrapperError;

/// The child command line
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    /// Program to execute, resolved on `PATH` unless it contains a slash
    program: String,

    /// Arguments to pass to the program
    args: Vec<String>,
}

impl Command {
    /// Create a new command
    pub fn new<S: Into<String>>(program: S) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Build a command from a full argv, program first
    pub fn from_argv<I, S>(argv: I) -> Result<Self, WrapperError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut argv = argv.into_iter().map(Into::into);
        let program = argv
            .next()
            .ok_or_else(|| WrapperError::Argument("No child command specified".to_string()))?;

        Ok(Self::new(program).args(argv))
    }

    /// Add an argument
    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add multiple arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for arg in args {
            self.args.push(arg.into());
        }
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    /// Start the command with stdout and stderr piped and stdin inherited
    pub fn spawn(&self) -> ProcessResult<ProcessHandle> {
        debug!("Spawning command: {} {:?}", self.program, self.args);

        let child = TokioCommand::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ProcessError::SpawnError(self.program.clone(), e))?;

        Ok(ProcessHandle {
            child,
            program: self.program.clone(),
        })
    }
}

/// Handle to a running child process
pub struct ProcessHandle {
    /// Child process
    child: Child,

    /// Program name
    program: String,
}

impl ProcessHandle {
    /// Process id, available until the child has been waited on
    pub fn pid(&self) -> ProcessResult<u32> {
        self.child.id().ok_or(ProcessError::MissingPid)
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Take ownership of the stdout pipe
    pub fn take_stdout(&mut self) -> ProcessResult<ChildStdout> {
        self.child
            .stdout
            .take()
            .ok_or(ProcessError::MissingPipe(StreamKind::Stdout))
    }

    /// Take ownership of the stderr pipe
    pub fn take_stderr(&mut self) -> ProcessResult<ChildStderr> {
        self.child
            .stderr
            .take()
            .ok_or(ProcessError::MissingPipe(StreamKind::Stderr))
    }

    /// Wait for the process to exit
    pub async fn wait(&mut self) -> ProcessResult<TerminationStatus> {
        let status = self.child.wait().await.map_err(ProcessError::WaitError)?;
        Ok(status.into())
    }

    /// Kill the process and reap it
    pub async fn kill(&mut self) -> ProcessResult<()> {
        self.child.kill().await.map_err(ProcessError::WaitError)
    }
}
