use log::{debug, error, info};
use tokio::io::AsyncWrite;
use tokio::task::JoinHandle;

use super::command::Command;
use super::signal::SignalRelay;
use super::stream::classify;
use super::{ProcessResult, TerminationStatus};
use crate::pattern::CounterSets;

/// Owns the child process for its whole life
///
/// Starts the child with piped output, relays signals to it, runs one
/// classifier per output stream and waits for everything to finish.
pub struct Supervisor {
    command: Command,
    counters: CounterSets,
}

impl Supervisor {
    pub fn new(command: Command, counters: CounterSets) -> Self {
        Self { command, counters }
    }

    /// Run the child, relaying its output to this process's stdout and stderr
    pub async fn run(self) -> ProcessResult<TerminationStatus> {
        self.run_with(tokio::io::stdout(), tokio::io::stderr()).await
    }

    /// Run the child, relaying its output to the given sinks
    ///
    /// Returns once the child has exited and both of its pipes have reached
    /// end of stream. Signals are forwarded until the child is reaped. A relay
    /// failure on either stream kills the child and is returned as the error.
    pub async fn run_with<O, E>(self, stdout_sink: O, stderr_sink: E) -> ProcessResult<TerminationStatus>
    where
        O: AsyncWrite + Unpin + Send + 'static,
        E: AsyncWrite + Unpin + Send + 'static,
    {
        // Subscribe before spawning so no signal is missed in between
        let relay = SignalRelay::register()?;

        let mut handle = self.command.spawn()?;
        let pid = handle.pid()?;
        info!("Started {} with pid {}", handle.program(), pid);

        let relay = relay.start(pid);
        let stdout = handle.take_stdout()?;
        let stderr = handle.take_stderr()?;

        let CounterSets {
            stdout: stdout_counters,
            stderr: stderr_counters,
        } = self.counters;

        let stdout_task = tokio::spawn(async move {
            let mut sink = stdout_sink;
            classify(stdout, &mut sink, &stdout_counters).await
        });
        let stderr_task = tokio::spawn(async move {
            let mut sink = stderr_sink;
            classify(stderr, &mut sink, &stderr_counters).await
        });

        let drains = async {
            tokio::try_join!(join_classifier(stdout_task), join_classifier(stderr_task))
        };
        tokio::pin!(drains);

        // The child can exit while a descendant still holds its pipes, so
        // forwarding ends at the reap rather than at end of stream
        let first = tokio::select! {
            status = handle.wait() => Progress::Exited(status),
            lines = &mut drains => Progress::Drained(lines),
        };

        let outcome = match first {
            Progress::Exited(status) => {
                relay.child_exited();
                match status {
                    Ok(status) => {
                        debug!("Child {} reaped, draining its output", pid);
                        drains.await.map(|lines| (lines, status))
                    }
                    Err(e) => Err(e),
                }
            }
            Progress::Drained(Ok(lines)) => {
                let status = handle.wait().await;
                relay.child_exited();
                status.map(|status| (lines, status))
            }
            Progress::Drained(Err(e)) => Err(e),
        };

        let forwarded = relay.stop();
        debug!("Signal relay stopped after forwarding {} signal(s)", forwarded);

        match outcome {
            Ok(((stdout_lines, stderr_lines), status)) => {
                info!(
                    "Child {} after {} stdout and {} stderr line(s)",
                    status, stdout_lines, stderr_lines
                );
                Ok(status)
            }
            Err(e) => {
                error!("Relay failed, killing child {}: {}", pid, e);
                if let Err(kill_err) = handle.kill().await {
                    debug!("Killing child {}: {}", pid, kill_err);
                }
                Err(e)
            }
        }
    }
}

/// Whichever side of the supervision finished first
enum Progress {
    Exited(ProcessResult<TerminationStatus>),
    Drained(ProcessResult<(u64, u64)>),
}

async fn join_classifier(task: JoinHandle<ProcessResult<u64>>) -> ProcessResult<u64> {
    task.await?
}
