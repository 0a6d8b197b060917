//! Forwarding of the wrapper's signals to the child

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};

use log::{debug, trace, warn};
use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;
use signal_hook::consts::signal::*;
use signal_hook::iterator::{Handle, Signals};
use signal_hook::low_level::emulate_default_handler;

use super::error::{ProcessError, ProcessResult};

/// Signals relayed to the child
///
/// Uncatchable signals, synchronous fault signals, `SIGPIPE` (broken relay
/// pipes are reported as write errors instead) and `SIGCHLD` (needed by the
/// runtime to reap the child) are left alone.
pub const FORWARDED_SIGNALS: &[i32] = &[
    SIGHUP, SIGINT, SIGQUIT, SIGUSR1, SIGUSR2, SIGALRM, SIGTERM, SIGCONT, SIGTSTP, SIGTTIN,
    SIGTTOU, SIGURG, SIGXCPU, SIGXFSZ, SIGVTALRM, SIGPROF, SIGWINCH,
];

/// Send `signal` to `pid` unmodified
pub fn forward(pid: u32, signal: i32) -> nix::Result<()> {
    let signal = Signal::try_from(signal)?;
    let pid = i32::try_from(pid).map_err(|_| nix::errno::Errno::ESRCH)?;
    kill(Pid::from_raw(pid), signal)
}

/// Signal subscription taken out before the child is spawned
///
/// Signals arriving between registration and [`SignalRelay::start`] are
/// queued and forwarded once the child's pid is known.
pub struct SignalRelay {
    signals: Signals,
}

impl SignalRelay {
    /// Subscribe to every forwarded signal
    pub fn register() -> ProcessResult<Self> {
        let signals = Signals::new(FORWARDED_SIGNALS).map_err(ProcessError::SignalSetup)?;
        Ok(Self { signals })
    }

    /// Start relaying to `pid` on a dedicated thread
    pub fn start(self, pid: u32) -> RelayHandle {
        let handle = self.signals.handle();
        let mut signals = self.signals;
        let state = Arc::new(RelayState::default());
        let shared = Arc::clone(&state);

        let thread = thread::Builder::new()
            .name("promwrap-signals".to_string())
            .spawn(move || {
                for signal in signals.forever() {
                    if shared.child_exited.load(Ordering::SeqCst) {
                        // Nobody left to receive it: act as if the relay was never installed
                        shared.defaulted.fetch_add(1, Ordering::SeqCst);
                        debug!("Child {} has exited, applying default action for signal {}", pid, signal);
                        if let Err(e) = emulate_default_handler(signal) {
                            warn!("Could not apply default action for signal {}: {}", signal, e);
                        }
                        continue;
                    }

                    match forward(pid, signal) {
                        Ok(()) => {
                            debug!("Forwarded signal {} to child {}", signal, pid);
                            shared.forwarded.fetch_add(1, Ordering::SeqCst);
                        }
                        // Usually the child has already exited
                        Err(e) => trace!("Dropped signal {} for child {}: {}", signal, pid, e),
                    }
                }
            });

        let thread = match thread {
            Ok(thread) => Some(thread),
            Err(e) => {
                warn!("Could not start signal relay thread: {}", e);
                None
            }
        };

        RelayHandle {
            handle,
            thread,
            state,
        }
    }
}

#[derive(Debug, Default)]
struct RelayState {
    child_exited: AtomicBool,
    forwarded: AtomicU64,
    defaulted: AtomicU64,
}

/// A running signal relay
pub struct RelayHandle {
    handle: Handle,
    thread: Option<JoinHandle<()>>,
    state: Arc<RelayState>,
}

impl RelayHandle {
    /// Stop forwarding because the child has been reaped
    ///
    /// Signals received from now on get their default action in the wrapper,
    /// so a SIGTERM still terminates it while the output pipes drain.
    pub fn child_exited(&self) {
        self.state.child_exited.store(true, Ordering::SeqCst);
    }

    /// Number of signals delivered to the child so far
    pub fn forwarded(&self) -> u64 {
        self.state.forwarded.load(Ordering::SeqCst)
    }

    /// Number of signals handled with their default action after the child exited
    pub fn defaulted(&self) -> u64 {
        self.state.defaulted.load(Ordering::SeqCst)
    }

    /// Stop relaying and return how many signals were forwarded
    pub fn stop(mut self) -> u64 {
        self.child_exited();
        self.handle.close();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
        self.forwarded()
    }
}

impl Drop for RelayHandle {
    fn drop(&mut self) {
        self.handle.close();
    }
}
