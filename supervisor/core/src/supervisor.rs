//! Process Supervisor
//!
//! Spawns the transport executable and keeps a watchdog on it.
//!
//! # Lifecycle
//!
//! ```text
//!   start() ──► ProcessHandle ──► watchdog task owns the Child
//!                                   │
//!              ┌────────────────────┴──────────────────┐
//!              │                                       │
//!        child exits                            stop() / handle dropped
//!              │                                       │
//!              │                         SIGTERM to process group
//!              │                         SIGKILL after grace period
//!              │                                       │
//!              └──────────► ProcessState::Exited ◄─────┘
//! ```
//!
//! # Orphan Prevention
//!
//! The transport must never outlive the supervising process:
//! - the child is killed when its `Child` is dropped (`kill_on_drop`)
//! - on Linux the child gets `SIGTERM` when its parent dies (`PR_SET_PDEATHSIG`)
//! - on Unix the child leads its own process group, so stopping it also
//!   reaches anything it forked

use std::io;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::process::{Child, Command};
use tokio::sync::{oneshot, watch};

use crate::invocation::Invocation;
use crate::transport::config::DEFAULT_STOP_GRACE_MS;
use crate::transport::TransportError;

/// Observed state of a supervised process
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProcessState {
    /// The process has not exited yet
    Running,
    /// The process exited and has been reaped
    Exited {
        /// Exit code, if the process exited normally
        code: Option<i32>,
    },
}

impl ProcessState {
    /// Whether the process is still running
    #[must_use]
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }

    fn from_wait(result: &io::Result<ExitStatus>) -> Self {
        match result {
            Ok(status) => Self::Exited {
                code: status.code(),
            },
            Err(_) => Self::Exited { code: None },
        }
    }
}

/// Kill switch plus exit notification for one child
///
/// No timeout: the process runs until it exits or is destroyed.
struct Watchdog {
    destroy_tx: Option<oneshot::Sender<()>>,
    state_rx: watch::Receiver<ProcessState>,
}

impl Watchdog {
    /// Ask the watchdog task to terminate the process
    ///
    /// Returns `false` if a destroy was already requested or the task is gone.
    fn destroy_process(&mut self) -> bool {
        self.destroy_tx
            .take()
            .is_some_and(|tx| tx.send(()).is_ok())
    }

    fn state(&self) -> ProcessState {
        *self.state_rx.borrow()
    }

    async fn wait_for_exit(&mut self) -> ProcessState {
        match self.state_rx.wait_for(|state| !state.is_running()).await {
            Ok(state) => *state,
            // Watchdog task ended without reporting; the Child was dropped and killed
            Err(_) => ProcessState::Exited { code: None },
        }
    }
}

/// One running transport process
pub struct ProcessHandle {
    program: PathBuf,
    pid: Option<u32>,
    watchdog: Watchdog,
}

impl ProcessHandle {
    /// Executable that was launched
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// OS process identifier
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Current process state
    pub fn state(&self) -> ProcessState {
        self.watchdog.state()
    }

    /// Whether the process is still running
    pub fn is_running(&self) -> bool {
        self.state().is_running()
    }

    /// Wait for the process to exit on its own
    pub async fn wait(&mut self) -> ProcessState {
        self.watchdog.wait_for_exit().await
    }

    /// Receiver that observes the process state, independent of this handle
    pub fn subscribe(&self) -> watch::Receiver<ProcessState> {
        self.watchdog.state_rx.clone()
    }
}

impl std::fmt::Debug for ProcessHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessHandle")
            .field("program", &self.program)
            .field("pid", &self.pid)
            .field("state", &self.state())
            .finish()
    }
}

/// Spawns and terminates transport processes
#[derive(Clone, Debug)]
pub struct ProcessSupervisor {
    stop_grace: Duration,
}

impl Default for ProcessSupervisor {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_STOP_GRACE_MS))
    }
}

impl ProcessSupervisor {
    /// Create a supervisor
    ///
    /// `stop_grace` is how long a stopping process gets between `SIGTERM`
    /// and `SIGKILL`.
    #[must_use]
    pub fn new(stop_grace: Duration) -> Self {
        Self { stop_grace }
    }

    /// Spawn the process described by `invocation`
    ///
    /// Stdout and stderr are inherited so the transport's own logs reach the
    /// operator. Stdin is null: the child leads a background process group,
    /// and reading a controlling terminal from there would stop it with
    /// `SIGTTIN`. Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::SpawnFailed` if the OS refuses to start the
    /// process.
    pub fn start(&self, invocation: &Invocation) -> Result<ProcessHandle, TransportError> {
        tracing::info!(cmd = %invocation, "About to run transport");

        let mut command = Command::new(invocation.program());
        command
            .args(invocation.args())
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        #[cfg(unix)]
        command.process_group(0);

        #[cfg(target_os = "linux")]
        // SAFETY: prctl is async-signal-safe and touches no parent state.
        // PDEATHSIG fires when the spawning thread exits, so spawns must
        // happen on long-lived runtime threads.
        unsafe {
            command.pre_exec(|| {
                if libc::prctl(libc::PR_SET_PDEATHSIG, libc::SIGTERM) == -1 {
                    return Err(io::Error::last_os_error());
                }
                Ok(())
            });
        }

        let child = command.spawn().map_err(|source| {
            tracing::error!(
                path = ?invocation.program(),
                error = %source,
                "Failed to spawn transport"
            );
            TransportError::SpawnFailed {
                path: invocation.program().to_path_buf(),
                source,
            }
        })?;

        let pid = child.id();
        let (destroy_tx, destroy_rx) = oneshot::channel();
        let (state_tx, state_rx) = watch::channel(ProcessState::Running);

        tokio::spawn(watch_child(child, destroy_rx, state_tx, self.stop_grace));

        tracing::info!(pid = ?pid, path = ?invocation.program(), "Transport process started");

        Ok(ProcessHandle {
            program: invocation.program().to_path_buf(),
            pid,
            watchdog: Watchdog {
                destroy_tx: Some(destroy_tx),
                state_rx,
            },
        })
    }

    /// Terminate the process and wait until it has been reaped
    ///
    /// Idempotent: stopping an exited or already-stopped handle returns
    /// immediately.
    pub async fn stop(&self, handle: &mut ProcessHandle) {
        if handle.watchdog.destroy_process() {
            tracing::info!(pid = ?handle.pid, "Destroying transport process");
        }

        let state = handle.watchdog.wait_for_exit().await;
        tracing::info!(pid = ?handle.pid, state = ?state, "Transport process stopped");
    }

    /// Whether the process behind `handle` is still running
    pub fn is_running(&self, handle: &ProcessHandle) -> bool {
        handle.is_running()
    }
}

/// Watchdog task: owns the child until it exits or is destroyed
async fn watch_child(
    mut child: Child,
    destroy_rx: oneshot::Receiver<()>,
    state_tx: watch::Sender<ProcessState>,
    grace: Duration,
) {
    let pid = child.id();

    // A dropped sender (handle dropped) counts as a destroy request
    let result = tokio::select! {
        status = child.wait() => {
            tracing::warn!(pid = ?pid, status = ?status, "Transport process exited");
            status
        }
        _ = destroy_rx => destroy(&mut child, grace).await,
    };

    state_tx.send_replace(ProcessState::from_wait(&result));
}

/// Terminate a child: SIGTERM to its group, SIGKILL after `grace`
async fn destroy(child: &mut Child, grace: Duration) -> io::Result<ExitStatus> {
    #[cfg(unix)]
    if let Some(pid) = child.id() {
        signal_group(pid, nix::sys::signal::Signal::SIGTERM);

        if let Ok(status) = tokio::time::timeout(grace, child.wait()).await {
            return status;
        }

        tracing::warn!(
            pid,
            grace_ms = u64::try_from(grace.as_millis()).unwrap_or(u64::MAX),
            "Transport ignored SIGTERM, killing"
        );
        signal_group(pid, nix::sys::signal::Signal::SIGKILL);
    }

    #[cfg(not(unix))]
    let _ = grace;

    child.kill().await?;
    child.wait().await
}

#[cfg(unix)]
fn signal_group(pid: u32, signal: nix::sys::signal::Signal) {
    use nix::sys::signal::killpg;
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(pid) else {
        return;
    };
    if let Err(e) = killpg(Pid::from_raw(raw), signal) {
        tracing::debug!(pid, signal = ?signal, error = %e, "Failed to signal process group");
    }
}
