// src/server/process.rs
use crate::error::{Error, Result};
use async_process::{Command, Stdio};
use chrono::{DateTime, Utc};
use nix::errno::Errno;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid as NixPid;
use serde::Serialize;
use std::fmt;
use std::fs::File;
use std::os::unix::process::CommandExt;
use std::path::Path;
use std::process::ExitStatus;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Status of a server instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerStatus {
    /// Server has no live process
    Stopped,
    /// Server process is alive
    Running,
    /// A stop request is in flight
    Stopping,
}

impl fmt::Display for ServerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerStatus::Stopped => write!(f, "stopped"),
            ServerStatus::Running => write!(f, "running"),
            ServerStatus::Stopping => write!(f, "stopping"),
        }
    }
}

/// How a supervised process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessExit {
    /// The OS reported an exit status.
    Exited(ExitStatus),
    /// Waiting on the child failed; the process is gone but its status is unknown.
    Unknown,
}

/// Handle to a spawned server process.
///
/// The child itself is owned by a dedicated waiter thread that reaps it and
/// publishes the exit on a watch channel. The handle keeps the pid and the
/// receiving end of that channel, so any number of tasks can observe the exit
/// without contending for the child.
#[derive(Debug)]
pub struct ProcessHandle {
    pid: u32,
    started_at: DateTime<Utc>,
    exit: watch::Receiver<Option<ProcessExit>>,
}

impl ProcessHandle {
    /// Spawns `executable` inside `working_dir` with stdout and stderr both
    /// appended to a freshly truncated `log_path`.
    ///
    /// The process is placed in a new process group and [`terminate`](Self::terminate)
    /// and [`kill`](Self::kill) signal that whole group.
    pub(crate) fn spawn(executable: &Path, working_dir: &Path, log_path: &Path) -> Result<Arc<Self>> {
        let stdout_log = File::create(log_path)
            .map_err(|e| Error::io(format!("Failed to open log file {}", log_path.display()), e))?;
        let stderr_log = stdout_log
            .try_clone()
            .map_err(|e| Error::io("Failed to duplicate log file handle", e))?;

        // Own process group, so signals also reach anything a wrapper script forks.
        let mut command = std::process::Command::new(executable);
        command.current_dir(working_dir).process_group(0);

        let mut child = Command::from(command)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout_log))
            .stderr(Stdio::from(stderr_log))
            .spawn()
            .map_err(|e| Error::io(format!("Failed to start process {}", executable.display()), e))?;

        let pid = child.id();
        let (exit_tx, exit_rx) = watch::channel(None);

        // A plain thread keeps the reaper independent of whichever runtime
        // (HTTP worker or otherwise) happened to call start.
        std::thread::Builder::new()
            .name(format!("warden-wait-{}", pid))
            .spawn(move || {
                let exit = match futures_lite::future::block_on(child.status()) {
                    Ok(status) => ProcessExit::Exited(status),
                    Err(e) => {
                        tracing::warn!(pid, error = %e, "Failed to wait for server process");
                        ProcessExit::Unknown
                    }
                };
                tracing::debug!(pid, ?exit, "Server process exited");
                exit_tx.send_replace(Some(exit));
            })
            .map_err(|e| Error::io("Failed to spawn process waiter thread", e))?;

        Ok(Arc::new(Self {
            pid,
            started_at: Utc::now(),
            exit: exit_rx,
        }))
    }

    /// OS process id
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Wall-clock time the process was spawned
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Time elapsed since spawn
    pub fn uptime(&self) -> Duration {
        (Utc::now() - self.started_at).to_std().unwrap_or_default()
    }

    /// The exit published by the waiter thread, if the process has ended.
    pub fn exit_status(&self) -> Option<ProcessExit> {
        *self.exit.borrow()
    }

    /// Whether the process has been reaped.
    pub fn has_exited(&self) -> bool {
        self.exit.borrow().is_some()
    }

    /// Waits up to `timeout` for the process to exit. Returns `true` if it did.
    pub async fn wait_for_exit(&self, timeout: Duration) -> bool {
        let mut exit = self.exit.clone();
        match tokio::time::timeout(timeout, exit.wait_for(Option::is_some)).await {
            Ok(Ok(_)) => true,
            // Sender dropped: the waiter thread is gone, trust the last value.
            Ok(Err(_)) => self.has_exited(),
            Err(_) => false,
        }
    }

    /// Asks the process to shut down (SIGTERM).
    pub fn terminate(&self) -> Result<()> {
        self.send_signal(Signal::SIGTERM)
    }

    /// Forces the process down (SIGKILL).
    pub fn kill(&self) -> Result<()> {
        self.send_signal(Signal::SIGKILL)
    }

    fn send_signal(&self, sig: Signal) -> Result<()> {
        // Once reaped the pid may belong to someone else.
        if self.has_exited() {
            return Ok(());
        }

        let raw = i32::try_from(self.pid)
            .map_err(|_| Error::IoFailure(format!("pid {} out of range", self.pid)))?;

        // The child leads its own process group, whose id equals its pid.
        match signal::killpg(NixPid::from_raw(raw), sig) {
            Ok(()) | Err(Errno::ESRCH) => Ok(()),
            Err(errno) => Err(Error::IoFailure(format!(
                "Failed to send {} to process {}: {}",
                sig, self.pid, errno
            ))),
        }
    }
}
