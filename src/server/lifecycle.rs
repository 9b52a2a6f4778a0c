use crate::error::{Error, Result};
use crate::server::process::ProcessHandle;
use crate::server::registry::Registry;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;
use std::time::Duration;

/// Result of a successful start
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartOutcome {
    /// OS process id of the new server
    pub pid: u32,
    /// When the process was spawned
    pub started_at: DateTime<Utc>,
}

/// Result of a successful stop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StopOutcome {
    /// `true` if the process ignored SIGTERM and had to be killed
    pub forced: bool,
}

/// Termination windows used by [`stop`].
#[derive(Debug, Clone, Copy)]
pub struct StopTimeouts {
    /// How long to wait after SIGTERM
    pub graceful: Duration,
    /// How long to wait after SIGKILL
    pub kill: Duration,
}

impl Default for StopTimeouts {
    fn default() -> Self {
        Self {
            graceful: Duration::from_secs(10),
            kill: Duration::from_secs(5),
        }
    }
}

/// Starts the server `id` from `base_path/id/executable_name`.
///
/// The console log at `base_path/id/log_file_name` is truncated and receives
/// both stdout and stderr of the new process.
///
/// # Errors
///
/// * [`Error::NotFound`] if the instance directory or executable is missing
/// * [`Error::Conflict`] if the id is already running or otherwise reserved
/// * [`Error::IoFailure`] if the log file cannot be opened or the spawn fails
#[tracing::instrument(skip_all, fields(server_id = %id))]
pub async fn start(
    registry: &Registry,
    id: &str,
    base_path: &Path,
    executable_name: &str,
    log_file_name: &str,
) -> Result<StartOutcome> {
    let server_dir = base_path.join(id);
    let executable = server_dir.join(executable_name);

    if !tokio::fs::metadata(&server_dir)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false)
    {
        tracing::warn!(path = %server_dir.display(), "Server directory not found");
        return Err(Error::NotFound(format!(
            "Server directory not found: {}",
            server_dir.display()
        )));
    }
    if !tokio::fs::metadata(&executable)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
    {
        tracing::warn!(path = %executable.display(), "Server executable not found");
        return Err(Error::NotFound(format!(
            "Server executable not found: {}",
            executable.display()
        )));
    }

    if !registry.claim(id) {
        tracing::debug!("Server already running or busy");
        return Err(Error::Conflict(format!("Server '{}' is already running", id)));
    }

    let handle = match ProcessHandle::spawn(&executable, &server_dir, &server_dir.join(log_file_name)) {
        Ok(handle) => handle,
        Err(e) => {
            registry.release(id);
            tracing::error!(error = %e, "Failed to start server process");
            return Err(e);
        }
    };

    let outcome = StartOutcome {
        pid: handle.pid(),
        started_at: handle.started_at(),
    };

    if !registry.attach(id, handle.clone()) {
        // The reservation vanished under us, which only a bug elsewhere can cause.
        if let Err(e) = handle.kill() {
            tracing::warn!(pid = outcome.pid, error = %e, "Failed to kill orphaned server process");
        }
        return Err(Error::Conflict(format!(
            "Reservation for server '{}' was lost during start",
            id
        )));
    }

    tracing::info!(pid = outcome.pid, "Server started");
    Ok(outcome)
}

/// Stops the server `id`.
///
/// Sends SIGTERM and waits up to `timeouts.graceful`; if the process is still
/// alive it is sent SIGKILL and given up to `timeouts.kill`. The registry
/// entry is removed once the exit has been observed.
///
/// # Errors
///
/// * [`Error::NotRunning`] if `id` has no live process (or a stop is already in flight)
/// * [`Error::Timeout`] if the process outlives the forced kill window
/// * [`Error::IoFailure`] if a signal cannot be delivered
#[tracing::instrument(skip_all, fields(server_id = %id))]
pub async fn stop(registry: &Registry, id: &str, timeouts: StopTimeouts) -> Result<StopOutcome> {
    let handle = registry.begin_stop(id).ok_or_else(|| {
        tracing::debug!("No live process to stop");
        Error::NotRunning(id.to_string())
    })?;
    let pid = handle.pid();

    tracing::info!(pid, "Sending SIGTERM");
    if let Err(e) = handle.terminate() {
        registry.abort_stop(id, &handle);
        tracing::error!(pid, error = %e, "Failed to request graceful shutdown");
        return Err(e);
    }

    if handle.wait_for_exit(timeouts.graceful).await {
        registry.remove_if_same(id, &handle);
        tracing::info!(pid, "Server stopped");
        return Ok(StopOutcome { forced: false });
    }

    tracing::warn!(
        pid,
        timeout_secs = timeouts.graceful.as_secs_f64(),
        "Server ignored SIGTERM, sending SIGKILL"
    );
    if let Err(e) = handle.kill() {
        registry.abort_stop(id, &handle);
        tracing::error!(pid, error = %e, "Failed to force kill server");
        return Err(e);
    }

    if handle.wait_for_exit(timeouts.kill).await {
        registry.remove_if_same(id, &handle);
        tracing::info!(pid, "Server killed");
        return Ok(StopOutcome { forced: true });
    }

    registry.abort_stop(id, &handle);
    tracing::error!(pid, "Server survived SIGKILL");
    Err(Error::Timeout(format!(
        "Server '{}' (pid {}) did not exit after SIGKILL",
        id, pid
    )))
}
