use crate::server::process::ServerStatus;
use crate::server::registry::Registry;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sysinfo::{Pid, ProcessStatus, ProcessesToUpdate, System};

/// Point-in-time status and resource usage of one server
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    /// Server state
    pub status: ServerStatus,
    /// CPU utilization in percent (can exceed 100 on multi-core hosts)
    pub cpu_percent: f32,
    /// Resident memory in bytes
    pub memory_bytes: u64,
    /// OS process id while running
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    /// When the process was spawned
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    /// Seconds since spawn
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uptime_secs: Option<u64>,
}

impl StatusReport {
    /// Report for a server without a live process
    pub fn stopped() -> Self {
        Self {
            status: ServerStatus::Stopped,
            cpu_percent: 0.0,
            memory_bytes: 0,
            pid: None,
            started_at: None,
            uptime_secs: None,
        }
    }
}

/// Resource usage read from the OS process table
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcessUsage {
    pub cpu_percent: f32,
    pub memory_bytes: u64,
}

/// Samples the status of server `id`.
///
/// Never fails. An unknown id, or one whose process has disappeared, reports
/// [`ServerStatus::Stopped`]; in the latter case the stale registry entry is
/// dropped.
#[tracing::instrument(skip_all, fields(server_id = %id))]
pub async fn sample(registry: &Registry, id: &str) -> StatusReport {
    let Some((status, handle)) = registry.lookup(id) else {
        return StatusReport::stopped();
    };

    let usage = if handle.has_exited() {
        None
    } else {
        read_usage(handle.pid()).await
    };

    match usage {
        Some(usage) => StatusReport {
            status,
            cpu_percent: usage.cpu_percent,
            memory_bytes: usage.memory_bytes,
            pid: Some(handle.pid()),
            started_at: Some(handle.started_at()),
            uptime_secs: Some(handle.uptime().as_secs()),
        },
        None => {
            if registry.remove_if_same(id, &handle) {
                tracing::warn!(pid = handle.pid(), "Server process vanished, dropped stale entry");
            }
            StatusReport::stopped()
        }
    }
}

/// Reads CPU and resident memory for `pid`.
///
/// CPU usage is a rate, so the process is refreshed twice with
/// [`sysinfo::MINIMUM_CPU_UPDATE_INTERVAL`] in between. Returns `None` if the
/// process is missing, a zombie or dead at either refresh.
pub async fn read_usage(pid: u32) -> Option<ProcessUsage> {
    let pid = Pid::from_u32(pid);
    let mut system = System::new();

    system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
    if !is_alive(&system, pid) {
        return None;
    }

    tokio::time::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL).await;

    system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
    if !is_alive(&system, pid) {
        return None;
    }

    let process = system.process(pid)?;
    Some(ProcessUsage {
        cpu_percent: process.cpu_usage(),
        memory_bytes: process.memory(),
    })
}

fn is_alive(system: &System, pid: Pid) -> bool {
    system
        .process(pid)
        .map(|p| !matches!(p.status(), ProcessStatus::Zombie | ProcessStatus::Dead))
        .unwrap_or(false)
}
