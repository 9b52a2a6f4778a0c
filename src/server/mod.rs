/// Server process management for Server Warden.
///
/// This module owns everything about live server processes: the registry of
/// running instances, starting and stopping them, sampling their resource
/// usage and tailing their console logs.
/// All public operations are instrumented with `tracing` spans.
///
/// # Components
///
/// * `registry` - Concurrency-safe table of live processes keyed by server id
/// * `lifecycle` - Start and stop, with SIGTERM to SIGKILL escalation
/// * `monitor` - CPU and memory sampling with stale entry cleanup
/// * `logs` - Bounded tail of an instance's console log
/// * `process` - The process handle and its exit observer
///
/// # Examples
///
/// Starting and stopping a server:
///
/// ```no_run
/// use server_warden::server::{lifecycle, Registry, StopTimeouts};
/// use std::path::Path;
///
/// # async fn run() -> server_warden::Result<()> {
/// let registry = Registry::new();
/// let started = lifecycle::start(
///     &registry,
///     "arena-01",
///     Path::new("/var/lib/warden/servers"),
///     "ragemp-server",
///     "console.log",
/// )
/// .await?;
/// println!("started pid {}", started.pid);
///
/// lifecycle::stop(&registry, "arena-01", StopTimeouts::default()).await?;
/// # Ok(())
/// # }
/// ```
pub mod lifecycle;
pub mod logs;
pub mod monitor;
mod process;
pub mod registry;

pub use lifecycle::{StartOutcome, StopOutcome, StopTimeouts};
pub use logs::DEFAULT_LOG_LINES;
pub use monitor::StatusReport;
pub use process::{ProcessExit, ProcessHandle, ServerStatus};
pub use registry::Registry;
