/*!
 # Server Warden

 A Rust library and daemon for supervising game-server processes on a single host.

 ## Overview

 Server Warden provides functionality to:
 - Start and stop server processes, escalating from SIGTERM to SIGKILL
 - Report live CPU and memory usage per server
 - Tail each server's console log without loading it whole
 - Provision new servers from zip template archives
 - Rewrite a server's configuration file atomically
 - Expose all of the above over a small JSON HTTP API

 ## Basic Usage

 ```no_run
 use server_warden::{Supervisor, Result, config::DaemonConfig};
 use serde_json::json;

 #[tokio::main]
 async fn main() -> Result<()> {
     let supervisor = Supervisor::new(DaemonConfig::from_env()?);

     // Provision a server from the default template and start it
     supervisor.create_server("arena-01", None).await?;
     supervisor.update_server_config("arena-01", &json!({ "maxplayers": 50 })).await?;
     let started = supervisor.start_server("arena-01").await?;
     println!("Started with pid {}", started.pid);

     // Inspect it
     let status = supervisor.server_status("arena-01").await;
     println!("CPU {:.1}%, {} bytes", status.cpu_percent, status.memory_bytes);
     println!("{}", supervisor.server_logs("arena-01", Some(20)).await?);

     // Tear it down
     supervisor.delete_server("arena-01").await?;
     Ok(())
 }
 ```

 ## Features

 - **Atomic claims**: two concurrent starts of one server yield exactly one success
 - **Bounded stop**: graceful shutdown window followed by a forced kill
 - **Self-healing status**: crashed processes are noticed and dropped on the next query
 - **Crash-safe writes**: provisioning and config updates publish with a single rename
 - **Tracing**: every operation runs in a `tracing` span keyed by server id

 ## License

 This project is licensed under the terms in the LICENSE file.
*/

pub mod api;
pub mod config;
pub mod error;
pub mod instance;
pub mod server;

pub use config::DaemonConfig;
pub use error::{Error, ErrorKind, Result};
pub use instance::CreateOutcome;
pub use server::{
    DEFAULT_LOG_LINES, Registry, ServerStatus, StartOutcome, StatusReport, StopOutcome,
    StopTimeouts,
};

use serde::Serialize;
use serde_json::{Map, Value};

/// Status of one server as returned by [`Supervisor::all_statuses`].
#[derive(Debug, Clone, Serialize)]
pub struct ServerSummary {
    /// Server id
    pub id: String,
    /// Current status
    #[serde(flatten)]
    pub report: StatusReport,
}

/// Supervises the servers configured by one [`DaemonConfig`].
///
/// This struct is the main entry point. It owns the process [`Registry`] and
/// applies the configured paths and timeouts to every operation, so callers
/// only pass a server id and payload. It is `Send + Sync` and meant to be
/// shared behind an `Arc`.
/// Every operation it delegates to runs in its own `tracing` span.
#[derive(Debug)]
pub struct Supervisor {
    /// Configuration
    config: DaemonConfig,
    /// Live processes
    registry: Registry,
}

impl Supervisor {
    /// Create a new supervisor with an empty registry
    #[tracing::instrument(skip(config), fields(servers_path = %config.servers_path.display()))]
    pub fn new(config: DaemonConfig) -> Self {
        tracing::info!("Creating new Supervisor");
        Self {
            config,
            registry: Registry::new(),
        }
    }

    /// Configuration in use
    pub fn config(&self) -> &DaemonConfig {
        &self.config
    }

    /// The live process registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Stop windows derived from the configuration
    pub fn stop_timeouts(&self) -> StopTimeouts {
        StopTimeouts {
            graceful: self.config.stop_timeout(),
            kill: self.config.kill_timeout(),
        }
    }

    /// Start server `id`. See [`server::lifecycle::start`].
    pub async fn start_server(&self, id: &str) -> Result<StartOutcome> {
        server::lifecycle::start(
            &self.registry,
            id,
            &self.config.servers_path,
            &self.config.executable_name,
            &self.config.log_file_name,
        )
        .await
    }

    /// Stop server `id`. See [`server::lifecycle::stop`].
    pub async fn stop_server(&self, id: &str) -> Result<StopOutcome> {
        server::lifecycle::stop(&self.registry, id, self.stop_timeouts()).await
    }

    /// Status and resource usage of server `id`. Never fails.
    pub async fn server_status(&self, id: &str) -> StatusReport {
        server::monitor::sample(&self.registry, id).await
    }

    /// Status of every server with a registry entry, sorted by id.
    pub async fn all_statuses(&self) -> Vec<ServerSummary> {
        let ids = self.registry.ids();
        let reports = futures::future::join_all(ids.iter().map(|id| self.server_status(id))).await;

        ids.into_iter()
            .zip(reports)
            .map(|(id, report)| ServerSummary { id, report })
            .collect()
    }

    /// Last `lines` lines (default [`DEFAULT_LOG_LINES`]) of server `id`'s console log.
    pub async fn server_logs(&self, id: &str, lines: Option<usize>) -> Result<String> {
        server::logs::read_tail(
            id,
            &self.config.servers_path,
            &self.config.log_file_name,
            lines.unwrap_or(DEFAULT_LOG_LINES),
        )
        .await
    }

    /// Provision server `id` from `template` (or the configured default template).
    pub async fn create_server(&self, id: &str, template: Option<&str>) -> Result<CreateOutcome> {
        instance::create(
            &self.registry,
            id,
            &self.config.servers_path,
            &self.config.templates_path,
            template.unwrap_or(&self.config.default_template),
            &self.config.executable_name,
        )
        .await
    }

    /// Stop (if running) and delete server `id`.
    pub async fn delete_server(&self, id: &str) -> Result<()> {
        instance::delete(
            &self.registry,
            id,
            &self.config.servers_path,
            self.stop_timeouts(),
        )
        .await
    }

    /// Replace server `id`'s configuration file with `new_config`.
    pub async fn update_server_config(&self, id: &str, new_config: &Value) -> Result<()> {
        instance::update_config(
            id,
            &self.config.servers_path,
            &self.config.config_file_name,
            new_config,
        )
        .await
    }

    /// Current contents of server `id`'s configuration file.
    pub async fn read_server_config(&self, id: &str) -> Result<Map<String, Value>> {
        instance::read_config(id, &self.config.servers_path, &self.config.config_file_name).await
    }

    /// Template archives available for provisioning.
    pub async fn list_templates(&self) -> Result<Vec<String>> {
        instance::list_templates(&self.config.templates_path).await
    }

    /// Stop every live server, collecting failures.
    ///
    /// Used at daemon shutdown. Servers are stopped concurrently; servers
    /// that exit on their own in the meantime are not reported as failures.
    #[tracing::instrument(skip(self))]
    pub async fn shutdown_all(&self) -> Vec<(String, Error)> {
        let ids = self.registry.ids();
        tracing::info!(count = ids.len(), "Stopping all servers");

        let results = futures::future::join_all(ids.iter().map(|id| self.stop_server(id))).await;

        let failures: Vec<(String, Error)> = ids
            .into_iter()
            .zip(results)
            .filter_map(|(id, result)| match result {
                Ok(_) | Err(Error::NotRunning(_)) => None,
                Err(e) => Some((id, e)),
            })
            .collect();

        for (id, e) in &failures {
            tracing::error!(server_id = %id, error = %e, "Failed to stop server during shutdown");
        }
        failures
    }
}
