//! Server Warden daemon entry point.
//!
//! Loads configuration, initializes logging and serves the HTTP API until
//! interrupted. Every server still running at shutdown is stopped before the
//! process exits.

use anyhow::Context;
use clap::Parser;
use server_warden::{DaemonConfig, Supervisor, api, config::validate_config};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Command line arguments
#[derive(Debug, Parser)]
#[command(name = "server-warden", version, about = "Supervises game-server processes on this host")]
struct CliArgs {
    /// JSON configuration file. Environment variables override its values.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Address for the HTTP API, e.g. 127.0.0.1:8080
    #[arg(short, long, value_name = "ADDRESS")]
    bind: Option<String>,

    /// Output logs in JSON format
    #[arg(long)]
    json_logs: bool,
}

fn setup_logging(json_format: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if json_format {
        registry
            .with(fmt::layer().json().with_thread_names(true))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_thread_names(true))
            .init();
    }
}

fn load_config(args: &CliArgs) -> anyhow::Result<DaemonConfig> {
    let mut config = match &args.config {
        Some(path) => DaemonConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => DaemonConfig::default(),
    };
    config.apply_env()?;
    if let Some(bind) = &args.bind {
        config.bind_address = bind.clone();
    }
    validate_config(&config)?;
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();
    setup_logging(args.json_logs);

    let config = load_config(&args)?;
    info!(
        servers_path = %config.servers_path.display(),
        templates_path = %config.templates_path.display(),
        executable = %config.executable_name,
        "Configuration loaded"
    );

    std::fs::create_dir_all(&config.servers_path)
        .with_context(|| format!("creating {}", config.servers_path.display()))?;
    if !config.templates_path.is_dir() {
        warn!(
            templates_path = %config.templates_path.display(),
            "Templates directory does not exist; create requests will fail"
        );
    }

    let supervisor = Arc::new(Supervisor::new(config));
    let served = api::serve(Arc::clone(&supervisor)).await;

    let failures = supervisor.shutdown_all().await;
    if !failures.is_empty() {
        error!(count = failures.len(), "Some servers could not be stopped");
    }

    served?;
    info!("Server Warden stopped");
    Ok(())
}
