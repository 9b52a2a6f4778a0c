//! Configuration module for Server Warden.
//!
//! This module handles loading and validating the daemon configuration:
//! where instance directories and template archives live, which executable
//! to launch, the stop timeouts and the HTTP bind address. Configuration can
//! come from a JSON file, from `WARDEN_*` environment variables, or both.
//!
//! # Examples
//!
//! Loading a configuration from a file and overlaying the environment:
//!
//! ```no_run
//! use server_warden::config::{DaemonConfig, validate_config};
//!
//! let mut config = DaemonConfig::from_file("warden.json").unwrap();
//! config.apply_env().unwrap();
//! validate_config(&config).unwrap();
//! ```
mod parser;
pub mod validator;

pub use parser::{
    DaemonConfig, ENV_BIND_ADDRESS, ENV_DEFAULT_TEMPLATE, ENV_EXECUTABLE_NAME,
    ENV_SERVERS_PATH, ENV_STOP_TIMEOUT_SECS, ENV_TEMPLATES_PATH,
};
pub use validator::{validate_config, validate_path_component};
