use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable overriding [`DaemonConfig::servers_path`].
pub const ENV_SERVERS_PATH: &str = "WARDEN_SERVERS_PATH";
/// Environment variable overriding [`DaemonConfig::templates_path`].
pub const ENV_TEMPLATES_PATH: &str = "WARDEN_TEMPLATES_PATH";
/// Environment variable overriding [`DaemonConfig::executable_name`].
pub const ENV_EXECUTABLE_NAME: &str = "WARDEN_EXECUTABLE_NAME";
/// Environment variable overriding [`DaemonConfig::default_template`].
pub const ENV_DEFAULT_TEMPLATE: &str = "WARDEN_DEFAULT_TEMPLATE";
/// Environment variable overriding [`DaemonConfig::stop_timeout_secs`].
pub const ENV_STOP_TIMEOUT_SECS: &str = "WARDEN_STOP_TIMEOUT_SECS";
/// Environment variable overriding [`DaemonConfig::bind_address`].
pub const ENV_BIND_ADDRESS: &str = "WARDEN_BIND_ADDRESS";

/// Configuration for the supervisor daemon.
///
/// Every field has a default, so a JSON file only needs the keys it changes.
///
/// # JSON Schema
///
/// ```json
/// {
///   "serversPath": "/srv/games/servers",
///   "templatesPath": "/srv/games/templates",
///   "executableName": "ragemp-server",
///   "stopTimeoutSecs": 15,
///   "bindAddress": "127.0.0.1:8080"
/// }
/// ```
///
/// # Examples
///
/// ```
/// use server_warden::config::DaemonConfig;
///
/// let config = DaemonConfig::parse_from_str(r#"{ "executableName": "srcds" }"#).unwrap();
/// assert_eq!(config.executable_name, "srcds");
/// assert_eq!(config.log_file_name, "console.log");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct DaemonConfig {
    /// Root directory holding one subdirectory per server id.
    pub servers_path: PathBuf,

    /// Directory holding the template archives.
    pub templates_path: PathBuf,

    /// File name of the server executable inside each instance directory.
    /// Used both to launch the server and to mark the entrypoint executable
    /// after provisioning.
    pub executable_name: String,

    /// Console log file written by the server process.
    pub log_file_name: String,

    /// Per-instance configuration file rewritten by config updates.
    pub config_file_name: String,

    /// Template used when a create request does not name one.
    pub default_template: String,

    /// Seconds to wait after SIGTERM before escalating to SIGKILL.
    pub stop_timeout_secs: u64,

    /// Seconds to wait after SIGKILL before giving up.
    pub kill_timeout_secs: u64,

    /// Address the HTTP API listens on.
    pub bind_address: String,

    /// Number of HTTP worker threads. `None` uses the actix default.
    pub workers: Option<usize>,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            servers_path: PathBuf::from("/var/lib/warden/servers"),
            templates_path: PathBuf::from("/var/lib/warden/templates"),
            executable_name: "ragemp-server".to_string(),
            log_file_name: "console.log".to_string(),
            config_file_name: "conf.json".to_string(),
            default_template: "default.zip".to_string(),
            stop_timeout_secs: 10,
            kill_timeout_secs: 5,
            bind_address: "127.0.0.1:8080".to_string(),
            workers: None,
        }
    }
}

impl DaemonConfig {
    /// Loads a configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the file cannot be read or is not valid JSON.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;

        Self::parse_from_str(&content)
    }

    /// Parses a configuration from a JSON string.
    pub fn parse_from_str(content: &str) -> Result<Self> {
        serde_json::from_str(content)
            .map_err(|e| Error::Config(format!("Failed to parse JSON config: {}", e)))
    }

    /// Builds a configuration from the defaults overlaid with the process environment.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Overlays `WARDEN_*` environment variables onto this configuration.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_vars(|key| std::env::var(key).ok())
    }

    /// Overlays values produced by `lookup` for each `WARDEN_*` key.
    ///
    /// Split out from [`DaemonConfig::apply_env`] so the overlay can be exercised
    /// without mutating the real process environment.
    pub fn apply_vars<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_SERVERS_PATH) {
            self.servers_path = PathBuf::from(value);
        }
        if let Some(value) = lookup(ENV_TEMPLATES_PATH) {
            self.templates_path = PathBuf::from(value);
        }
        if let Some(value) = lookup(ENV_EXECUTABLE_NAME) {
            self.executable_name = value;
        }
        if let Some(value) = lookup(ENV_DEFAULT_TEMPLATE) {
            self.default_template = value;
        }
        if let Some(value) = lookup(ENV_STOP_TIMEOUT_SECS) {
            self.stop_timeout_secs = value.trim().parse().map_err(|e| {
                Error::Config(format!("{} must be a number of seconds: {}", ENV_STOP_TIMEOUT_SECS, e))
            })?;
        }
        if let Some(value) = lookup(ENV_BIND_ADDRESS) {
            self.bind_address = value;
        }
        Ok(())
    }

    /// Graceful stop window as a [`Duration`].
    pub fn stop_timeout(&self) -> Duration {
        Duration::from_secs(self.stop_timeout_secs)
    }

    /// Forced kill window as a [`Duration`].
    pub fn kill_timeout(&self) -> Duration {
        Duration::from_secs(self.kill_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config = DaemonConfig::parse_from_str(
            r#"{
                "serversPath": "/srv/servers",
                "stopTimeoutSecs": 3
            }"#,
        )
        .unwrap();

        assert_eq!(config.servers_path, PathBuf::from("/srv/servers"));
        assert_eq!(config.stop_timeout(), Duration::from_secs(3));
        assert_eq!(config.templates_path, DaemonConfig::default().templates_path);
        assert_eq!(config.config_file_name, "conf.json");
    }

    #[test]
    fn test_env_overlay() {
        let vars: HashMap<&str, &str> = [
            (ENV_SERVERS_PATH, "/tmp/servers"),
            (ENV_EXECUTABLE_NAME, "game-bin"),
            (ENV_STOP_TIMEOUT_SECS, " 30 "),
        ]
        .into_iter()
        .collect();

        let mut config = DaemonConfig::default();
        config
            .apply_vars(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.servers_path, PathBuf::from("/tmp/servers"));
        assert_eq!(config.executable_name, "game-bin");
        assert_eq!(config.stop_timeout_secs, 30);
        assert_eq!(config.bind_address, "127.0.0.1:8080");
    }

    #[test]
    fn test_env_overlay_rejects_bad_timeout() {
        let mut config = DaemonConfig::default();
        let result = config.apply_vars(|key| {
            (key == ENV_STOP_TIMEOUT_SECS).then(|| "soon".to_string())
        });
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
