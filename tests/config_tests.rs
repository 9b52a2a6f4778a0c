use assert_fs::prelude::*;
use server_warden::config::{DaemonConfig, validate_config};
use server_warden::error::{Error, Result};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

#[test]
fn test_parse_config_file() -> Result<()> {
    let dir = assert_fs::TempDir::new().unwrap();
    let file = dir.child("warden.json");
    file.write_str(
        r#"{
            "serversPath": "/srv/games/servers",
            "templatesPath": "/srv/games/templates",
            "executableName": "srcds_run",
            "defaultTemplate": "base.zip",
            "stopTimeoutSecs": 20,
            "killTimeoutSecs": 3,
            "bindAddress": "0.0.0.0:9000",
            "workers": 2
        }"#,
    )
    .unwrap();

    let config = DaemonConfig::from_file(file.path())?;
    assert_eq!(config.servers_path, PathBuf::from("/srv/games/servers"));
    assert_eq!(config.templates_path, PathBuf::from("/srv/games/templates"));
    assert_eq!(config.executable_name, "srcds_run");
    assert_eq!(config.default_template, "base.zip");
    assert_eq!(config.stop_timeout(), Duration::from_secs(20));
    assert_eq!(config.kill_timeout(), Duration::from_secs(3));
    assert_eq!(config.bind_address, "0.0.0.0:9000");
    assert_eq!(config.workers, Some(2));
    assert_eq!(config.log_file_name, "console.log");
    assert_eq!(config.config_file_name, "conf.json");

    validate_config(&config)?;
    Ok(())
}

#[test]
fn test_missing_config_file() {
    let dir = assert_fs::TempDir::new().unwrap();
    let result = DaemonConfig::from_file(dir.child("absent.json").path());
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_malformed_config_file() {
    let dir = assert_fs::TempDir::new().unwrap();
    let file = dir.child("warden.json");
    file.write_str("{ \"serversPath\": ").unwrap();

    let result = DaemonConfig::from_file(file.path());
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_env_overrides_file() -> Result<()> {
    let mut config = DaemonConfig::parse_from_str(r#"{ "executableName": "from-file" }"#)?;
    let vars: HashMap<&str, &str> = [
        ("WARDEN_EXECUTABLE_NAME", "from-env"),
        ("WARDEN_SERVERS_PATH", "/tmp/warden-servers"),
    ]
    .into_iter()
    .collect();

    config.apply_vars(|key| vars.get(key).map(|v| v.to_string()))?;
    assert_eq!(config.executable_name, "from-env");
    assert_eq!(config.servers_path, PathBuf::from("/tmp/warden-servers"));
    assert_eq!(config.templates_path, DaemonConfig::default().templates_path);
    Ok(())
}

#[test]
fn test_validate_config_rejects_bad_values() {
    let bad_configs = [
        DaemonConfig {
            executable_name: "../bin/sh".to_string(),
            ..DaemonConfig::default()
        },
        DaemonConfig {
            log_file_name: String::new(),
            ..DaemonConfig::default()
        },
        DaemonConfig {
            stop_timeout_secs: 0,
            ..DaemonConfig::default()
        },
        DaemonConfig {
            servers_path: PathBuf::new(),
            ..DaemonConfig::default()
        },
        DaemonConfig {
            workers: Some(0),
            ..DaemonConfig::default()
        },
    ];

    for config in &bad_configs {
        assert!(
            matches!(validate_config(config), Err(Error::Config(_))),
            "{:?} should be rejected",
            config
        );
    }
}
