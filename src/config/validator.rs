use crate::config::DaemonConfig;
use crate::error::{Error, Result};

/// Checks that `name` is usable as a single path component.
///
/// Rejects empty names, anything containing `..`, and anything containing a
/// `/` or `\` separator. Used for template names, server ids and the
/// configured file names.
pub fn validate_path_component(what: &str, name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::InvalidInput(format!("{} must not be empty", what)));
    }
    if name.contains("..") {
        return Err(Error::InvalidInput(format!(
            "{} '{}' must not contain '..'",
            what, name
        )));
    }
    if name.contains('/') || name.contains('\\') {
        return Err(Error::InvalidInput(format!(
            "{} '{}' must not contain a path separator",
            what, name
        )));
    }
    Ok(())
}

/// Full configuration validation
pub fn validate_config(config: &DaemonConfig) -> Result<()> {
    if config.servers_path.as_os_str().is_empty() {
        return Err(Error::Config("serversPath must not be empty".to_string()));
    }
    if config.templates_path.as_os_str().is_empty() {
        return Err(Error::Config("templatesPath must not be empty".to_string()));
    }

    for (what, name) in [
        ("executableName", &config.executable_name),
        ("logFileName", &config.log_file_name),
        ("configFileName", &config.config_file_name),
        ("defaultTemplate", &config.default_template),
    ] {
        validate_path_component(what, name).map_err(|e| Error::Config(e.to_string()))?;
    }

    if config.stop_timeout_secs == 0 {
        return Err(Error::Config("stopTimeoutSecs must be at least 1".to_string()));
    }
    if config.kill_timeout_secs == 0 {
        return Err(Error::Config("killTimeoutSecs must be at least 1".to_string()));
    }
    if config.workers == Some(0) {
        return Err(Error::Config("workers must be at least 1".to_string()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_component_rules() {
        assert!(validate_path_component("template", "default.zip").is_ok());
        assert!(validate_path_component("template", "").is_err());
        assert!(validate_path_component("template", "..").is_err());
        assert!(validate_path_component("template", "a..b.zip").is_err());
        assert!(validate_path_component("template", "nested/x.zip").is_err());
        assert!(validate_path_component("template", "nested\\x.zip").is_err());
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&DaemonConfig::default()).is_ok());
    }
}
