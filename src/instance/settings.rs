//! Reading and atomically replacing an instance's configuration file.

use crate::error::{Error, Result};
use serde_json::{Map, Value};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Replaces the configuration file of server `id` with `new_config`.
///
/// The file is only ever replaced, never created: a missing instance
/// directory or configuration file is [`Error::NotFound`]. The new content is
/// written to a temporary file next to the target, flushed to disk and then
/// renamed over it, so readers see either the old or the new file in full.
///
/// # Errors
///
/// * [`Error::InvalidInput`] if `new_config` is not a JSON object
/// * [`Error::NotFound`] if the instance directory or configuration file is missing
/// * [`Error::IoFailure`] if the replacement cannot be written; the old file is untouched
#[tracing::instrument(skip(base_path, config_file_name, new_config), fields(server_id = %id))]
pub async fn update_config(
    id: &str,
    base_path: &Path,
    config_file_name: &str,
    new_config: &Value,
) -> Result<()> {
    let Value::Object(map) = new_config else {
        return Err(Error::InvalidInput(
            "Server configuration must be a JSON object".to_string(),
        ));
    };

    let path = config_path(id, base_path, config_file_name).await?;
    let contents = serde_json::to_vec_pretty(map)
        .map_err(|e| Error::IoFailure(format!("Failed to serialize configuration: {}", e)))?;

    let target = path.clone();
    tokio::task::spawn_blocking(move || {
        replace_file_with(&target, |file| {
            file.write_all(&contents)?;
            file.write_all(b"\n")
        })
    })
    .await
    .map_err(|e| Error::IoFailure(format!("Config writer task failed: {}", e)))??;

    tracing::info!(path = %path.display(), keys = map.len(), "Server configuration updated");
    Ok(())
}

/// Reads the configuration file of server `id`.
///
/// # Errors
///
/// * [`Error::NotFound`] if the instance directory or configuration file is missing
/// * [`Error::IoFailure`] if the file cannot be read or does not hold a JSON object
#[tracing::instrument(skip(base_path, config_file_name), fields(server_id = %id))]
pub async fn read_config(
    id: &str,
    base_path: &Path,
    config_file_name: &str,
) -> Result<Map<String, Value>> {
    let path = config_path(id, base_path, config_file_name).await?;
    let raw = tokio::fs::read(&path)
        .await
        .map_err(|e| Error::io(format!("Failed to read {}", path.display()), e))?;

    match serde_json::from_slice(&raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(Error::IoFailure(format!(
            "{} does not contain a JSON object",
            path.display()
        ))),
        Err(e) => Err(Error::IoFailure(format!(
            "Failed to parse {}: {}",
            path.display(),
            e
        ))),
    }
}

async fn config_path(id: &str, base_path: &Path, config_file_name: &str) -> Result<PathBuf> {
    let server_dir = base_path.join(id);
    if !tokio::fs::metadata(&server_dir)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false)
    {
        return Err(Error::NotFound(format!(
            "Server directory not found: {}",
            server_dir.display()
        )));
    }

    let path = server_dir.join(config_file_name);
    if !tokio::fs::metadata(&path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
    {
        return Err(Error::NotFound(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }
    Ok(path)
}

/// Atomically replaces `path` with whatever `write` produces.
///
/// `write` fills a temporary file in the same directory; on success the file
/// is synced, given the permissions of the file it replaces and renamed over
/// `path`. If `write` or any later step fails the temporary file is removed
/// and `path` keeps its previous content.
pub fn replace_file_with<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut fs::File) -> io::Result<()>,
{
    let dir = path
        .parent()
        .ok_or_else(|| Error::IoFailure(format!("{} has no parent directory", path.display())))?;

    let mut tmp = NamedTempFile::new_in(dir)
        .map_err(|e| Error::io(format!("Failed to create temporary file in {}", dir.display()), e))?;

    write(tmp.as_file_mut())
        .and_then(|_| tmp.as_file().sync_all())
        .map_err(|e| Error::io(format!("Failed to write replacement for {}", path.display()), e))?;

    if let Ok(metadata) = fs::metadata(path) {
        tmp.as_file()
            .set_permissions(metadata.permissions())
            .map_err(|e| Error::io("Failed to copy file permissions", e))?;
    }

    tmp.persist(path)
        .map_err(|e| Error::io(format!("Failed to replace {}", path.display()), e.error))?;

    // Make the rename itself durable. Failure here leaves a valid file either way.
    if let Ok(dir_handle) = fs::File::open(dir) {
        let _ = dir_handle.sync_all();
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_write_keeps_old_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conf.json");
        fs::write(&path, r#"{"maxplayers":100}"#).unwrap();

        let result = replace_file_with(&path, |file| {
            file.write_all(br#"{"maxpla"#)?;
            Err(io::Error::new(io::ErrorKind::Other, "simulated crash"))
        });

        assert!(matches!(result, Err(Error::IoFailure(_))));
        assert_eq!(fs::read_to_string(&path).unwrap(), r#"{"maxplayers":100}"#);

        // No stray temporary files are left next to the target.
        let leftovers: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(leftovers.len(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_replacement_keeps_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conf.json");
        fs::write(&path, "{}").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o640)).unwrap();

        replace_file_with(&path, |file| file.write_all(b"{\"a\":1}")).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o640);
        assert_eq!(fs::read_to_string(&path).unwrap(), "{\"a\":1}");
    }
}
