//! Template-based provisioning of new server instances.

use crate::config::validate_path_component;
use crate::error::{Error, Result};
use crate::server::Registry;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

/// Result of a successful create
#[derive(Debug, Clone, Serialize)]
pub struct CreateOutcome {
    /// Directory of the new instance
    pub path: PathBuf,
}

/// Creates server `id` by extracting `templates_path/template_name`.
///
/// The archive is unpacked into a hidden staging directory inside
/// `base_path` and renamed to `base_path/id` only once everything has been
/// written, so a failed extraction never leaves a partial instance behind.
/// The id is reserved in `registry` for the duration, which also keeps a
/// concurrent create or start of the same id out.
///
/// # Errors
///
/// * [`Error::InvalidInput`] if `template_name` is empty or contains `..` or a separator
/// * [`Error::Conflict`] if `base_path/id` already exists or the id is busy
/// * [`Error::NotFound`] if the template archive does not exist
/// * [`Error::IoFailure`] if extraction or publishing fails
#[tracing::instrument(skip(registry, base_path, templates_path, executable_name), fields(server_id = %id))]
pub async fn create(
    registry: &Registry,
    id: &str,
    base_path: &Path,
    templates_path: &Path,
    template_name: &str,
    executable_name: &str,
) -> Result<CreateOutcome> {
    validate_path_component("template name", template_name)?;

    let target = base_path.join(id);
    if exists(&target).await? {
        return Err(Error::Conflict(format!(
            "Server directory already exists: {}",
            target.display()
        )));
    }

    let archive = templates_path.join(template_name);
    if !tokio::fs::metadata(&archive)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
    {
        tracing::warn!(path = %archive.display(), "Template not found");
        return Err(Error::NotFound(format!(
            "Template not found: {}",
            archive.display()
        )));
    }

    if !registry.claim(id) {
        return Err(Error::Conflict(format!("Server '{}' is busy", id)));
    }
    // Re-check under the reservation: a create that finished between the
    // first check and the claim has already published its directory.
    match exists(&target).await {
        Ok(false) => {}
        Ok(true) => {
            registry.release(id);
            return Err(Error::Conflict(format!(
                "Server directory already exists: {}",
                target.display()
            )));
        }
        Err(e) => {
            registry.release(id);
            return Err(e);
        }
    }

    let base = base_path.to_path_buf();
    let publish_to = target.clone();
    let entrypoint = executable_name.to_string();
    let result = tokio::task::spawn_blocking(move || {
        extract_and_publish(&archive, &base, &publish_to, &entrypoint)
    })
    .await
    .map_err(|e| Error::IoFailure(format!("Provisioning task failed: {}", e)))
    .and_then(|r| r);

    registry.release(id);

    match result {
        Ok(()) => {
            tracing::info!(path = %target.display(), template = %template_name, "Server created");
            Ok(CreateOutcome { path: target })
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to provision server");
            Err(e)
        }
    }
}

/// Lists the template archives available under `templates_path`, sorted by name.
#[tracing::instrument(skip(templates_path), fields(templates_path = %templates_path.display()))]
pub async fn list_templates(templates_path: &Path) -> Result<Vec<String>> {
    let mut entries = tokio::fs::read_dir(templates_path).await.map_err(|e| {
        Error::io(
            format!("Failed to read templates directory {}", templates_path.display()),
            e,
        )
    })?;

    let mut names = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| Error::io("Failed to read templates directory", e))?
    {
        let is_file = entry.file_type().await.map(|t| t.is_file()).unwrap_or(false);
        if let (true, Some(name)) = (is_file, entry.file_name().to_str()) {
            names.push(name.to_string());
        }
    }
    names.sort();
    Ok(names)
}

async fn exists(path: &Path) -> Result<bool> {
    tokio::fs::try_exists(path)
        .await
        .map_err(|e| Error::io(format!("Failed to check {}", path.display()), e))
}

fn extract_and_publish(archive: &Path, base: &Path, target: &Path, entrypoint: &str) -> Result<()> {
    fs::create_dir_all(base)
        .map_err(|e| Error::io(format!("Failed to create {}", base.display()), e))?;

    // Dropping the TempDir removes the staging tree on every error path. After
    // a successful rename the path is gone and the cleanup is a no-op.
    let staging = tempfile::Builder::new()
        .prefix(".provision-")
        .tempdir_in(base)
        .map_err(|e| Error::io("Failed to create staging directory", e))?;

    extract_archive(archive, staging.path())?;
    mark_executable(&staging.path().join(entrypoint))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(staging.path(), fs::Permissions::from_mode(0o755))
            .map_err(|e| Error::io("Failed to set instance directory permissions", e))?;
    }

    fs::rename(staging.path(), target).map_err(|e| {
        Error::io(format!("Failed to publish {}", target.display()), e)
    })?;

    Ok(())
}

/// Extracts every entry of the zip archive at `archive` into `dest`.
///
/// Entries that would land outside `dest` fail the whole extraction. Unix
/// modes stored in the archive are applied; directory modes are applied last
/// so a read-only directory does not block writing its contents.
pub fn extract_archive(archive: &Path, dest: &Path) -> Result<()> {
    let file = File::open(archive)
        .map_err(|e| Error::io(format!("Failed to open {}", archive.display()), e))?;
    let mut zip = zip::ZipArchive::new(BufReader::new(file)).map_err(|e| {
        Error::IoFailure(format!("Invalid template archive {}: {}", archive.display(), e))
    })?;

    let mut dir_modes = Vec::new();

    for i in 0..zip.len() {
        let mut entry = zip
            .by_index(i)
            .map_err(|e| Error::IoFailure(format!("Failed to read archive entry {}: {}", i, e)))?;

        let relative = entry.enclosed_name().ok_or_else(|| {
            Error::IoFailure(format!(
                "Archive entry '{}' escapes the instance directory",
                entry.name()
            ))
        })?;
        let outpath = dest.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&outpath)
                .map_err(|e| Error::io(format!("Failed to create {}", outpath.display()), e))?;
            if let Some(mode) = entry.unix_mode() {
                dir_modes.push((outpath, mode));
            }
            continue;
        }

        if let Some(parent) = outpath.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| Error::io(format!("Failed to create {}", parent.display()), e))?;
        }
        let mut outfile = File::create(&outpath)
            .map_err(|e| Error::io(format!("Failed to create {}", outpath.display()), e))?;
        io::copy(&mut entry, &mut outfile)
            .map_err(|e| Error::io(format!("Failed to extract {}", outpath.display()), e))?;

        #[cfg(unix)]
        {
            if let Some(mode) = entry.unix_mode() {
                set_mode(&outpath, mode)?;
            }
        }
    }

    #[cfg(unix)]
    {
        for (path, mode) in dir_modes.into_iter().rev() {
            set_mode(&path, mode)?;
        }
    }
    #[cfg(not(unix))]
    drop(dir_modes);

    Ok(())
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode & 0o7777))
        .map_err(|e| Error::io(format!("Failed to set permissions on {}", path.display()), e))
}

/// Adds the execute bits to `path` if it is a regular file. Missing files are ignored.
fn mark_executable(path: &Path) -> Result<()> {
    let metadata = match fs::metadata(path) {
        Ok(metadata) if metadata.is_file() => metadata,
        Ok(_) => return Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "Template has no entrypoint to mark executable");
            return Ok(());
        }
        Err(e) => return Err(Error::io(format!("Failed to stat {}", path.display()), e)),
    };

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut permissions = metadata.permissions();
        permissions.set_mode(permissions.mode() | 0o111);
        fs::set_permissions(path, permissions)
            .map_err(|e| Error::io(format!("Failed to mark {} executable", path.display()), e))?;
    }
    #[cfg(not(unix))]
    let _ = metadata;

    Ok(())
}
