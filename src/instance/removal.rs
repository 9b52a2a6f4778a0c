//! Deleting an instance: stop it if needed, then remove its directory.

use crate::error::{Error, Result};
use crate::server::{Registry, StopTimeouts, lifecycle};
use std::path::Path;

/// Deletes server `id`, stopping its process first if one is live.
///
/// While the directory is being removed the id is reserved in `registry`, so a
/// concurrent start sees [`Error::Conflict`] instead of launching into a
/// half-deleted tree. The reservation is dropped only after removal has
/// finished, leaving no registry entry behind.
///
/// # Errors
///
/// * [`Error::Timeout`] if the process survives the forced kill; nothing is deleted
/// * [`Error::NotFound`] if the instance directory does not exist
/// * [`Error::Conflict`] if another operation holds the id
/// * [`Error::IoFailure`] if the directory cannot be removed
#[tracing::instrument(skip(registry, base_path, timeouts), fields(server_id = %id))]
pub async fn delete(
    registry: &Registry,
    id: &str,
    base_path: &Path,
    timeouts: StopTimeouts,
) -> Result<()> {
    if registry.get(id).is_some() {
        match lifecycle::stop(registry, id, timeouts).await {
            Ok(outcome) => {
                tracing::info!(forced = outcome.forced, "Stopped server before deletion");
            }
            Err(Error::NotRunning(_)) => {
                tracing::debug!("Server exited before it could be stopped");
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to stop server, aborting deletion");
                return Err(e);
            }
        }
    }

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

    if !registry.claim(id) {
        return Err(Error::Conflict(format!("Server '{}' is busy", id)));
    }

    let result = tokio::fs::remove_dir_all(&server_dir)
        .await
        .map_err(|e| Error::io(format!("Failed to remove {}", server_dir.display()), e));

    registry.release(id);
    result?;

    tracing::info!(path = %server_dir.display(), "Server deleted");
    Ok(())
}
