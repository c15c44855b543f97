// ABOUTME: Makes sure an application's deploy directory exists and is usable.
// ABOUTME: Resolves symlinked paths, creates missing dirs, and checks writability.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs;

use super::error::IoResultExt;
use super::{DeployError, StepOutcome};

/// Ensure `app_dir` exists, is a directory, and is writable.
///
/// Reports `changed` with the created path only when the directory had to
/// be created. A concurrent creation is treated as success.
///
/// # Errors
///
/// - `DirectoryNotAccessible` if the filesystem refuses to create the directory
/// - `InvalidDeployTarget` if the parent chain is missing, or the path is not
///   a writable directory
pub async fn provision_app_dir(app_dir: &Path) -> Result<StepOutcome, DeployError> {
    let app_dir = resolve_real_path(app_dir).await;
    let mut created = None;

    if !fs::try_exists(&app_dir).await.unwrap_or(false) {
        let deploy_dir = app_dir
            .parent()
            .ok_or_else(|| DeployError::invalid_target(&app_dir, "app dir has no parent"))?;
        let root = deploy_dir.parent().unwrap_or(deploy_dir);

        match fs::metadata(root).await {
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::PermissionDenied => {
                return Err(DeployError::DirectoryNotAccessible(root.to_path_buf()));
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(DeployError::invalid_target(
                    root,
                    "parent directory does not exist",
                ));
            }
            Err(e) => return Err(DeployError::io("failed to stat", root, e)),
        }

        match fs::create_dir_all(&app_dir).await {
            Ok(()) => {
                tracing::info!("Created app directory {}", app_dir.display());
                created = Some(app_dir.clone());
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                tracing::debug!("App directory {} appeared concurrently", app_dir.display());
            }
            Err(e) if e.kind() == ErrorKind::PermissionDenied => {
                return Err(DeployError::DirectoryNotAccessible(deploy_dir.to_path_buf()));
            }
            Err(e) => return Err(DeployError::io("failed to create", &app_dir, e)),
        }
    }

    let metadata = fs::metadata(&app_dir)
        .await
        .at_path("failed to stat", &app_dir)?;
    if !metadata.is_dir() {
        return Err(DeployError::invalid_target(&app_dir, "app_dir is not a directory"));
    }

    // Mode bits miss ACLs and read-only mounts, so try a real file.
    let scratch_dir = app_dir.clone();
    let writable = tokio::task::spawn_blocking(move || tempfile::tempfile_in(&scratch_dir).is_ok())
        .await
        .unwrap_or(false);
    if !writable {
        return Err(DeployError::invalid_target(&app_dir, "destination not writable"));
    }

    Ok(match created {
        Some(path) => StepOutcome::changed(path),
        None => StepOutcome::unchanged(Some(app_dir)),
    })
}

/// Resolve `path` through symlinks; if it doesn't exist yet, resolve its parent.
pub(crate) async fn resolve_real_path(path: &Path) -> PathBuf {
    if let Ok(real) = fs::canonicalize(path).await {
        return real;
    }

    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) => match fs::canonicalize(parent).await {
            Ok(real_parent) => real_parent.join(name),
            Err(_) => path.to_path_buf(),
        },
        _ => path.to_path_buf(),
    }
}
