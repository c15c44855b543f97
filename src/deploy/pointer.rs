// ABOUTME: Reads and switches the `current` symlink that marks the live release.
// ABOUTME: Anything other than a symlink at `current` is refused, never repaired.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs;

use crate::types::CURRENT_LINK;

use super::error::IoResultExt;
use super::{DeployError, StepOutcome};

/// Resolve the release `current` points at.
///
/// Returns `None` when there is no `current` yet (first deploy).
///
/// # Errors
///
/// Returns `CorruptCurrentPointer` if `current` exists but is not a symlink.
pub async fn read_current(app_dir: &Path) -> Result<Option<PathBuf>, DeployError> {
    let link = app_dir.join(CURRENT_LINK);

    match fs::symlink_metadata(&link).await {
        Ok(meta) if meta.file_type().is_symlink() => {
            let target = resolve_link(&link).await?;
            tracing::debug!("current -> {}", target.display());
            Ok(Some(target))
        }
        Ok(_) => Err(DeployError::CorruptCurrentPointer(app_dir.to_path_buf())),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(DeployError::io("failed to inspect", &link, e)),
    }
}

/// Point `current` at `release_path`, replacing any previous link.
///
/// The old link is removed before the new one is created; the new link's
/// creation is the moment the release goes live.
///
/// # Errors
///
/// Returns `CorruptCurrentPointer` if `current` exists but is not a symlink.
pub async fn switch_current(app_dir: &Path, release_path: &Path) -> Result<StepOutcome, DeployError> {
    let link = app_dir.join(CURRENT_LINK);

    match fs::symlink_metadata(&link).await {
        Ok(meta) if meta.file_type().is_symlink() => {
            if points_at(&link, release_path).await {
                tracing::debug!("current already points at {}", release_path.display());
                return Ok(StepOutcome::unchanged(Some(link)));
            }
            fs::remove_file(&link)
                .await
                .at_path("failed to remove", &link)?;
        }
        Ok(_) => return Err(DeployError::CorruptCurrentPointer(app_dir.to_path_buf())),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(DeployError::io("failed to inspect", &link, e)),
    }

    fs::symlink(release_path, &link)
        .await
        .at_path("failed to create link", &link)?;
    tracing::info!("current -> {}", release_path.display());

    Ok(StepOutcome::changed(link))
}

/// Whether the symlink at `link` resolves to the same directory as `target`.
pub(crate) async fn points_at(link: &Path, target: &Path) -> bool {
    match (fs::canonicalize(link).await, fs::canonicalize(target).await) {
        (Ok(resolved), Ok(expected)) => resolved == expected,
        _ => false,
    }
}

/// Fully resolve a symlink, falling back to its literal target when dangling.
async fn resolve_link(link: &Path) -> Result<PathBuf, DeployError> {
    if let Ok(real) = fs::canonicalize(link).await {
        return Ok(real);
    }

    let target = fs::read_link(link)
        .await
        .at_path("failed to read link", link)?;
    Ok(match link.parent() {
        Some(parent) if target.is_relative() => parent.join(target),
        _ => target,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deploy::DeployErrorKind;

    #[tokio::test]
    async fn missing_current_means_first_deploy() {
        let temp = tempfile::tempdir().unwrap();
        assert_eq!(read_current(temp.path()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn regular_file_is_corrupt() {
        let temp = tempfile::tempdir().unwrap();
        std::fs::write(temp.path().join("current"), "oops").unwrap();

        let err = read_current(temp.path()).await.unwrap_err();
        assert_eq!(err.kind(), DeployErrorKind::CorruptCurrentPointer);

        let err = switch_current(temp.path(), &temp.path().join("r1"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), DeployErrorKind::CorruptCurrentPointer);
        assert!(temp.path().join("current").is_file());
    }

    #[tokio::test]
    async fn dangling_link_reports_literal_target() {
        let temp = tempfile::tempdir().unwrap();
        let gone = temp.path().join("gone");
        std::os::unix::fs::symlink(&gone, temp.path().join("current")).unwrap();

        assert_eq!(read_current(temp.path()).await.unwrap(), Some(gone));
    }
}
