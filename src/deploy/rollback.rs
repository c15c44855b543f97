// ABOUTME: Restores the pre-run state after a failed deploy.
// ABOUTME: Re-points `current` at the previous release and removes the half-installed one.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs;

use super::context::DeployContext;
use super::{DeployError, pointer};

/// What rollback managed to do, and what it could not.
#[derive(Debug, Default)]
pub struct RollbackReport {
    /// Release `current` points at after rollback, when one was restored.
    pub restored: Option<PathBuf>,
    /// Release directory deleted by rollback.
    pub removed_release: Option<PathBuf>,
    /// Problems encountered; all of kind `RollbackFailed`.
    pub errors: Vec<DeployError>,
}

impl RollbackReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    fn fail(&mut self, message: String) {
        tracing::warn!("Rollback: {}", message);
        self.errors.push(DeployError::RollbackFailed(message));
    }
}

/// Undo a failed run described by `ctx`.
///
/// This function:
/// 1. Leaves a non-symlink `current` alone (it is never auto-repaired)
/// 2. Re-points `current` at the recorded previous release, if it still exists
/// 3. On a first deploy, removes a `current` link pointing at the new release
/// 4. Deletes the release directory if this run created it
///
/// Every step is attempted; failures are collected rather than returned.
pub async fn rollback(ctx: &DeployContext) -> RollbackReport {
    let mut report = RollbackReport::default();
    let app_dir = ctx.target.app_dir();
    let link = ctx.target.current_link();

    let link_meta = fs::symlink_metadata(&link).await;
    let corrupt = matches!(&link_meta, Ok(meta) if !meta.file_type().is_symlink());

    if corrupt {
        report.fail(format!(
            "\"current\" in {} is not a symlink, leaving it untouched",
            app_dir.display()
        ));
    } else if let Some(previous) = &ctx.previous_release {
        if fs::metadata(previous).await.is_ok_and(|m| m.is_dir()) {
            match pointer::switch_current(&app_dir, previous).await {
                Ok(outcome) => {
                    if outcome.changed {
                        tracing::info!("Restored current -> {}", previous.display());
                    }
                    report.restored = Some(previous.clone());
                }
                Err(e) => report.fail(format!(
                    "failed to restore current to {}: {}",
                    previous.display(),
                    e
                )),
            }
        } else {
            report.fail(format!(
                "previous release {} no longer exists",
                previous.display()
            ));
        }
    } else if link_meta.is_ok() && pointer::points_at(&link, &ctx.release.path).await {
        match fs::remove_file(&link).await {
            Ok(()) => tracing::info!("Removed current link from failed first deploy"),
            Err(e) => report.fail(format!("failed to remove {}: {}", link.display(), e)),
        }
    }

    let release = &ctx.release.path;
    let is_previous = match &ctx.previous_release {
        Some(previous) => same_path(previous, release).await,
        None => false,
    };
    if ctx.release.installed && !is_previous {
        match fs::remove_dir_all(release).await {
            Ok(()) => {
                tracing::info!("Removed release {}", release.display());
                report.removed_release = Some(release.clone());
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => report.fail(format!("failed to remove {}: {}", release.display(), e)),
        }
    }

    report
}

async fn same_path(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a).await, fs::canonicalize(b).await) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
