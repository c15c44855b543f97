// ABOUTME: Unpacks a release archive into its versioned release directory.
// ABOUTME: Extracts to scratch, applies ownership, skips identical content, then materializes.

use std::io::{self, ErrorKind};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::fs;
use tokio::process::Command;

use super::error::{CommandFailure, IoResultExt};
use super::{DeployError, StepOutcome, tree};

const TAR: &str = "tar";
const RELEASE_DIR_MODE: u32 = 0o755;

/// Owner and group to apply to an extracted release.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ownership {
    pub owner: Option<String>,
    pub group: Option<String>,
}

impl Ownership {
    pub fn new(owner: Option<String>, group: Option<String>) -> Self {
        Self { owner, group }
    }

    pub fn is_requested(&self) -> bool {
        self.owner.is_some() || self.group.is_some()
    }

    /// The recursive chown/chgrp invocation, without its path argument.
    pub fn command(&self) -> Option<(&'static str, Vec<String>)> {
        match (&self.owner, &self.group) {
            (Some(owner), Some(group)) => {
                Some(("chown", vec!["-R".to_string(), format!("{owner}:{group}")]))
            }
            (Some(owner), None) => Some(("chown", vec!["-R".to_string(), owner.clone()])),
            (None, Some(group)) => Some(("chgrp", vec!["-R".to_string(), group.clone()])),
            (None, None) => None,
        }
    }
}

/// Inputs for one installation.
#[derive(Debug, Clone, Copy)]
pub struct InstallRequest<'a> {
    pub archive: &'a Path,
    pub release_path: &'a Path,
    pub ownership: &'a Ownership,
    pub force: bool,
}

/// Installs archives into release directories.
#[derive(Debug, Clone)]
pub struct ReleaseInstaller {
    scratch_root: PathBuf,
}

impl ReleaseInstaller {
    /// Create an installer that extracts into fresh directories under `scratch_root`.
    pub fn new(scratch_root: &Path) -> Self {
        Self {
            scratch_root: scratch_root.to_path_buf(),
        }
    }

    /// Install `request.archive` at `request.release_path`.
    ///
    /// Reports `changed = false` when an identical tree is already installed
    /// there. A differing tree is overwritten whether or not `force` is set.
    /// Never touches `current`.
    ///
    /// # Errors
    ///
    /// - `InvalidReleasePath` if the release path is relative
    /// - `SourceNotFound` if the archive is missing
    /// - `ExtractionFailed` / `OwnershipChangeFailed` with the command's output
    /// - `Io` if comparing or copying the tree fails
    pub async fn install(&self, request: &InstallRequest<'_>) -> Result<StepOutcome, DeployError> {
        let release = request.release_path;
        if !release.is_absolute() {
            return Err(DeployError::InvalidReleasePath(release.to_path_buf()));
        }

        // The child runs inside the scratch dir, so a relative archive path would break.
        let archive = match fs::canonicalize(request.archive).await {
            Ok(path) => path,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(DeployError::SourceNotFound(request.archive.to_path_buf()));
            }
            Err(e) => return Err(DeployError::io("failed to resolve", request.archive, e)),
        };

        let scratch = tempfile::Builder::new()
            .prefix(".capstan-extract-")
            .tempdir_in(&self.scratch_root)
            .at_path("failed to create scratch directory in", &self.scratch_root)?;
        tracing::debug!("Extracting {} into {}", archive.display(), scratch.path().display());

        run(TAR, &["xf".to_string()], &archive, scratch.path())
            .await
            .map_err(DeployError::ExtractionFailed)?;

        if let Some((program, args)) = request.ownership.command() {
            tracing::debug!("Applying ownership with {} {}", program, args.join(" "));
            run(program, &args, scratch.path(), scratch.path())
                .await
                .map_err(DeployError::OwnershipChangeFailed)?;
        }

        if fs::symlink_metadata(release).await.is_ok() {
            let (left, right) = (scratch.path().to_path_buf(), release.to_path_buf());
            let diffs = blocking("failed to compare", release, move || {
                tree::differences(&left, &right)
            })
            .await?;

            if diffs.is_empty() {
                tracing::info!("{} already holds this content", release.display());
                return Ok(StepOutcome::unchanged(Some(release.to_path_buf())));
            }

            if request.force {
                tracing::info!(
                    "Overwriting {} ({} differing paths)",
                    release.display(),
                    diffs.len()
                );
            } else {
                tracing::warn!(
                    "{} exists with different content ({} differing paths), overwriting",
                    release.display(),
                    diffs.len()
                );
            }
        }

        materialize(scratch.path(), release, request.ownership.is_requested()).await?;
        tracing::info!("Installed release {}", release.display());

        Ok(StepOutcome::changed(release.to_path_buf()))
    }
}

/// Run `program args.. path` with `cwd` as the child's working directory.
async fn run(
    program: &str,
    args: &[String],
    path: &Path,
    cwd: &Path,
) -> Result<(), CommandFailure> {
    let output = Command::new(program)
        .args(args)
        .arg(path)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|e| CommandFailure::spawn(program, &e))?;

    if output.status.success() {
        Ok(())
    } else {
        Err(CommandFailure::from_output(program, &output))
    }
}

/// Copy the scratch tree into a staging dir beside `release`, then swap it in.
async fn materialize(scratch: &Path, release: &Path, preserve_owner: bool) -> Result<(), DeployError> {
    let parent = release
        .parent()
        .ok_or_else(|| DeployError::InvalidReleasePath(release.to_path_buf()))?;

    let staging = tempfile::Builder::new()
        .prefix(".capstan-staging-")
        .tempdir_in(parent)
        .at_path("failed to create staging directory in", parent)?;

    let (src, dst) = (scratch.to_path_buf(), staging.path().to_path_buf());
    blocking("failed to copy release into", staging.path(), move || {
        tree::copy_tree(&src, &dst, preserve_owner)?;
        std::fs::set_permissions(&dst, std::fs::Permissions::from_mode(RELEASE_DIR_MODE))?;
        if preserve_owner {
            tree::copy_owner(&src, &dst)?;
        }
        Ok(())
    })
    .await?;

    match fs::symlink_metadata(release).await {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(release)
            .await
            .at_path("failed to replace", release)?,
        Ok(_) => fs::remove_file(release)
            .await
            .at_path("failed to replace", release)?,
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(DeployError::io("failed to inspect", release, e)),
    }

    let staged = staging.keep();
    if let Err(e) = fs::rename(&staged, release).await {
        let _ = fs::remove_dir_all(&staged).await;
        return Err(DeployError::io("failed to move release into", release, e));
    }
    Ok(())
}

/// Run blocking filesystem work off the async runtime.
async fn blocking<T, F>(context: &'static str, path: &Path, work: F) -> Result<T, DeployError>
where
    F: FnOnce() -> io::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| DeployError::io(context, path, io::Error::other(e)))?
        .at_path(context, path)
}
