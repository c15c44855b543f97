// ABOUTME: Error types for release lifecycle operations.
// ABOUTME: Each failure maps to a DeployErrorKind for programmatic handling.

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Output of an external command that exited unsuccessfully.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandFailure {
    pub program: String,
    /// `None` when the process could not be spawned or was killed by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandFailure {
    pub(crate) fn from_output(program: &str, output: &std::process::Output) -> Self {
        Self {
            program: program.to_string(),
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        }
    }

    pub(crate) fn spawn(program: &str, err: &std::io::Error) -> Self {
        Self {
            program: program.to_string(),
            exit_code: None,
            stdout: String::new(),
            stderr: err.to_string(),
        }
    }
}

impl fmt::Display for CommandFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rc = self
            .exit_code
            .map(|code| code.to_string())
            .unwrap_or_else(|| "none".to_string());
        write!(
            f,
            "{} rc: {}, stdout: {}, stderr: {}",
            self.program, rc, self.stdout, self.stderr
        )
    }
}

/// Errors that can occur while provisioning, installing, switching or rolling back.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    /// The archive to deploy does not exist.
    #[error("local source file {0} does not exist")]
    SourceNotFound(PathBuf),

    /// Creating the app directory was refused by the filesystem.
    #[error("destination parent directory {0} is not accessible")]
    DirectoryNotAccessible(PathBuf),

    /// The app directory is unusable (missing parent, not a directory, not writable).
    #[error("invalid deploy target {path}: {reason}")]
    InvalidDeployTarget { path: PathBuf, reason: String },

    /// Something other than a symlink occupies `current`.
    #[error("\"current\" in {0} is not a symlink")]
    CorruptCurrentPointer(PathBuf),

    /// The release directory is not absolute or does not sit directly in the app dir.
    #[error("release directory {0} is not a valid release path")]
    InvalidReleasePath(PathBuf),

    /// Unpacking the archive failed.
    #[error("failed to extract archive: {0}")]
    ExtractionFailed(CommandFailure),

    /// Applying owner/group to the extracted tree failed.
    #[error("failed to set ownership: {0}")]
    OwnershipChangeFailed(CommandFailure),

    /// The requested commit is already live.
    #[error("version {0} has already been deployed, use force to redeploy")]
    AlreadyDeployed(String),

    /// Restoring the previous state failed.
    #[error("rollback failed: {0}")]
    RollbackFailed(String),

    /// Unexpected filesystem failure.
    #[error("{context} {path}: {source}")]
    Io {
        context: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Categorizes deploy errors for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DeployErrorKind {
    SourceNotFound,
    DirectoryNotAccessible,
    InvalidDeployTarget,
    CorruptCurrentPointer,
    InvalidReleasePath,
    ExtractionFailed,
    OwnershipChangeFailed,
    AlreadyDeployed,
    RollbackFailed,
    Io,
}

impl DeployError {
    /// Returns the error kind for programmatic handling.
    pub fn kind(&self) -> DeployErrorKind {
        match self {
            DeployError::SourceNotFound(_) => DeployErrorKind::SourceNotFound,
            DeployError::DirectoryNotAccessible(_) => DeployErrorKind::DirectoryNotAccessible,
            DeployError::InvalidDeployTarget { .. } => DeployErrorKind::InvalidDeployTarget,
            DeployError::CorruptCurrentPointer(_) => DeployErrorKind::CorruptCurrentPointer,
            DeployError::InvalidReleasePath(_) => DeployErrorKind::InvalidReleasePath,
            DeployError::ExtractionFailed(_) => DeployErrorKind::ExtractionFailed,
            DeployError::OwnershipChangeFailed(_) => DeployErrorKind::OwnershipChangeFailed,
            DeployError::AlreadyDeployed(_) => DeployErrorKind::AlreadyDeployed,
            DeployError::RollbackFailed(_) => DeployErrorKind::RollbackFailed,
            DeployError::Io { .. } => DeployErrorKind::Io,
        }
    }

    /// Returns the failed command's details for extraction and ownership errors.
    pub fn command_failure(&self) -> Option<&CommandFailure> {
        match self {
            DeployError::ExtractionFailed(failure) | DeployError::OwnershipChangeFailed(failure) => {
                Some(failure)
            }
            _ => None,
        }
    }

    pub(crate) fn invalid_target(path: &Path, reason: impl Into<String>) -> Self {
        DeployError::InvalidDeployTarget {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }

    pub(crate) fn io(context: &'static str, path: &Path, source: std::io::Error) -> Self {
        DeployError::Io {
            context,
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Extension trait attaching path context to raw I/O results.
pub(crate) trait IoResultExt<T> {
    fn at_path(self, context: &'static str, path: &Path) -> Result<T, DeployError>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn at_path(self, context: &'static str, path: &Path) -> Result<T, DeployError> {
        self.map_err(|e| DeployError::io(context, path, e))
    }
}
