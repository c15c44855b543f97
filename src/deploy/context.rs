// ABOUTME: Shared state threaded through every step of one deploy run.
// ABOUTME: Built from a DeployRequest; records what rollback needs to undo.

use std::path::PathBuf;

use crate::scm::ScmFacts;
use crate::types::VersionStamp;

use super::DeployError;
use super::install::Ownership;
use super::target::{DeployTarget, Release};

/// Everything a caller supplies for one deploy.
#[derive(Debug, Clone)]
pub struct DeployRequest {
    pub target: DeployTarget,
    /// Local, already-transferred release archive.
    pub archive: PathBuf,
    /// Caller-computed timestamp; opaque to the core.
    pub timestamp: String,
    pub scm: Option<ScmFacts>,
    pub ownership: Ownership,
    pub force: bool,
    /// Where extraction scratch dirs are created. Defaults to the system temp dir.
    pub scratch_root: Option<PathBuf>,
}

impl DeployRequest {
    pub fn new(target: DeployTarget, archive: impl Into<PathBuf>, timestamp: impl Into<String>) -> Self {
        Self {
            target,
            archive: archive.into(),
            timestamp: timestamp.into(),
            scm: None,
            ownership: Ownership::default(),
            force: false,
            scratch_root: None,
        }
    }

    pub fn scm(mut self, scm: ScmFacts) -> Self {
        self.scm = Some(scm);
        self
    }

    pub fn ownership(mut self, ownership: Ownership) -> Self {
        self.ownership = ownership;
        self
    }

    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn scratch_root(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_root = Some(dir.into());
        self
    }

    /// The stamp this request deploys under.
    pub fn version_stamp(&self) -> VersionStamp {
        let (hash, dirty) = match &self.scm {
            Some(scm) => (Some(scm.short_hash.as_str()), scm.dirty),
            None => (None, false),
        };
        VersionStamp::compute(&self.timestamp, hash, dirty)
    }

    /// Check that the release lands directly inside the app directory.
    ///
    /// # Errors
    ///
    /// Returns `InvalidReleasePath` when the timestamp or hash would put the
    /// release elsewhere (separators, `..`, hidden names).
    pub fn validate(&self) -> Result<(), DeployError> {
        let stamp = self.version_stamp();
        if stamp.is_valid_dir_name() {
            Ok(())
        } else {
            Err(DeployError::InvalidReleasePath(
                self.target.app_dir().join(stamp.as_str()),
            ))
        }
    }
}

/// Mutable run state shared by the pipeline steps and rollback.
#[derive(Debug, Clone)]
pub struct DeployContext {
    pub target: DeployTarget,
    pub release: Release,
    pub archive: PathBuf,
    pub ownership: Ownership,
    pub force: bool,
    pub scratch_root: PathBuf,
    /// Where `current` pointed before this run touched anything.
    pub previous_release: Option<PathBuf>,
}

impl DeployContext {
    pub fn from_request(request: &DeployRequest) -> Self {
        let release = request.target.release(request.version_stamp());
        Self {
            target: request.target.clone(),
            release,
            archive: request.archive.clone(),
            ownership: request.ownership.clone(),
            force: request.force,
            scratch_root: request
                .scratch_root
                .clone()
                .unwrap_or_else(std::env::temp_dir),
            previous_release: None,
        }
    }
}
