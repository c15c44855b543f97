// ABOUTME: The Step abstraction the release pipeline is built from.
// ABOUTME: Defines step names, outcomes, and the four standard pipeline steps.

use std::fmt;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::Serialize;

use super::context::DeployContext;
use super::install::{InstallRequest, ReleaseInstaller};
use super::{DeployError, pointer, provision};

/// Identifies a pipeline step in logs and reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepName {
    ProvisionDir,
    ReadCurrent,
    InstallRelease,
    SwitchPointer,
}

impl StepName {
    /// Report key under which the step's changed path is recorded.
    pub fn result_key(&self) -> Option<&'static str> {
        match self {
            StepName::ProvisionDir => Some("deploy-dir-created"),
            StepName::ReadCurrent => None,
            StepName::InstallRelease => Some("release-directory"),
            StepName::SwitchPointer => Some("current-pointer"),
        }
    }
}

impl fmt::Display for StepName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StepName::ProvisionDir => "provision-dir",
            StepName::ReadCurrent => "read-current",
            StepName::InstallRelease => "install-release",
            StepName::SwitchPointer => "switch-pointer",
        };
        f.write_str(name)
    }
}

/// What a successful step did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOutcome {
    pub changed: bool,
    pub path: Option<PathBuf>,
}

impl StepOutcome {
    pub fn changed(path: PathBuf) -> Self {
        Self {
            changed: true,
            path: Some(path),
        }
    }

    pub fn unchanged(path: Option<PathBuf>) -> Self {
        Self {
            changed: false,
            path,
        }
    }
}

/// One stage of the release pipeline.
#[async_trait]
pub trait Step: Send + Sync {
    fn name(&self) -> StepName;

    async fn execute(&self, ctx: &mut DeployContext) -> Result<StepOutcome, DeployError>;
}

/// Ensures the app directory exists and is writable.
#[derive(Debug, Default)]
pub struct ProvisionDir;

#[async_trait]
impl Step for ProvisionDir {
    fn name(&self) -> StepName {
        StepName::ProvisionDir
    }

    async fn execute(&self, ctx: &mut DeployContext) -> Result<StepOutcome, DeployError> {
        provision::provision_app_dir(&ctx.target.app_dir()).await
    }
}

/// Records the release `current` points at, so rollback can restore it.
#[derive(Debug, Default)]
pub struct ReadCurrent;

#[async_trait]
impl Step for ReadCurrent {
    fn name(&self) -> StepName {
        StepName::ReadCurrent
    }

    async fn execute(&self, ctx: &mut DeployContext) -> Result<StepOutcome, DeployError> {
        let previous = pointer::read_current(&ctx.target.app_dir()).await?;
        ctx.previous_release = previous.clone();
        Ok(StepOutcome::unchanged(previous))
    }
}

/// Unpacks the archive into the release directory.
#[derive(Debug, Default)]
pub struct InstallRelease;

#[async_trait]
impl Step for InstallRelease {
    fn name(&self) -> StepName {
        StepName::InstallRelease
    }

    async fn execute(&self, ctx: &mut DeployContext) -> Result<StepOutcome, DeployError> {
        let installer = ReleaseInstaller::new(&ctx.scratch_root);
        let request = InstallRequest {
            archive: &ctx.archive,
            release_path: &ctx.release.path,
            ownership: &ctx.ownership,
            force: ctx.force,
        };
        let outcome = installer.install(&request).await?;

        if outcome.changed {
            ctx.release.installed = true;
            Ok(StepOutcome::changed(ctx.release.path.clone()))
        } else {
            Ok(StepOutcome::unchanged(Some(ctx.release.path.clone())))
        }
    }
}

/// Points `current` at the new release.
#[derive(Debug, Default)]
pub struct SwitchPointer;

#[async_trait]
impl Step for SwitchPointer {
    fn name(&self) -> StepName {
        StepName::SwitchPointer
    }

    async fn execute(&self, ctx: &mut DeployContext) -> Result<StepOutcome, DeployError> {
        pointer::switch_current(&ctx.target.app_dir(), &ctx.release.path).await
    }
}
