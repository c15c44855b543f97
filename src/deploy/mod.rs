// ABOUTME: Release lifecycle: provision, read current, install, switch, roll back.
// ABOUTME: Exports the typed pipeline steps and the orchestrator that runs them.

mod context;
mod error;
mod history;
mod install;
mod orchestrator;
mod pointer;
mod provision;
mod rollback;
mod step;
mod target;
mod tree;

pub use context::{DeployContext, DeployRequest};
pub use error::{CommandFailure, DeployError, DeployErrorKind};
pub use history::{ReleaseEntry, list_releases};
pub use install::{InstallRequest, Ownership, ReleaseInstaller};
pub use orchestrator::{DeployReport, ReleaseOrchestrator};
pub use pointer::{read_current, switch_current};
pub use provision::provision_app_dir;
pub use rollback::{RollbackReport, rollback};
pub use step::{
    InstallRelease, ProvisionDir, ReadCurrent, Step, StepName, StepOutcome, SwitchPointer,
};
pub use target::{DeployTarget, Release};
