// ABOUTME: Runs the release pipeline and rolls back on the first failing step.
// ABOUTME: Aggregates step outcomes into a single DeployReport.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tokio::fs;

use crate::scm::ScmFacts;
use crate::types::VersionStamp;

use super::context::{DeployContext, DeployRequest};
use super::rollback::{RollbackReport, rollback};
use super::step::{InstallRelease, ProvisionDir, ReadCurrent, Step, StepName, StepOutcome, SwitchPointer};
use super::{DeployError, DeployErrorKind, pointer};

/// Result of one orchestration run. Always produced, success or not.
#[derive(Debug, Clone, Serialize)]
pub struct DeployReport {
    pub failed: bool,
    pub changed: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<DeployErrorKind>,
    pub version: VersionStamp,
    /// Paths changed by each step, keyed by the step's report key.
    #[serde(flatten)]
    pub steps: BTreeMap<&'static str, PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_release: Option<PathBuf>,
    /// Secondary problems hit while rolling back; never the primary cause.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rollback_errors: Vec<String>,
}

impl DeployReport {
    fn new(version: VersionStamp) -> Self {
        Self {
            failed: false,
            changed: false,
            message: String::new(),
            kind: None,
            version,
            steps: BTreeMap::new(),
            previous_release: None,
            rollback_errors: Vec::new(),
        }
    }

    /// Path recorded for `step`, if it changed anything.
    pub fn step_path(&self, step: StepName) -> Option<&Path> {
        step.result_key()
            .and_then(|key| self.steps.get(key))
            .map(PathBuf::as_path)
    }

    fn record(&mut self, step: StepName, outcome: StepOutcome) {
        if !outcome.changed {
            return;
        }
        self.changed = true;
        if let (Some(key), Some(path)) = (step.result_key(), outcome.path) {
            self.steps.insert(key, path);
        }
    }

    fn fail(mut self, err: &DeployError) -> Self {
        self.failed = true;
        self.message = err.to_string();
        self.kind = Some(err.kind());
        self
    }

    fn with_rollback(mut self, rollback: RollbackReport) -> Self {
        self.rollback_errors = rollback.errors.iter().map(ToString::to_string).collect();
        self
    }
}

/// Drives the release pipeline: provision, read current, install, switch.
pub struct ReleaseOrchestrator {
    steps: Vec<Box<dyn Step>>,
}

impl Default for ReleaseOrchestrator {
    fn default() -> Self {
        Self::standard()
    }
}

impl ReleaseOrchestrator {
    /// The standard four-step pipeline.
    pub fn standard() -> Self {
        Self::with_steps(vec![
            Box::new(ProvisionDir),
            Box::new(ReadCurrent),
            Box::new(InstallRelease),
            Box::new(SwitchPointer),
        ])
    }

    /// A pipeline with custom steps, run in the given order.
    pub fn with_steps(steps: Vec<Box<dyn Step>>) -> Self {
        Self { steps }
    }

    pub fn step_names(&self) -> Vec<StepName> {
        self.steps.iter().map(|step| step.name()).collect()
    }

    /// Deploy `request`, rolling back if any step fails.
    ///
    /// Nothing runs when the stamp is not a plain directory name, when the
    /// archive is missing, when `current` is corrupt, or (without `force`)
    /// when the requested commit is already live.
    pub async fn run(&self, request: &DeployRequest) -> DeployReport {
        let mut ctx = DeployContext::from_request(request);
        let report = DeployReport::new(ctx.release.stamp.clone());

        if let Err(e) = request.validate() {
            return report.fail(&e);
        }

        if !fs::try_exists(&request.archive).await.unwrap_or(false) {
            return report.fail(&DeployError::SourceNotFound(request.archive.clone()));
        }

        // Nothing has been mutated yet, so failures here need no rollback.
        match pointer::read_current(&ctx.target.app_dir()).await {
            Ok(previous) => ctx.previous_release = previous,
            Err(e) => return report.fail(&e),
        }

        if !request.force && already_live(request.scm.as_ref(), ctx.previous_release.as_deref()) {
            let notice = DeployError::AlreadyDeployed(ctx.release.stamp.to_string());
            tracing::info!("{}", notice);
            return DeployReport {
                message: notice.to_string(),
                kind: Some(notice.kind()),
                previous_release: ctx.previous_release,
                ..report
            };
        }

        self.run_steps(&mut ctx, report).await
    }

    async fn run_steps(&self, ctx: &mut DeployContext, mut report: DeployReport) -> DeployReport {
        tracing::info!(
            "Deploying {} to {}",
            ctx.release.stamp,
            ctx.target.app_dir().display()
        );

        for step in &self.steps {
            let name = step.name();
            tracing::debug!("Running step {}", name);

            match step.execute(ctx).await {
                Ok(outcome) => report.record(name, outcome),
                Err(e) => {
                    tracing::error!("Step {} failed: {}", name, e);
                    let rollback_report = rollback(ctx).await;
                    report.previous_release = ctx.previous_release.clone();
                    return report.fail(&e).with_rollback(rollback_report);
                }
            }
        }

        report.previous_release = ctx.previous_release.clone();
        report.message = if report.changed {
            format!("deployed {}", ctx.release.stamp)
        } else {
            format!("{} is already installed and live", ctx.release.stamp)
        };
        report
    }
}

/// Whether the clean commit being deployed is the one `current` already serves.
fn already_live(scm: Option<&ScmFacts>, previous: Option<&Path>) -> bool {
    let Some(scm) = scm else {
        return false;
    };
    if scm.dirty || scm.short_hash.is_empty() {
        return false;
    }
    let Some(previous) = previous.and_then(VersionStamp::from_release_path) else {
        return false;
    };
    !previous.is_dirty() && previous.hash_segment() == Some(scm.short_hash.as_str())
}
