// ABOUTME: Lifecycle scripts run around a release deploy.
// ABOUTME: Exports the release and, once known, the run's outcome as CAPSTAN_* variables.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;

use crate::deploy::{DeployReport, DeployRequest};

/// Where in a deploy a hook runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookPoint {
    /// Before the pipeline. A failure aborts the deploy untouched.
    PreDeploy,
    /// After `current` moved to a new release.
    PostDeploy,
    /// After a failed, rolled-back run.
    OnError,
}

impl HookPoint {
    /// Script name looked up in the hooks directory.
    pub fn filename(&self) -> &'static str {
        match self {
            HookPoint::PreDeploy => "pre-deploy",
            HookPoint::PostDeploy => "post-deploy",
            HookPoint::OnError => "on-error",
        }
    }
}

impl fmt::Display for HookPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.filename())
    }
}

/// Environment handed to hook scripts.
#[derive(Debug, Clone, Default)]
pub struct HookEnv {
    vars: Vec<(&'static str, String)>,
}

impl HookEnv {
    /// Describe the release `request` installs. `previous` is the release
    /// `current` served when the deploy started.
    pub fn for_request(request: &DeployRequest, previous: Option<&Path>) -> Self {
        let target = &request.target;
        let stamp = request.version_stamp();

        let mut env = Self::default();
        env.set("CAPSTAN_APP", target.app().to_string());
        env.set("CAPSTAN_RELEASE", stamp.to_string());
        env.set(
            "CAPSTAN_RELEASE_PATH",
            target.app_dir().join(stamp.as_str()).display().to_string(),
        );
        env.set("CAPSTAN_DEPLOY_DIR", target.deploy_dir().display().to_string());
        if let Some(previous) = previous {
            env.set("CAPSTAN_PREVIOUS_RELEASE", previous.display().to_string());
        }
        env
    }

    /// Add what the finished run did, for post-deploy and on-error scripts.
    pub fn with_report(mut self, report: &DeployReport) -> Self {
        self.set("CAPSTAN_FAILED", report.failed.to_string());
        self.set("CAPSTAN_CHANGED", report.changed.to_string());
        if let Some(kind) = report.kind {
            self.set("CAPSTAN_ERROR_KIND", format!("{kind:?}"));
        }
        if report.failed {
            self.set("CAPSTAN_ERROR", report.message.clone());
        }
        // Read by the pipeline right before the switch, so fresher than ours.
        if let Some(ref previous) = report.previous_release {
            self.set("CAPSTAN_PREVIOUS_RELEASE", previous.display().to_string());
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn vars(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(key, value)| (*key, value.as_str()))
    }

    fn set(&mut self, name: &'static str, value: String) {
        match self.vars.iter_mut().find(|(key, _)| *key == name) {
            Some(slot) => slot.1 = value,
            None => self.vars.push((name, value)),
        }
    }
}

/// How a hook run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookStatus {
    /// No executable for this point; nothing ran.
    Missing,
    Succeeded,
    /// Non-zero exit, death by signal (`exit_code: None`), or spawn failure.
    Failed {
        exit_code: Option<i32>,
        stderr: String,
    },
}

/// Runs the scripts found in one hooks directory.
pub struct HookRunner {
    hooks_dir: PathBuf,
}

impl HookRunner {
    pub fn new(hooks_dir: impl Into<PathBuf>) -> Self {
        Self {
            hooks_dir: hooks_dir.into(),
        }
    }

    fn script(&self, point: HookPoint) -> Option<PathBuf> {
        let path = self.hooks_dir.join(point.filename());
        path.is_file().then_some(path)
    }

    /// Run the script for `point` with `env` added to the environment.
    pub async fn run(&self, point: HookPoint, env: &HookEnv) -> HookStatus {
        let Some(script) = self.script(point) else {
            tracing::debug!("No {} hook in {}", point, self.hooks_dir.display());
            return HookStatus::Missing;
        };

        tracing::info!("Running {} hook {}", point, script.display());
        let output = Command::new(&script)
            .envs(env.vars())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await;

        let output = match output {
            Ok(output) => output,
            Err(e) => {
                tracing::error!("Could not start {} hook: {}", point, e);
                return HookStatus::Failed {
                    exit_code: None,
                    stderr: e.to_string(),
                };
            }
        };

        for line in String::from_utf8_lossy(&output.stdout).lines() {
            tracing::info!(hook = %point, "{line}");
        }

        if output.status.success() {
            HookStatus::Succeeded
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            tracing::warn!("{} hook exited with {:?}", point, output.status.code());
            HookStatus::Failed {
                exit_code: output.status.code(),
                stderr,
            }
        }
    }
}
