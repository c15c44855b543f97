// ABOUTME: Non-fatal problems collected while a deploy wraps up.
// ABOUTME: Failed follow-up hooks and rollback leftovers are reported, never raised.

use std::fmt;

use crate::deploy::DeployReport;
use crate::hooks::{HookPoint, HookStatus};

/// A problem worth telling the user about that doesn't change the result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// A post-deploy or on-error script did not succeed.
    Hook {
        point: HookPoint,
        exit_code: Option<i32>,
    },
    /// Rollback could not fully restore the previous state.
    Rollback(String),
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::Hook {
                point,
                exit_code: Some(code),
            } => write!(f, "{point} hook exited with {code}"),
            Warning::Hook {
                point,
                exit_code: None,
            } => write!(f, "{point} hook did not exit normally"),
            Warning::Rollback(problem) => f.write_str(problem),
        }
    }
}

#[derive(Debug, Default)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    /// Record a warning and log it.
    pub fn warn(&mut self, warning: Warning) {
        tracing::warn!("{}", warning);
        self.warnings.push(warning);
    }

    /// Record a follow-up hook's failure. Successful or missing hooks are ignored.
    pub fn hook(&mut self, point: HookPoint, status: &HookStatus) {
        if let HookStatus::Failed { exit_code, .. } = status {
            self.warn(Warning::Hook {
                point,
                exit_code: *exit_code,
            });
        }
    }

    /// Record everything rollback left behind in `report`.
    pub fn rollback(&mut self, report: &DeployReport) {
        for problem in &report.rollback_errors {
            self.warn(Warning::Rollback(problem.clone()));
        }
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_failed_hooks_are_recorded() {
        let mut diag = Diagnostics::default();

        diag.hook(HookPoint::PostDeploy, &HookStatus::Missing);
        diag.hook(HookPoint::PostDeploy, &HookStatus::Succeeded);
        diag.hook(
            HookPoint::OnError,
            &HookStatus::Failed {
                exit_code: Some(3),
                stderr: "boom".to_string(),
            },
        );

        assert_eq!(
            diag.warnings(),
            &[Warning::Hook {
                point: HookPoint::OnError,
                exit_code: Some(3),
            }]
        );
        assert_eq!(diag.warnings()[0].to_string(), "on-error hook exited with 3");
    }

    #[test]
    fn signalled_hook_has_no_exit_code() {
        let warning = Warning::Hook {
            point: HookPoint::PostDeploy,
            exit_code: None,
        };
        assert_eq!(warning.to_string(), "post-deploy hook did not exit normally");
    }
}
