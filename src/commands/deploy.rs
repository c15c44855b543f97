// ABOUTME: Deploy command implementation.
// ABOUTME: Resolves inputs, runs hooks around the release pipeline, and reports the result.

use std::path::Path;

use capstan::config::Config;
use capstan::deploy::{DeployRequest, ReleaseOrchestrator, read_current};
use capstan::diagnostics::Diagnostics;
use capstan::error::{Error, Result};
use capstan::hooks::{HookEnv, HookPoint, HookRunner, HookStatus};
use capstan::output::Output;
use capstan::scm::{self, ScmFacts};

use crate::cli::DeployArgs;

/// Deploy the archive named in `args` to the configured target.
pub async fn deploy(
    mut config: Config,
    project_dir: &Path,
    args: DeployArgs,
    mut output: Output,
) -> Result<()> {
    output.start_timer();
    let mut diag = Diagnostics::default();

    if args.owner.is_some() {
        config.owner = args.owner.clone();
    }
    if args.group.is_some() {
        config.group = args.group.clone();
    }

    let target = config.target()?;
    let timestamp = args
        .timestamp
        .clone()
        .unwrap_or_else(|| config.timestamp_now());

    let mut request = DeployRequest::new(target.clone(), &args.archive, timestamp)
        .ownership(config.ownership())
        .force(args.force);
    if let Some(facts) = resolve_scm(&args).await? {
        request = request.scm(facts);
    }
    if let Some(ref dir) = config.scratch_dir {
        request = request.scratch_root(dir);
    }

    request.validate()?;
    let stamp = request.version_stamp();
    // Best effort: a corrupt `current` is reported by the pipeline itself.
    let previous = read_current(&target.app_dir()).await.ok().flatten();
    let hook_env = HookEnv::for_request(&request, previous.as_deref());
    let hooks = HookRunner::new(config.hooks_dir(project_dir));

    output.progress(&format!(
        "Deploying {} release {} to {}",
        target.app(),
        stamp,
        target.app_dir().display()
    ));

    if let HookStatus::Failed { stderr, .. } = hooks.run(HookPoint::PreDeploy, &hook_env).await {
        if !stderr.is_empty() {
            output.error(stderr.trim());
        }
        return Err(Error::Hook(format!("{} hook failed", HookPoint::PreDeploy)));
    }

    // The pipeline has no internal deadline; bounding it is our job.
    let orchestrator = ReleaseOrchestrator::standard();
    let report = tokio::time::timeout(config.timeout, orchestrator.run(&request))
        .await
        .map_err(|_| Error::Timeout(config.timeout))?;

    output.report(&report);

    let outcome_env = hook_env.with_report(&report);

    if report.failed {
        diag.rollback(&report);
        let status = hooks.run(HookPoint::OnError, &outcome_env).await;
        diag.hook(HookPoint::OnError, &status);
        emit_warnings(&output, &diag);
        return Err(Error::DeployFailed(report.message));
    }

    if report.changed {
        let status = hooks.run(HookPoint::PostDeploy, &outcome_env).await;
        diag.hook(HookPoint::PostDeploy, &status);
    }

    emit_warnings(&output, &diag);

    if report.changed {
        output.success(&format!("Deployed {} release {}", target.app(), stamp));
    } else {
        output.success(&report.message);
    }
    Ok(())
}

/// Source-control facts from flags, or from git when `--scm-from` is given.
async fn resolve_scm(args: &DeployArgs) -> Result<Option<ScmFacts>> {
    if let Some(ref repo) = args.scm_from {
        return Ok(Some(scm::query(repo).await?));
    }

    if args.scm_hash.is_some() || args.scm_dirty {
        let hash = args.scm_hash.clone().unwrap_or_default();
        return Ok(Some(ScmFacts::new(hash, args.scm_dirty)));
    }

    Ok(None)
}

fn emit_warnings(output: &Output, diag: &Diagnostics) {
    for warning in diag.warnings() {
        output.warning(&warning.to_string());
    }
}
