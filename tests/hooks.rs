// ABOUTME: Integration tests for hooks system.
// ABOUTME: Tests hook discovery, exit status, and the CAPSTAN_* environment around real deploys.

mod support;

use capstan::deploy::ReleaseOrchestrator;
use capstan::hooks::{HookEnv, HookPoint, HookRunner, HookStatus};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use support::Sandbox;
use tempfile::TempDir;

const TS1: &str = "20240101120000";
const TS2: &str = "20240102120000";

fn create_hook(dir: &Path, name: &str, script: &str) {
    fs::create_dir_all(dir).unwrap();

    let hook_path = dir.join(name);
    fs::write(&hook_path, script).unwrap();

    // Make executable
    let mut perms = fs::metadata(&hook_path).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&hook_path, perms).unwrap();
}

/// A hook that dumps the named variables, one `NAME=value` per line, into `out`.
fn env_dump_hook(dir: &Path, point: HookPoint, out: &Path, vars: &[&str]) {
    let mut script = String::from("#!/bin/sh\n");
    for var in vars {
        script.push_str(&format!("echo \"{var}=${var}\" >> '{}'\n", out.display()));
    }
    create_hook(dir, point.filename(), &script);
}

fn dumped(out: &Path) -> Vec<String> {
    fs::read_to_string(out)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

/// Test: pre-deploy hook runs and its exit status is reported.
#[tokio::test]
async fn pre_deploy_hook_runs() {
    let temp_dir = TempDir::new().unwrap();
    let marker = temp_dir.path().join("ran");
    create_hook(
        temp_dir.path(),
        "pre-deploy",
        &format!("#!/bin/sh\ntouch '{}'\nexit 0\n", marker.display()),
    );

    let runner = HookRunner::new(temp_dir.path());
    let status = runner.run(HookPoint::PreDeploy, &HookEnv::default()).await;

    assert_eq!(status, HookStatus::Succeeded);
    assert!(marker.exists());
}

/// Test: missing hooks are skipped.
#[tokio::test]
async fn missing_hook_is_skipped() {
    let temp_dir = TempDir::new().unwrap();
    let runner = HookRunner::new(temp_dir.path());

    let status = runner.run(HookPoint::PostDeploy, &HookEnv::default()).await;

    assert_eq!(status, HookStatus::Missing);
}

/// Test: failing hook reports its exit code and stderr.
#[tokio::test]
async fn failing_hook_reports_exit_code() {
    let temp_dir = TempDir::new().unwrap();
    create_hook(
        temp_dir.path(),
        "on-error",
        "#!/bin/sh\necho 'cleanup failed' >&2\nexit 3\n",
    );

    let runner = HookRunner::new(temp_dir.path());
    let status = runner.run(HookPoint::OnError, &HookEnv::default()).await;

    match status {
        HookStatus::Failed { exit_code, stderr } => {
            assert_eq!(exit_code, Some(3));
            assert!(stderr.contains("cleanup failed"));
        }
        other => panic!("expected failure, got {other:?}"),
    }
}

/// Test: post-deploy sees the release it switched to and the one it replaced.
#[tokio::test]
async fn post_deploy_receives_switch_outcome() {
    let sandbox = Sandbox::new();
    let hooks_dir = sandbox.base.join("hooks");
    let out = sandbox.base.join("post-deploy.env");
    env_dump_hook(
        &hooks_dir,
        HookPoint::PostDeploy,
        &out,
        &[
            "CAPSTAN_APP",
            "CAPSTAN_RELEASE_PATH",
            "CAPSTAN_PREVIOUS_RELEASE",
            "CAPSTAN_FAILED",
            "CAPSTAN_CHANGED",
            "CAPSTAN_ERROR_KIND",
        ],
    );
    let orchestrator = ReleaseOrchestrator::standard();
    let app_dir = sandbox.app_dir("shop");

    let v1 = sandbox.archive("v1", &[("index.html", "v1")]);
    orchestrator.run(&sandbox.request("shop", &v1, TS1)).await;

    let v2 = sandbox.archive("v2", &[("index.html", "v2")]);
    let request = sandbox.request("shop", &v2, TS2);
    let report = orchestrator.run(&request).await;
    assert!(report.changed);

    let env = HookEnv::for_request(&request, None).with_report(&report);
    let status = HookRunner::new(&hooks_dir)
        .run(HookPoint::PostDeploy, &env)
        .await;

    assert_eq!(status, HookStatus::Succeeded);
    assert_eq!(
        dumped(&out),
        vec![
            "CAPSTAN_APP=shop".to_string(),
            format!("CAPSTAN_RELEASE_PATH={}", app_dir.join(format!("{TS2}_")).display()),
            format!(
                "CAPSTAN_PREVIOUS_RELEASE={}",
                app_dir.join(format!("{TS1}_")).display()
            ),
            "CAPSTAN_FAILED=false".to_string(),
            "CAPSTAN_CHANGED=true".to_string(),
            "CAPSTAN_ERROR_KIND=".to_string(),
        ]
    );
}

/// Test: on-error learns why the deploy failed.
#[tokio::test]
async fn on_error_receives_failure_kind() {
    let sandbox = Sandbox::new();
    let hooks_dir = sandbox.base.join("hooks");
    let out = sandbox.base.join("on-error.env");
    env_dump_hook(
        &hooks_dir,
        HookPoint::OnError,
        &out,
        &["CAPSTAN_FAILED", "CAPSTAN_CHANGED", "CAPSTAN_ERROR_KIND"],
    );

    let broken = sandbox.corrupt_archive("broken");
    let request = sandbox.request("shop", &broken, TS1);
    let report = ReleaseOrchestrator::standard().run(&request).await;
    assert!(report.failed);

    let env = HookEnv::for_request(&request, None).with_report(&report);
    let status = HookRunner::new(&hooks_dir).run(HookPoint::OnError, &env).await;

    assert_eq!(status, HookStatus::Succeeded);
    assert_eq!(
        dumped(&out),
        vec![
            "CAPSTAN_FAILED=true",
            "CAPSTAN_CHANGED=false",
            "CAPSTAN_ERROR_KIND=ExtractionFailed",
        ]
    );
}

/// Test: the request env names the release before anything runs.
#[test]
fn request_env_names_release_path() {
    let sandbox = Sandbox::new();
    let v1 = PathBuf::from("/nonexistent/v1.tar");
    let request = sandbox.request("shop", &v1, TS1);

    let env = HookEnv::for_request(&request, None);

    let expected = sandbox.app_dir("shop").join(format!("{TS1}_"));
    assert_eq!(env.get("CAPSTAN_RELEASE"), Some(format!("{TS1}_").as_str()));
    assert_eq!(
        env.get("CAPSTAN_RELEASE_PATH"),
        Some(expected.display().to_string().as_str())
    );
    assert_eq!(env.get("CAPSTAN_PREVIOUS_RELEASE"), None);
}
