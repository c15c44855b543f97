// ABOUTME: Integration tests for rolling back a failed deploy.
// ABOUTME: Drives rollback directly with hand-built contexts.

mod support;

use std::fs;
use std::os::unix::fs::symlink;

use capstan::deploy::{DeployContext, DeployErrorKind, rollback};
use support::{Sandbox, current_target};

/// A context for deploying `new` over `previous` in app `shop`.
fn context(sandbox: &Sandbox, new: &str, previous: Option<&str>) -> DeployContext {
    let archive = sandbox.base.join("unused.tar");
    let mut ctx = DeployContext::from_request(&sandbox.request("shop", &archive, new));
    ctx.previous_release = previous.map(|p| sandbox.app_dir("shop").join(p));
    ctx
}

fn release(sandbox: &Sandbox, name: &str) {
    let dir = sandbox.app_dir("shop").join(name);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("index.html"), name).unwrap();
}

#[tokio::test]
async fn relinks_previous_and_removes_new_release() {
    let sandbox = Sandbox::new();
    let app_dir = sandbox.app_dir("shop");
    release(&sandbox, "1_");
    release(&sandbox, "2_");
    symlink(app_dir.join("2_"), app_dir.join("current")).unwrap();

    let mut ctx = context(&sandbox, "2", Some("1_"));
    ctx.release.installed = true;

    let report = rollback(&ctx).await;

    assert!(report.is_clean(), "{:?}", report.errors);
    assert_eq!(report.restored, Some(app_dir.join("1_")));
    assert_eq!(report.removed_release, Some(app_dir.join("2_")));
    assert_eq!(current_target(&app_dir), Some(app_dir.join("1_")));
    assert!(!app_dir.join("2_").exists());
}

#[tokio::test]
async fn keeps_release_it_did_not_write() {
    let sandbox = Sandbox::new();
    let app_dir = sandbox.app_dir("shop");
    release(&sandbox, "1_");
    release(&sandbox, "2_");
    symlink(app_dir.join("1_"), app_dir.join("current")).unwrap();

    let ctx = context(&sandbox, "2", Some("1_"));

    let report = rollback(&ctx).await;

    assert!(report.is_clean());
    assert_eq!(report.removed_release, None);
    assert!(app_dir.join("2_").exists());
}

#[tokio::test]
async fn never_removes_the_previous_release() {
    let sandbox = Sandbox::new();
    let app_dir = sandbox.app_dir("shop");
    release(&sandbox, "1_");
    symlink(app_dir.join("1_"), app_dir.join("current")).unwrap();

    let mut ctx = context(&sandbox, "1", Some("1_"));
    ctx.release.installed = true;

    let report = rollback(&ctx).await;

    assert!(report.is_clean());
    assert!(app_dir.join("1_").exists());
    assert_eq!(current_target(&app_dir), Some(app_dir.join("1_")));
}

#[tokio::test]
async fn first_deploy_link_is_removed() {
    let sandbox = Sandbox::new();
    let app_dir = sandbox.app_dir("shop");
    release(&sandbox, "1_");
    symlink(app_dir.join("1_"), app_dir.join("current")).unwrap();

    let mut ctx = context(&sandbox, "1", None);
    ctx.release.installed = true;

    let report = rollback(&ctx).await;

    assert!(report.is_clean(), "{:?}", report.errors);
    assert!(fs::symlink_metadata(app_dir.join("current")).is_err());
    assert!(!app_dir.join("1_").exists());
}

#[tokio::test]
async fn vanished_previous_release_is_reported() {
    let sandbox = Sandbox::new();
    let app_dir = sandbox.app_dir("shop");
    release(&sandbox, "2_");
    symlink(app_dir.join("2_"), app_dir.join("current")).unwrap();

    let mut ctx = context(&sandbox, "2", Some("1_"));
    ctx.release.installed = true;

    let report = rollback(&ctx).await;

    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].kind(), DeployErrorKind::RollbackFailed);
    assert!(report.errors[0].to_string().contains("no longer exists"));
    assert_eq!(report.restored, None);
    assert!(!app_dir.join("2_").exists());
}

#[tokio::test]
async fn non_symlink_current_is_left_alone() {
    let sandbox = Sandbox::new();
    let app_dir = sandbox.app_dir("shop");
    release(&sandbox, "1_");
    fs::write(app_dir.join("current"), "hands off").unwrap();

    let ctx = context(&sandbox, "2", Some("1_"));

    let report = rollback(&ctx).await;

    assert_eq!(report.errors.len(), 1);
    assert_eq!(
        fs::read_to_string(app_dir.join("current")).unwrap(),
        "hands off"
    );
}
