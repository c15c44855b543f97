// ABOUTME: Status command implementation.
// ABOUTME: Shows which release `current` serves and the releases kept on disk.

use std::path::PathBuf;

use serde::Serialize;

use capstan::config::Config;
use capstan::deploy::{ReleaseEntry, list_releases};
use capstan::error::Result;
use capstan::output::Output;

#[derive(Serialize)]
struct StatusView<'a> {
    app: &'a str,
    app_dir: PathBuf,
    releases: &'a [ReleaseEntry],
}

pub async fn status(config: Config, output: Output) -> Result<()> {
    let target = config.target()?;
    let app_dir = target.app_dir();
    let releases = list_releases(&app_dir).await?;

    output.data(&StatusView {
        app: target.app().as_str(),
        app_dir: app_dir.clone(),
        releases: &releases,
    });

    output.progress(&format!("App: {}", target.app()));
    output.progress(&format!("Directory: {}", app_dir.display()));

    if releases.is_empty() {
        output.progress("No releases deployed");
        return Ok(());
    }

    output.progress(&format!("Releases: {}", releases.len()));
    for release in &releases {
        let marker = if release.live { "*" } else { " " };
        output.progress(&format!("  {marker} {}", release.stamp));
    }

    if let Some(live) = releases.iter().find(|r| r.live) {
        output.success(&format!("current -> {}", live.stamp));
    } else {
        output.success("current is not set");
    }
    Ok(())
}
