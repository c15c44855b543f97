// ABOUTME: Lists the releases retained under an app directory.
// ABOUTME: Marks which one the `current` link serves.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tokio::fs;

use crate::types::{CURRENT_LINK, VersionStamp};

use super::error::IoResultExt;
use super::{DeployError, pointer};

/// One installed release directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReleaseEntry {
    pub stamp: VersionStamp,
    pub path: PathBuf,
    pub live: bool,
}

/// Installed releases under `app_dir`, oldest stamp first.
///
/// Skips `current` and hidden entries (scratch and staging dirs). A missing
/// app dir yields an empty list.
///
/// # Errors
///
/// Returns `CorruptCurrentPointer` if `current` is not a symlink.
pub async fn list_releases(app_dir: &Path) -> Result<Vec<ReleaseEntry>, DeployError> {
    let live = pointer::read_current(app_dir).await?;

    let mut dir = match fs::read_dir(app_dir).await {
        Ok(dir) => dir,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(DeployError::io("failed to read", app_dir, e)),
    };

    let mut releases = Vec::new();
    while let Some(entry) = dir.next_entry().await.at_path("failed to read", app_dir)? {
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if name == CURRENT_LINK || name.starts_with('.') {
            continue;
        }
        if !entry.file_type().await.is_ok_and(|t| t.is_dir()) {
            continue;
        }

        let path = entry.path();
        let is_live = match &live {
            Some(target) => fs::canonicalize(&path).await.is_ok_and(|p| &p == target),
            None => false,
        };
        if let Some(stamp) = VersionStamp::from_release_path(&path) {
            releases.push(ReleaseEntry {
                stamp,
                path,
                live: is_live,
            });
        }
    }

    releases.sort_by(|a, b| a.stamp.cmp(&b.stamp));
    Ok(releases)
}
