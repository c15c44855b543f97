// ABOUTME: Source-control facts (branch, short hash, dirty flag) from git.
// ABOUTME: Queried by the CLI before a deploy; the release core only consumes the result.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use serde::{Deserialize, Serialize};
use snafu::{ResultExt, Snafu, ensure};
use tokio::process::Command;

/// State of the working tree a release was built from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScmFacts {
    pub branch: String,
    pub short_hash: String,
    pub dirty: bool,
}

impl ScmFacts {
    /// Facts supplied directly by the caller, without a branch name.
    pub fn new(short_hash: impl Into<String>, dirty: bool) -> Self {
        Self {
            branch: String::new(),
            short_hash: short_hash.into(),
            dirty,
        }
    }
}

/// Failure to read git state.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ScmError {
    #[snafu(display("failed to run `git {args}` in {}: {source}", dir.display()))]
    Spawn {
        args: String,
        dir: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("`git {args}` failed in {}: {stderr}", dir.display()))]
    Git {
        args: String,
        dir: PathBuf,
        stderr: String,
    },

    #[snafu(display("could not get {what} from {}, check the path", dir.display()))]
    Missing { what: &'static str, dir: PathBuf },
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScmErrorKind {
    /// git could not be started.
    GitUnavailable,
    /// git ran but refused (usually: not a repository).
    GitFailed,
    /// git answered with an empty value.
    MissingValue,
}

impl ScmError {
    pub fn kind(&self) -> ScmErrorKind {
        match self {
            ScmError::Spawn { .. } => ScmErrorKind::GitUnavailable,
            ScmError::Git { .. } => ScmErrorKind::GitFailed,
            ScmError::Missing { .. } => ScmErrorKind::MissingValue,
        }
    }
}

/// Read branch, short hash and dirty state of the repository at `repo`.
pub async fn query(repo: &Path) -> Result<ScmFacts, ScmError> {
    let branch = git(repo, &["rev-parse", "--abbrev-ref", "HEAD"]).await?;
    ensure!(!branch.is_empty(), MissingSnafu { what: "branch", dir: repo });

    let short_hash = git(repo, &["rev-parse", "--short", "HEAD"]).await?;
    ensure!(
        !short_hash.is_empty(),
        MissingSnafu {
            what: "short hash",
            dir: repo
        }
    );

    let status = git(repo, &["status", "--porcelain"]).await?;

    let facts = ScmFacts {
        branch,
        short_hash,
        dirty: is_dirty(&status),
    };
    tracing::debug!(
        "git {}@{}{}",
        facts.branch,
        facts.short_hash,
        if facts.dirty { " (dirty)" } else { "" }
    );
    Ok(facts)
}

/// A porcelain status with any entry means uncommitted changes.
pub fn is_dirty(porcelain: &str) -> bool {
    porcelain.lines().any(|line| !line.trim().is_empty())
}

/// Run git in `repo` (as the child's working directory) and return trimmed stdout.
async fn git(repo: &Path, args: &[&str]) -> Result<String, ScmError> {
    let joined = args.join(" ");
    let output = Command::new("git")
        .args(args)
        .current_dir(repo)
        .stdin(Stdio::null())
        .output()
        .await
        .context(SpawnSnafu {
            args: joined.clone(),
            dir: repo,
        })?;

    ensure!(
        output.status.success(),
        GitSnafu {
            args: joined,
            dir: repo,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        }
    );

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn porcelain_with_entries_is_dirty() {
        assert!(is_dirty(" M src/main.rs\n?? notes.txt\n"));
    }

    #[test]
    fn empty_porcelain_is_clean() {
        assert!(!is_dirty(""));
        assert!(!is_dirty("\n"));
    }

    #[tokio::test]
    async fn non_repository_fails() {
        let temp = tempfile::tempdir().unwrap();
        let err = query(temp.path()).await.unwrap_err();
        assert!(matches!(
            err.kind(),
            ScmErrorKind::GitUnavailable | ScmErrorKind::GitFailed
        ));
    }
}
