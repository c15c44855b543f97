// ABOUTME: Test support utilities.
// ABOUTME: Provides a sandboxed deploy dir and release archive builders.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Once;

use capstan::deploy::{DeployRequest, DeployTarget};
use capstan::types::AppName;
use tempfile::TempDir;

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for tests. Safe to call multiple times.
#[allow(dead_code)]
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;
        let filter =
            EnvFilter::from_default_env().add_directive("capstan=debug".parse().unwrap());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// A throwaway deploy root with room for archives and scratch space.
pub struct Sandbox {
    _root: TempDir,
    pub base: PathBuf,
    pub deploy_dir: PathBuf,
    pub scratch: PathBuf,
}

// Each test binary only uses some of these helpers, so allow dead_code.
#[allow(dead_code)]
impl Sandbox {
    pub fn new() -> Self {
        let root = TempDir::new().unwrap();
        // Canonical so paths compare equal to what `current` resolves to.
        let base = root.path().canonicalize().unwrap();
        let deploy_dir = base.join("srv");
        let scratch = base.join("scratch");
        fs::create_dir_all(&deploy_dir).unwrap();
        fs::create_dir_all(&scratch).unwrap();
        fs::create_dir_all(base.join("archives")).unwrap();

        Self {
            _root: root,
            base,
            deploy_dir,
            scratch,
        }
    }

    pub fn target(&self, app: &str) -> DeployTarget {
        DeployTarget::new(AppName::new(app).unwrap(), &self.deploy_dir).unwrap()
    }

    pub fn app_dir(&self, app: &str) -> PathBuf {
        self.deploy_dir.join(app)
    }

    /// Build a tar archive holding `files` (relative path, contents).
    pub fn archive(&self, name: &str, files: &[(&str, &str)]) -> PathBuf {
        let source = self.base.join("sources").join(name);
        fs::create_dir_all(&source).unwrap();
        for (path, contents) in files {
            let path = source.join(path);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, contents).unwrap();
        }

        let archive = self.base.join("archives").join(format!("{name}.tar"));
        let file = fs::File::create(&archive).unwrap();
        let mut builder = tar::Builder::new(file);
        builder.append_dir_all(".", &source).unwrap();
        builder.finish().unwrap();
        archive
    }

    /// A file that `tar` cannot read.
    pub fn corrupt_archive(&self, name: &str) -> PathBuf {
        let archive = self.base.join("archives").join(format!("{name}.tar"));
        fs::write(&archive, "this is not a tar archive\n".repeat(64)).unwrap();
        archive
    }

    pub fn request(&self, app: &str, archive: &Path, timestamp: &str) -> DeployRequest {
        DeployRequest::new(self.target(app), archive, timestamp).scratch_root(&self.scratch)
    }
}

/// Read a file relative to `dir` as a string.
#[allow(dead_code)]
pub fn read(dir: &Path, relative: &str) -> String {
    fs::read_to_string(dir.join(relative)).unwrap()
}

/// Where `current` in `app_dir` resolves to, if it exists.
#[allow(dead_code)]
pub fn current_target(app_dir: &Path) -> Option<PathBuf> {
    let link = app_dir.join("current");
    fs::symlink_metadata(&link).ok()?;
    Some(link.canonicalize().unwrap())
}

/// Names of hidden entries (scratch or staging leftovers) in `dir`.
#[allow(dead_code)]
pub fn hidden_entries(dir: &Path) -> Vec<String> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    entries
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|name| name.starts_with('.'))
        .collect()
}
