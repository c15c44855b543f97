// ABOUTME: Where an application lives on a host and the releases inside it.
// ABOUTME: Derives app dir, current link and release paths from the deploy dir.

use std::path::{Path, PathBuf};

use crate::types::{AppName, CURRENT_LINK, VersionStamp};

use super::DeployError;

/// Identifies where an application is deployed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployTarget {
    app: AppName,
    deploy_dir: PathBuf,
}

impl DeployTarget {
    /// Create a target. The deploy dir must be absolute.
    pub fn new(app: AppName, deploy_dir: impl Into<PathBuf>) -> Result<Self, DeployError> {
        let deploy_dir = deploy_dir.into();
        if !deploy_dir.is_absolute() {
            return Err(DeployError::invalid_target(
                &deploy_dir,
                "deploy_dir is not an absolute path",
            ));
        }
        Ok(Self { app, deploy_dir })
    }

    pub fn app(&self) -> &AppName {
        &self.app
    }

    pub fn deploy_dir(&self) -> &Path {
        &self.deploy_dir
    }

    /// `deploy_dir/app`
    pub fn app_dir(&self) -> PathBuf {
        self.deploy_dir.join(&self.app)
    }

    /// `deploy_dir/app/current`
    pub fn current_link(&self) -> PathBuf {
        self.app_dir().join(CURRENT_LINK)
    }

    /// The release this target would hold for `stamp`.
    pub fn release(&self, stamp: VersionStamp) -> Release {
        let path = self.app_dir().join(&stamp);
        Release {
            stamp,
            path,
            installed: false,
        }
    }
}

/// One versioned deployment payload under an app directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Release {
    pub stamp: VersionStamp,
    pub path: PathBuf,
    /// Set once this run has written a fresh copy at `path`.
    pub installed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app() -> AppName {
        AppName::new("shop").unwrap()
    }

    #[test]
    fn relative_deploy_dir_is_rejected() {
        let err = DeployTarget::new(app(), "srv/apps").unwrap_err();
        assert_eq!(err.kind(), super::super::DeployErrorKind::InvalidDeployTarget);
    }

    #[test]
    fn paths_derive_from_deploy_dir() {
        let target = DeployTarget::new(app(), "/srv/apps").unwrap();
        assert_eq!(target.app_dir(), PathBuf::from("/srv/apps/shop"));
        assert_eq!(target.current_link(), PathBuf::from("/srv/apps/shop/current"));

        let release = target.release(VersionStamp::compute("20240101", Some("abc"), false));
        assert_eq!(release.path, PathBuf::from("/srv/apps/shop/20240101_abc"));
        assert!(!release.installed);
    }
}
