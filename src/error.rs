// ABOUTME: Application-wide error types for capstan.
// ABOUTME: Uses thiserror for ergonomic error handling.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::deploy::DeployError;
use crate::scm::ScmError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("file already exists: {0}")]
    AlreadyExists(PathBuf),

    #[error("configuration file not found in {0}")]
    ConfigNotFound(PathBuf),

    #[error("unknown destination: {0}")]
    UnknownDestination(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("{0}")]
    Deploy(#[from] DeployError),

    #[error("deploy failed: {0}")]
    DeployFailed(String),

    #[error("deploy did not finish within {0:?}")]
    Timeout(Duration),

    #[error("source control lookup failed: {0}")]
    Scm(#[from] ScmError),

    #[error("hook failed: {0}")]
    Hook(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
