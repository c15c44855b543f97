// ABOUTME: Validated application name used as the per-app deploy directory.
// ABOUTME: Rejects names that would escape or collide inside the deploy dir.

use std::fmt;
use thiserror::Error;

/// Name of the link that marks the live release inside an app directory.
pub const CURRENT_LINK: &str = "current";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AppNameError {
    #[error("app name cannot be empty")]
    Empty,

    #[error("app name cannot be '.' or '..'")]
    Relative,

    #[error("app name cannot be '{CURRENT_LINK}'")]
    Reserved,

    #[error("invalid character in app name: '{0}'")]
    InvalidChar(char),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AppName(String);

impl AppName {
    pub fn new(value: &str) -> Result<Self, AppNameError> {
        if value.is_empty() {
            return Err(AppNameError::Empty);
        }

        if value == "." || value == ".." {
            return Err(AppNameError::Relative);
        }

        if value == CURRENT_LINK {
            return Err(AppNameError::Reserved);
        }

        for c in value.chars() {
            if c == '/' || c == '\\' || c == '\0' || c.is_whitespace() {
                return Err(AppNameError::InvalidChar(c));
            }
        }

        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AppName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<std::path::Path> for AppName {
    fn as_ref(&self) -> &std::path::Path {
        std::path::Path::new(&self.0)
    }
}
