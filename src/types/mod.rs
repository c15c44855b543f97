// ABOUTME: Validated domain types for deploy targets and releases.
// ABOUTME: Keeps path-forming names and release identifiers well-formed.

mod app_name;
mod version_stamp;

pub use app_name::{AppName, AppNameError, CURRENT_LINK};
pub use version_stamp::VersionStamp;
