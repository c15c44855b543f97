// ABOUTME: Release identifiers built from a timestamp and source-control state.
// ABOUTME: Format is `<timestamp>_<suffix>`; the suffix carries hash and dirty marker.

use serde::Serialize;
use std::fmt;
use std::path::Path;

const DIRTY_MARKER: &str = "dirty";
const DIRTY_SUFFIX: &str = "_dirty";

/// Identifier of one release, also the name of its directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct VersionStamp(String);

impl VersionStamp {
    /// Build the stamp for a deploy.
    ///
    /// An empty `short_hash` counts as absent. A dirty tree without a hash
    /// yields a bare `<timestamp>_`, since there is nothing to mark.
    pub fn compute(timestamp: &str, short_hash: Option<&str>, dirty: bool) -> Self {
        let hash = short_hash.unwrap_or_default();
        let suffix = match (dirty, hash.is_empty()) {
            (true, true) => String::new(),
            (true, false) => format!("{hash}_{DIRTY_MARKER}"),
            (false, _) => hash.to_string(),
        };
        Self(format!("{timestamp}_{suffix}"))
    }

    /// Recover the stamp from a release directory path (its last component).
    pub fn from_release_path(path: &Path) -> Option<Self> {
        path.file_name()
            .and_then(|name| name.to_str())
            .map(|name| Self(name.to_string()))
    }

    /// Whether the release was built from a dirty tree.
    pub fn is_dirty(&self) -> bool {
        self.0.ends_with(DIRTY_MARKER)
    }

    /// The commit hash recorded in the stamp, if any.
    ///
    /// Read from the end (`<hash>` or `<hash>_dirty`), so timestamps that
    /// contain `_` themselves don't shift it.
    pub fn hash_segment(&self) -> Option<&str> {
        let rest = self.0.strip_suffix(DIRTY_SUFFIX).unwrap_or(&self.0);
        rest.rsplit_once('_')
            .map(|(_, hash)| hash)
            .filter(|hash| !hash.is_empty())
    }

    /// Whether the stamp names exactly one visible entry of an app directory.
    ///
    /// Rejects path separators, NUL, `.`/`..`, and a leading `.` (hidden
    /// names are reserved for scratch and staging dirs).
    pub fn is_valid_dir_name(&self) -> bool {
        let name = self.0.as_str();
        !name.is_empty()
            && !name.starts_with('.')
            && !name.contains(['/', '\0'])
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VersionStamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<Path> for VersionStamp {
    fn as_ref(&self) -> &Path {
        Path::new(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_segment_skips_timestamp() {
        let stamp = VersionStamp::compute("20240101120000", Some("abc123"), true);
        assert_eq!(stamp.hash_segment(), Some("abc123"));
        assert!(stamp.is_dirty());
    }

    #[test]
    fn bare_stamp_has_no_hash_segment() {
        let stamp = VersionStamp::compute("20240101120000", None, false);
        assert_eq!(stamp.hash_segment(), None);
        assert!(!stamp.is_dirty());
    }

    #[test]
    fn underscores_in_timestamp_do_not_shift_hash() {
        let clean = VersionStamp::compute("20240101_120000", Some("abc123"), false);
        assert_eq!(clean.hash_segment(), Some("abc123"));

        let dirty = VersionStamp::compute("20240101_120000", Some("abc123"), true);
        assert_eq!(dirty.hash_segment(), Some("abc123"));

        let bare = VersionStamp::compute("20240101_120000", None, false);
        assert_eq!(bare.hash_segment(), None);
    }

    #[test]
    fn stamps_that_escape_the_app_dir_are_invalid() {
        assert!(VersionStamp::compute("20240101120000", Some("abc123"), false).is_valid_dir_name());
        assert!(!VersionStamp::compute("../escaped", None, false).is_valid_dir_name());
        assert!(!VersionStamp::compute("2024/01/01", None, false).is_valid_dir_name());
        assert!(!VersionStamp::compute("2024", Some("a/b"), false).is_valid_dir_name());
        assert!(!VersionStamp::compute(".hidden", None, false).is_valid_dir_name());
        assert!(!VersionStamp::compute("nul\0", None, false).is_valid_dir_name());
    }

    #[test]
    fn from_release_path_uses_last_component() {
        let stamp =
            VersionStamp::from_release_path(Path::new("/srv/my_app/20240101120000_abc123"))
                .unwrap();
        assert_eq!(stamp.hash_segment(), Some("abc123"));
    }
}
