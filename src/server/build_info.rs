//! Build metadata embedded in the server.

use std::fmt;

/// Build details for the server code. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildInfo {
    pub version: String,
    pub commit: String,
    pub branch: String,
    pub tags: String,
}

impl BuildInfo {
    pub fn new(version: &str, commit: &str, branch: &str, tags: &str) -> Self {
        Self {
            version: version.to_string(),
            commit: commit.to_string(),
            branch: branch.to_string(),
            tags: tags.to_string(),
        }
    }
}

impl Default for BuildInfo {
    fn default() -> Self {
        Self::new(env!("CARGO_PKG_VERSION"), "unknown", "unknown", "")
    }
}

impl fmt::Display for BuildInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Version {}, Commit {}, Branch {}, Tags {}",
            self.version, self.commit, self.branch, self.tags
        )
    }
}
