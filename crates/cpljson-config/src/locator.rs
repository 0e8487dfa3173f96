//! Discovers the project's configuration root by walking up the directory
//! tree.
//!
//! A directory belongs to a project when it holds a `.codeplane` marker file
//! or a `.codeplane/` directory containing `config.yaml`. The search starts
//! at the supplied directory and stops at the filesystem root. Symlinked
//! ancestors are followed exactly as the operating system resolves them.
//!
//! A bare `.codeplane/` directory without `config.yaml` is deliberately not a
//! match, even though opening it for reading succeeds on some POSIX systems.
//! Such directories are skipped and the walk continues with the parent.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::defaults::{CONFIG_FILE, MARKER_NAME};

/// Absolute path of a project's configuration root (`<project>/.codeplane`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigRoot {
    path: PathBuf,
}

impl ConfigRoot {
    /// Wraps an existing configuration directory.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path to the configuration root.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    /// Directory containing the configuration root.
    #[must_use]
    pub fn project_dir(&self) -> Option<&Path> {
        self.path.parent()
    }
}

/// Errors raised while locating the configuration root.
#[derive(Debug, Error)]
pub enum LocateError {
    /// No ancestor of the start directory carries a project marker.
    #[error("not inside a recognized project (no .codeplane found above {})", .start.display())]
    NotFound {
        /// Directory where the search began.
        start: PathBuf,
    },
    /// The start directory could not be made absolute.
    #[error("failed to resolve start directory {}: {source}", .start.display())]
    StartDirectory {
        /// Directory that could not be resolved.
        start: PathBuf,
        /// Underlying IO failure.
        #[source]
        source: io::Error,
    },
}

/// Walks upward from `start_dir` looking for a configuration root.
///
/// Relative start directories are anchored at the current working directory
/// without resolving symlinks.
pub fn locate(start_dir: &Path) -> Result<ConfigRoot, LocateError> {
    let start = std::path::absolute(start_dir).map_err(|source| LocateError::StartDirectory {
        start: start_dir.to_path_buf(),
        source,
    })?;

    for dir in start.ancestors() {
        if let Some(root) = probe(dir) {
            debug!(root = %root.path().display(), "located configuration root");
            return Ok(root);
        }
    }

    Err(LocateError::NotFound { start })
}

fn probe(dir: &Path) -> Option<ConfigRoot> {
    let marker = dir.join(MARKER_NAME);
    if marker.is_file() || marker.join(CONFIG_FILE).is_file() {
        return Some(ConfigRoot::new(marker));
    }
    None
}
