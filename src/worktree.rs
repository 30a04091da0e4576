use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};

/// Inline references only work when the artifact is reachable from the
/// notebook's working tree; anything outside it cannot be served.
#[derive(Debug, Clone)]
pub struct WorkTree {
    root: PathBuf,
}

impl WorkTree {
    pub fn current() -> Result<Self> {
        let cwd = env::current_dir().context("failed to determine the working directory")?;
        Self::new(cwd)
    }

    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = fs::canonicalize(root.as_ref()).with_context(|| {
            format!(
                "failed to canonicalize working tree root: {}",
                root.as_ref().display()
            )
        })?;
        Ok(Self { root })
    }

    /// Rewrites an artifact path relative to the tree root. Symlinks are
    /// resolved first, so a link pointing out of the tree is rejected too.
    pub fn relativize<P: AsRef<Path>>(&self, target: P) -> Result<PathBuf> {
        let canonical = fs::canonicalize(target.as_ref()).with_context(|| {
            format!("failed to resolve artifact path: {}", target.as_ref().display())
        })?;

        let relative = canonical.strip_prefix(&self.root).map_err(|_| {
            anyhow!(
                "artifact {} lies outside the working tree {}",
                canonical.display(),
                self.root.display()
            )
        })?;
        Ok(relative.to_path_buf())
    }
}
