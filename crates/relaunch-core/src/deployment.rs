//! `current` / `last` deployment symlinks.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{RelaunchError, Result};

pub const CURRENT_LINK: &str = "current";
pub const LAST_LINK: &str = "last";

#[derive(Debug, Clone)]
pub struct DeploymentPointer {
    dir: PathBuf,
}

impl DeploymentPointer {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn current_link(&self) -> PathBuf {
        self.dir.join(CURRENT_LINK)
    }

    pub fn last_link(&self) -> PathBuf {
        self.dir.join(LAST_LINK)
    }

    pub fn current(&self) -> Option<PathBuf> {
        std::fs::read_link(self.current_link()).ok()
    }

    pub fn last(&self) -> Option<PathBuf> {
        std::fs::read_link(self.last_link()).ok()
    }

    /// Point `current` at `deploy_path`, moving the previous target to `last`.
    /// Returns whether anything changed.
    ///
    /// Relative link targets are resolved against the deployments directory,
    /// and `last` always receives the absolute previous release.
    pub fn update(&self, deploy_path: &Path) -> Result<bool> {
        let previous = self.current().map(|target| self.dir.join(target));
        if let Some(previous) = &previous {
            if same_release(previous, deploy_path) {
                return Ok(false);
            }
            replace_symlink(previous, &self.last_link())?;
        }
        replace_symlink(deploy_path, &self.current_link())?;
        info!(
            "Pointed {} at {}",
            self.current_link().display(),
            deploy_path.display()
        );
        Ok(true)
    }

    /// The symlink a shell sitting in `pwd` entered through, if any. Such a
    /// shell keeps seeing the old target until it changes directory again.
    pub fn entered_through(&self, pwd: &Path) -> Option<PathBuf> {
        [self.last_link(), self.current_link()]
            .into_iter()
            .find(|link| pwd.starts_with(link))
    }
}

fn same_release(a: &Path, b: &Path) -> bool {
    match (std::fs::canonicalize(a), std::fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

/// Create `link -> target` next to `link` and rename it into place, so the
/// link is never observed missing.
fn replace_symlink(target: &Path, link: &Path) -> Result<()> {
    let dir = link
        .parent()
        .ok_or_else(|| RelaunchError::Pointer(format!("{} has no parent", link.display())))?;
    let tmp = tempfile::Builder::new()
        .prefix(".relaunch-link")
        .make_in(dir, |path| std::os::unix::fs::symlink(target, path))?;
    tmp.persist(link).map_err(|e| e.error)?;
    Ok(())
}
