use std::path::{Path, PathBuf};

/// Resolve the release directory this run deploys.
///
/// Priority:
/// 1. `--deploy-path` flag / `RELAUNCH_DEPLOY_PATH` env var (passed in as `explicit`)
/// 2. The current directory
///
/// The result is canonicalized so that a path reached through the `current`
/// symlink resolves to the release it points at.
pub fn resolve_deploy_path(explicit: Option<&Path>) -> anyhow::Result<PathBuf> {
    let path = match explicit {
        Some(p) => p.to_path_buf(),
        None => std::env::current_dir()?,
    };
    std::fs::canonicalize(&path)
        .map_err(|e| anyhow::anyhow!("cannot resolve deploy path {}: {e}", path.display()))
}

/// `$PWD` as the invoking shell sees it, symlinks intact.
pub fn shell_pwd() -> Option<PathBuf> {
    std::env::var_os("PWD").map(PathBuf::from)
}
