//! Pre-flight commands: identity check, configured checks, cache warming.

use std::path::Path;
use std::process::{Command, Stdio};

use tracing::{debug, info};

use crate::error::{RelaunchError, Result};

/// Login name of the effective user, as reported by `id -un`.
pub fn current_user() -> Result<String> {
    let output = Command::new("id")
        .arg("-un")
        .stdin(Stdio::null())
        .output()?;
    if !output.status.success() {
        return Err(RelaunchError::CommandFailed {
            command: "id -un".to_string(),
            code: output.status.code().unwrap_or(-1),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

pub fn verify_user(expected: &str) -> Result<()> {
    let actual = current_user()?;
    if actual != expected {
        return Err(RelaunchError::WrongUser {
            expected: expected.to_string(),
            actual,
        });
    }
    Ok(())
}

/// Run `command` through `sh -c` in `cwd` and return its exit code.
/// Child output goes to stderr so stdout stays free for the run report.
pub fn run_shell(command: &str, cwd: &Path) -> Result<i32> {
    debug!("sh -c {command:?} (in {})", cwd.display());
    let status = Command::new("sh")
        .arg("-c")
        .arg(command)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(std::io::stderr())
        .status()?;
    Ok(status.code().unwrap_or(-1))
}

/// Run every configured check; the first failure aborts.
pub fn run_checks(checks: &[String], cwd: &Path) -> Result<()> {
    if checks.is_empty() {
        return Ok(());
    }
    info!("Running syntax and database checks");
    for check in checks {
        let code = run_shell(check, cwd)?;
        if code != 0 {
            return Err(RelaunchError::CheckFailed {
                command: check.clone(),
                code,
            });
        }
    }
    Ok(())
}

pub fn fill_cache(command: &str, cwd: &Path) -> Result<()> {
    info!("Filling caches");
    let code = run_shell(command, cwd)?;
    if code != 0 {
        return Err(RelaunchError::CommandFailed {
            command: command.to_string(),
            code,
        });
    }
    Ok(())
}
