//! Process-supervisor control surface.
//!
//! [`SupervisorClient`] is the narrow interface the planner and executor see.
//! [`SupervisorCtl`] implements it by shelling out to `supervisorctl`.
//!
//! # Exit codes of `supervisorctl status <name>`
//! - `0`: running
//! - `3`: not running
//! - `4`: no such process

#[cfg(test)]
pub mod fake;

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::SupervisorConfig;
use crate::error::{RelaunchError, Result};
use crate::unit::matches_any;

pub const STATUS_RUNNING: i32 = 0;
pub const STATUS_NOT_RUNNING: i32 = 3;
pub const STATUS_NO_SUCH_PROCESS: i32 = 4;

// ---------------------------------------------------------------------------
// ProcessState / ProcessInfo
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessState {
    Stopped,
    Starting,
    Running,
    Backoff,
    Stopping,
    Exited,
    Fatal,
    Unknown,
}

impl ProcessState {
    pub fn parse(s: &str) -> Self {
        match s {
            "STOPPED" => ProcessState::Stopped,
            "STARTING" => ProcessState::Starting,
            "RUNNING" => ProcessState::Running,
            "BACKOFF" => ProcessState::Backoff,
            "STOPPING" => ProcessState::Stopping,
            "EXITED" => ProcessState::Exited,
            "FATAL" => ProcessState::Fatal,
            _ => ProcessState::Unknown,
        }
    }

    /// Matches supervisord's own notion of a started process: starting it
    /// again is refused as "already started".
    pub fn is_running(self) -> bool {
        matches!(
            self,
            ProcessState::Running | ProcessState::Starting | ProcessState::Backoff
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessInfo {
    /// `group:program`, or just `program` when the two are the same.
    pub name: String,
    pub state: ProcessState,
}

// ---------------------------------------------------------------------------
// SupervisorClient
// ---------------------------------------------------------------------------

pub trait SupervisorClient {
    /// Every process the supervisor currently knows about.
    fn processes(&self) -> Result<Vec<ProcessInfo>>;

    fn start(&mut self, names: &[String]) -> Result<()>;

    fn stop(&mut self, names: &[String]) -> Result<()>;

    fn restart(&mut self, name: &str) -> Result<()>;

    fn list_existing(&self, patterns: &[String]) -> Result<BTreeSet<String>> {
        Ok(self
            .processes()?
            .into_iter()
            .filter(|p| matches_any(patterns, &p.name))
            .map(|p| p.name)
            .collect())
    }

    fn list_running(&self, patterns: &[String]) -> Result<BTreeSet<String>> {
        Ok(self
            .processes()?
            .into_iter()
            .filter(|p| p.state.is_running() && matches_any(patterns, &p.name))
            .map(|p| p.name)
            .collect())
    }

    /// Same contract as the exit code of `supervisorctl status <name>`.
    fn status(&self, name: &str) -> Result<i32> {
        let patterns = [name.to_string()];
        let matching: Vec<ProcessInfo> = self
            .processes()?
            .into_iter()
            .filter(|p| matches_any(&patterns, &p.name))
            .collect();
        Ok(if matching.is_empty() {
            STATUS_NO_SUCH_PROCESS
        } else if matching.iter().all(|p| p.state.is_running()) {
            STATUS_RUNNING
        } else {
            STATUS_NOT_RUNNING
        })
    }
}

// ---------------------------------------------------------------------------
// Status parsing
// ---------------------------------------------------------------------------

static STATUS_RE: OnceLock<Regex> = OnceLock::new();

fn status_re() -> &'static Regex {
    STATUS_RE.get_or_init(|| {
        Regex::new(r"^(?P<name>\S+)\s+(?P<state>[A-Z]+)(?:\s+.*)?$")
            .expect("status line regex is valid")
    })
}

/// Parse `supervisorctl status` output into process entries. Blank lines
/// are ignored; anything else that does not look like a status line is an error.
pub fn parse_status(output: &str) -> Result<Vec<ProcessInfo>> {
    let mut processes = Vec::new();
    for line in output.lines() {
        let line = line.trim_end();
        if line.trim().is_empty() {
            continue;
        }
        let caps = status_re()
            .captures(line)
            .ok_or_else(|| RelaunchError::StatusParse(line.to_string()))?;
        processes.push(ProcessInfo {
            name: caps["name"].to_string(),
            state: ProcessState::parse(&caps["state"]),
        });
    }
    Ok(processes)
}

// ---------------------------------------------------------------------------
// SupervisorCtl
// ---------------------------------------------------------------------------

/// Drives supervisord through its `supervisorctl` command-line client.
#[derive(Debug, Clone)]
pub struct SupervisorCtl {
    program: PathBuf,
    args: Vec<String>,
}

impl SupervisorCtl {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Resolve the configured control binary through `PATH`.
    pub fn from_config(config: &SupervisorConfig) -> Result<Self> {
        let program = which::which(&config.command)
            .map_err(|_| RelaunchError::SupervisorNotFound(config.command.clone()))?;
        Ok(Self::new(program, config.args.clone()))
    }

    fn output(&self, subcommand: &str, names: &[&str]) -> Result<Output> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg(subcommand)
            .args(names)
            .stdin(Stdio::null());
        debug!(
            "{} {} {}",
            self.program.display(),
            subcommand,
            names.join(" ")
        );
        Ok(cmd.output()?)
    }

    fn check(&self, subcommand: &str, names: &[&str]) -> Result<()> {
        let output = self.output(subcommand, names)?;
        if output.status.success() {
            return Ok(());
        }
        Err(self.failure(subcommand, names, &output))
    }

    fn failure(&self, subcommand: &str, names: &[&str], output: &Output) -> RelaunchError {
        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        RelaunchError::SupervisorFailed {
            command: format!("{} {} {}", self.program.display(), subcommand, names.join(" ")),
            code: output.status.code().unwrap_or(-1),
            output: text.trim().chars().take(500).collect(),
        }
    }
}

impl SupervisorClient for SupervisorCtl {
    fn processes(&self) -> Result<Vec<ProcessInfo>> {
        let output = self.output("status", &[])?;
        // Exit 3 only means some process is not running.
        match output.status.code() {
            Some(0) | Some(STATUS_NOT_RUNNING) => {
                parse_status(&String::from_utf8_lossy(&output.stdout))
            }
            _ => Err(self.failure("status", &[], &output)),
        }
    }

    fn start(&mut self, names: &[String]) -> Result<()> {
        if names.is_empty() {
            return Ok(());
        }
        let names: Vec<&str> = names.iter().map(String::as_str).collect();
        self.check("start", &names)
    }

    fn stop(&mut self, names: &[String]) -> Result<()> {
        if names.is_empty() {
            return Ok(());
        }
        let names: Vec<&str> = names.iter().map(String::as_str).collect();
        self.check("stop", &names)
    }

    fn restart(&mut self, name: &str) -> Result<()> {
        self.check("restart", &[name])
    }

    fn status(&self, name: &str) -> Result<i32> {
        let output = self.output("status", &[name])?;
        Ok(output.status.code().unwrap_or(-1))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::fake::FakeSupervisor;
    use super::*;

    const SAMPLE: &str = "\
app-web                              RUNNING   pid 101, uptime 1:02:03
app-workers:deliver_emails           RUNNING   pid 102, uptime 1:02:03
app-workers:embed_links              STOPPED   Oct 17 09:00 AM
push:push-port-9800                  BACKOFF   Exited too quickly (process log may have details)
camo                                 FATAL     Exited too quickly
";

    #[test]
    fn parse_status_reads_every_line() {
        let processes = parse_status(SAMPLE).unwrap();
        assert_eq!(processes.len(), 5);
        assert_eq!(processes[0].name, "app-web");
        assert_eq!(processes[0].state, ProcessState::Running);
        assert_eq!(processes[2].state, ProcessState::Stopped);
        assert_eq!(processes[3].state, ProcessState::Backoff);
        assert_eq!(processes[4].state, ProcessState::Fatal);
    }

    #[test]
    fn parse_status_skips_blank_lines() {
        let processes = parse_status("\n\napp-web RUNNING\n\n").unwrap();
        assert_eq!(processes.len(), 1);
    }

    #[test]
    fn parse_status_rejects_garbage() {
        let err = parse_status("unix:///var/run/supervisor.sock no such file").unwrap_err();
        assert!(matches!(err, RelaunchError::StatusParse(_)));
    }

    #[test]
    fn running_states_match_supervisord() {
        assert!(ProcessState::Running.is_running());
        assert!(ProcessState::Starting.is_running());
        assert!(ProcessState::Backoff.is_running());
        assert!(!ProcessState::Stopped.is_running());
        assert!(!ProcessState::Fatal.is_running());
        assert_eq!(ProcessState::parse("WEIRD"), ProcessState::Unknown);
    }

    #[test]
    fn default_listing_uses_patterns() {
        let sup = FakeSupervisor::from_status(SAMPLE);
        let workers = sup.list_existing(&["app-workers:*".to_string()]).unwrap();
        assert_eq!(workers.len(), 2);
        let running = sup
            .list_running(&["app-workers:*".to_string(), "push:*".to_string()])
            .unwrap();
        assert_eq!(
            running.into_iter().collect::<Vec<_>>(),
            ["app-workers:deliver_emails", "push:push-port-9800"]
        );
    }

    #[test]
    fn default_status_codes() {
        let sup = FakeSupervisor::from_status(SAMPLE);
        assert_eq!(sup.status("app-web").unwrap(), STATUS_RUNNING);
        assert_eq!(sup.status("app-workers:*").unwrap(), STATUS_NOT_RUNNING);
        assert_eq!(sup.status("nope").unwrap(), STATUS_NO_SUCH_PROCESS);
    }

    #[test]
    fn from_config_missing_binary() {
        let config = SupervisorConfig {
            command: "definitely-not-a-supervisorctl-binary".to_string(),
            args: Vec::new(),
        };
        let err = SupervisorCtl::from_config(&config).unwrap_err();
        assert!(matches!(err, RelaunchError::SupervisorNotFound(_)));
    }
}
