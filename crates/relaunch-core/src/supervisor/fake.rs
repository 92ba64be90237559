//! In-memory supervisor and host doubles for tests.

use std::collections::BTreeMap;
use std::path::PathBuf;

use super::{parse_status, ProcessInfo, ProcessState, SupervisorClient};
use crate::control::{Companion, ControlChannel, HostSignals};
use crate::error::{RelaunchError, Result};
use crate::unit::pattern_matches;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Start(Vec<String>),
    Stop(Vec<String>),
    Restart(String),
}

#[derive(Debug, Default)]
pub struct FakeSupervisor {
    pub processes: BTreeMap<String, ProcessState>,
    pub calls: Vec<Call>,
    /// Any start/stop/restart naming this unit fails.
    pub fail_on: Option<String>,
}

impl FakeSupervisor {
    pub fn new<I, S>(existing: I, running: &[&str]) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut processes = BTreeMap::new();
        for name in existing {
            processes.insert(name.into(), ProcessState::Stopped);
        }
        for name in running {
            processes.insert(name.to_string(), ProcessState::Running);
        }
        Self {
            processes,
            ..Self::default()
        }
    }

    pub fn from_status(output: &str) -> Self {
        let processes = parse_status(output)
            .unwrap()
            .into_iter()
            .map(|p| (p.name, p.state))
            .collect();
        Self {
            processes,
            ..Self::default()
        }
    }

    pub fn is_running(&self, name: &str) -> bool {
        self.processes
            .get(name)
            .is_some_and(|state| state.is_running())
    }

    fn expand(&self, pattern: &str) -> Result<Vec<String>> {
        if self.fail_on.as_deref() == Some(pattern) {
            return Err(RelaunchError::SupervisorFailed {
                command: format!("fake {pattern}"),
                code: 2,
                output: format!("{pattern}: ERROR (spawn error)"),
            });
        }
        let names: Vec<String> = self
            .processes
            .keys()
            .filter(|name| pattern_matches(pattern, name))
            .cloned()
            .collect();
        if names.is_empty() {
            return Err(RelaunchError::SupervisorFailed {
                command: format!("fake {pattern}"),
                code: 1,
                output: format!("{pattern}: ERROR (no such process)"),
            });
        }
        Ok(names)
    }

    fn set_state(&mut self, patterns: &[String], state: ProcessState) -> Result<()> {
        let mut names = Vec::new();
        for pattern in patterns {
            names.extend(self.expand(pattern)?);
        }
        for name in names {
            self.processes.insert(name, state);
        }
        Ok(())
    }
}

impl SupervisorClient for FakeSupervisor {
    fn processes(&self) -> Result<Vec<ProcessInfo>> {
        Ok(self
            .processes
            .iter()
            .map(|(name, state)| ProcessInfo {
                name: name.clone(),
                state: *state,
            })
            .collect())
    }

    fn start(&mut self, names: &[String]) -> Result<()> {
        self.calls.push(Call::Start(names.to_vec()));
        self.set_state(names, ProcessState::Running)
    }

    fn stop(&mut self, names: &[String]) -> Result<()> {
        self.calls.push(Call::Stop(names.to_vec()));
        self.set_state(names, ProcessState::Stopped)
    }

    fn restart(&mut self, name: &str) -> Result<()> {
        self.calls.push(Call::Restart(name.to_string()));
        self.set_state(&[name.to_string()], ProcessState::Running)
    }
}

#[derive(Debug, Default)]
pub struct FakeHost {
    pub reloads: Vec<PathBuf>,
    pub bounces: Vec<String>,
}

impl HostSignals for FakeHost {
    fn chain_reload(&mut self, channel: &ControlChannel) -> Result<()> {
        self.reloads.push(channel.path().to_path_buf());
        Ok(())
    }

    fn bounce(&mut self, companion: &Companion) -> Result<()> {
        self.bounces.push(companion.process.clone());
        Ok(())
    }
}
