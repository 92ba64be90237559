//! Start/restart orchestration.
//!
//! [`Orchestrator::run`] performs one run end to end: pre-flight checks,
//! deployment pointer update, a supervisor snapshot, planning via
//! [`RestartPlanner`], and execution via [`PlanExecutor`]. Everything is
//! sequential; the first failure aborts the run.

pub mod action;
pub mod executor;
pub mod planner;

pub use action::{Action, Operation, PlanStep, RunFlags};
pub use executor::PlanExecutor;
pub use planner::{Decision, Plan, RestartPlanner};

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::checks;
use crate::config::{Config, WarnLevel};
use crate::control::{ControlChannel, HostSignals};
use crate::deployment::DeploymentPointer;
use crate::error::{RelaunchError, Result};
use crate::observed::ObservedState;
use crate::supervisor::SupervisorClient;
use crate::topology::ServiceTopology;

// ---------------------------------------------------------------------------
// RunOptions / RunReport
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub requested: Action,
    pub flags: RunFlags,
    /// Release directory this run deploys; also the cwd for check commands.
    pub deploy_path: PathBuf,
    /// `$PWD` of the invoking shell, used for the stale-symlink warning.
    pub shell_pwd: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Started,
    Restarted,
    AlreadyStarted,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub requested: Action,
    pub action: Action,
    pub flags: RunFlags,
    pub outcome: Outcome,
    pub steps: Vec<PlanStep>,
    pub operations: Vec<Operation>,
    pub pointer_changed: bool,
    /// Symlink the invoking shell entered through, when that link just moved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stale_symlink: Option<PathBuf>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunReport {
    pub fn message(&self) -> String {
        match self.outcome {
            Outcome::AlreadyStarted => "Application server already started; nothing to do!".to_string(),
            Outcome::Started | Outcome::Restarted => {
                format!("Application server {}!", self.action.past_tense())
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

pub struct Orchestrator<'a> {
    config: &'a Config,
    supervisor: &'a mut dyn SupervisorClient,
    host: &'a mut dyn HostSignals,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        config: &'a Config,
        supervisor: &'a mut dyn SupervisorClient,
        host: &'a mut dyn HostSignals,
    ) -> Self {
        Self {
            config,
            supervisor,
            host,
        }
    }

    pub fn run(&mut self, opts: &RunOptions) -> Result<RunReport> {
        let started_at = Utc::now();
        self.preflight(opts)?;

        let pointer = self.config.deployments_dir.as_ref().map(DeploymentPointer::new);
        let pointer_changed = match &pointer {
            Some(pointer) => pointer.update(&opts.deploy_path)?,
            None => false,
        };

        let topology = ServiceTopology::from_config(self.config);
        let observed = ObservedState::capture(&*self.supervisor, &topology.candidate_patterns())?;

        let control = self
            .config
            .web
            .control_file
            .as_ref()
            .map(ControlChannel::new);
        let rolling_reload = self.config.rolling_restart_configured()
            && control.as_ref().is_some_and(ControlChannel::exists);

        let planner = RestartPlanner::new(&topology, rolling_reload);
        let (action, outcome, steps, operations) =
            match planner.plan(&observed, opts.requested, &opts.flags) {
                Decision::AlreadyStarted => {
                    info!("Application server already started; nothing to do!");
                    (Action::Start, Outcome::AlreadyStarted, Vec::new(), Vec::new())
                }
                Decision::Run(plan) => {
                    info!(
                        "{} plan: {}",
                        plan.action,
                        plan.steps
                            .iter()
                            .map(ToString::to_string)
                            .collect::<Vec<_>>()
                            .join(" -> ")
                    );
                    let operations = PlanExecutor::new(&mut *self.supervisor, &mut *self.host, control)
                        .execute(&plan.steps)?;
                    info!("Done!");
                    let outcome = match plan.action {
                        Action::Start => Outcome::Started,
                        Action::Restart => Outcome::Restarted,
                    };
                    (plan.action, outcome, plan.steps, operations)
                }
            };

        let stale_symlink = match (&pointer, &opts.shell_pwd) {
            (Some(pointer), Some(pwd)) if pointer_changed => pointer.entered_through(pwd),
            _ => None,
        };

        Ok(RunReport {
            requested: opts.requested,
            action,
            flags: opts.flags,
            outcome,
            steps,
            operations,
            pointer_changed,
            stale_symlink,
            started_at,
            finished_at: Utc::now(),
        })
    }

    /// Everything that must pass before a single unit is touched.
    fn preflight(&self, opts: &RunOptions) -> Result<()> {
        let mut errors = Vec::new();
        for warning in self.config.validate() {
            match warning.level {
                WarnLevel::Warning => warn!("config: {}", warning.message),
                WarnLevel::Error => errors.push(warning.message),
            }
        }
        if !errors.is_empty() {
            return Err(RelaunchError::InvalidConfig(errors.join("; ")));
        }

        if let Some(user) = &self.config.required_user {
            checks::verify_user(user)?;
        }

        if !opts.flags.skip_checks {
            checks::run_checks(&self.config.checks, &opts.deploy_path)?;
        }

        if opts.flags.fill_cache {
            match &self.config.fill_cache {
                Some(command) => checks::fill_cache(command, &opts.deploy_path)?,
                None => warn!("--fill-cache given but no fill_cache command is configured"),
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
