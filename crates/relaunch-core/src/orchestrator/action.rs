//! Data model shared by the planner and executor.
//!
//! The planner emits [`PlanStep`]s; the executor resolves each one against a
//! fresh look at the supervisor into exactly one [`Operation`] and performs it.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::control::Companion;
use crate::unit::ServiceUnit;

// ---------------------------------------------------------------------------
// Action
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Start,
    Restart,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Start => "start",
            Action::Restart => "restart",
        }
    }

    pub fn past_tense(self) -> &'static str {
        match self {
            Action::Start => "started",
            Action::Restart => "restarted",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "start" => Ok(Action::Start),
            "restart" => Ok(Action::Restart),
            _ => Err(format!("unknown action '{s}': expected start or restart")),
        }
    }
}

// ---------------------------------------------------------------------------
// RunFlags
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunFlags {
    /// Bulk-stop workers up front and bulk-start them at the end.
    pub less_graceful: bool,
    /// Leave the push shards alone.
    pub skip_push: bool,
    pub skip_checks: bool,
    pub fill_cache: bool,
}

// ---------------------------------------------------------------------------
// PlanStep
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlanStep {
    /// Bulk start of units already known to be down.
    Start { units: Vec<String> },
    /// Bulk stop.
    Stop { units: Vec<String> },
    /// Re-check the unit, then restart it, start it, or leave it alone.
    RestartOrStart { unit: ServiceUnit, verb: Action },
    /// Chain-reload the web tier if it is up, otherwise start it.
    ReloadOrStart { unit: ServiceUnit },
    /// Re-query which of `units` are down and start exactly those.
    StartStopped { units: Vec<String> },
    /// Kill the SSO companion so it is respawned against the new code.
    Bounce { companion: Companion },
}

impl fmt::Display for PlanStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanStep::Start { units } => write!(f, "start({})", units.join(", ")),
            PlanStep::Stop { units } => write!(f, "stop({})", units.join(", ")),
            PlanStep::RestartOrStart {
                unit,
                verb: Action::Restart,
            } => write!(f, "restart-or-start({unit})"),
            PlanStep::RestartOrStart {
                unit,
                verb: Action::Start,
            } => write!(f, "start-unless-running({unit})"),
            PlanStep::ReloadOrStart { unit } => write!(f, "reload-or-start({unit})"),
            PlanStep::StartStopped { units } => write!(f, "start-stopped({})", units.join(", ")),
            PlanStep::Bounce { companion } => write!(f, "bounce({})", companion.process),
        }
    }
}

// ---------------------------------------------------------------------------
// Operation
// ---------------------------------------------------------------------------

/// A resolved call against the supervisor or the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Operation {
    Start { units: Vec<String> },
    Stop { units: Vec<String> },
    Restart { unit: String },
    /// Reload byte written to the web tier's control channel.
    Signal { unit: String },
    Bounce { companion: Companion },
    /// Nothing to do; never performed and never reported as executed.
    Skip { unit: String },
}

impl Operation {
    pub fn start(unit: impl Into<String>) -> Self {
        Operation::Start {
            units: vec![unit.into()],
        }
    }

    pub fn restart(unit: impl Into<String>) -> Self {
        Operation::Restart { unit: unit.into() }
    }

    pub fn is_skip(&self) -> bool {
        matches!(self, Operation::Skip { .. })
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Start { units } => write!(f, "start {}", units.join(" ")),
            Operation::Stop { units } => write!(f, "stop {}", units.join(" ")),
            Operation::Restart { unit } => write!(f, "restart {unit}"),
            Operation::Signal { unit } => write!(f, "reload {unit}"),
            Operation::Bounce { companion } => write!(f, "bounce {}", companion.process),
            Operation::Skip { unit } => write!(f, "skip {unit}"),
        }
    }
}
