//! Restart decision logic.
//!
//! Pure: everything it knows comes from the topology, one [`ObservedState`]
//! snapshot, and the requested action. Unit groups are visited in ordering
//! weight order, which gives the downtime strategy:
//!
//! 1. auxiliary services found down are started
//! 2. workers are restarted one by one (or bulk-stopped when less graceful)
//! 3. push shards are restarted one port at a time, ascending
//! 4. the web tier is chain-reloaded or restarted
//! 5. the SSO companion is bounced
//! 6. workers still down are started in bulk (start / less graceful only)

use tracing::info;

use super::action::{Action, PlanStep, RunFlags};
use crate::observed::ObservedState;
use crate::topology::ServiceTopology;
use crate::unit::{ServiceUnit, UnitGroup};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub requested: Action,
    /// `requested`, or `Start` when a restart found nothing running.
    pub action: Action,
    pub steps: Vec<PlanStep>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// A start was requested and every candidate unit is already up.
    AlreadyStarted,
    Run(Plan),
}

pub struct RestartPlanner<'a> {
    topology: &'a ServiceTopology,
    /// Rolling restart configured and its control channel present.
    rolling_reload: bool,
}

impl<'a> RestartPlanner<'a> {
    pub fn new(topology: &'a ServiceTopology, rolling_reload: bool) -> Self {
        Self {
            topology,
            rolling_reload,
        }
    }

    pub fn plan(&self, observed: &ObservedState, requested: Action, flags: &RunFlags) -> Decision {
        let topo = self.topology;
        let workers = self.worker_units(observed, requested, flags);

        let action = match requested {
            Action::Restart if observed.running_matching(&topo.activity_patterns()).is_empty() => {
                info!("No processes running; starting instead");
                Action::Start
            }
            Action::Start if observed.all_running(&topo.candidate_patterns()) => {
                return Decision::AlreadyStarted;
            }
            other => other,
        };

        let mut steps = Vec::new();
        for group in topo.group_order() {
            match group {
                UnitGroup::Auxiliary => {
                    let aux: Vec<String> = observed
                        .stopped_matching(&topo.auxiliary_patterns())
                        .into_iter()
                        .collect();
                    if !aux.is_empty() {
                        steps.push(PlanStep::Start { units: aux });
                    }
                }
                UnitGroup::Worker => {
                    if flags.less_graceful {
                        steps.push(PlanStep::Stop {
                            units: workers.clone(),
                        });
                    } else if action == Action::Restart {
                        steps.extend(workers.iter().map(|name| PlanStep::RestartOrStart {
                            unit: ServiceUnit::new(name.clone(), UnitGroup::Worker),
                            verb: Action::Restart,
                        }));
                    }
                }
                UnitGroup::PushShard if flags.skip_push => {}
                UnitGroup::PushShard => {
                    steps.extend(topo.units_in(UnitGroup::PushShard).into_iter().map(|unit| {
                        PlanStep::RestartOrStart {
                            unit: unit.clone(),
                            verb: action,
                        }
                    }));
                }
                UnitGroup::WebApp => {
                    for web in topo.units_in(UnitGroup::WebApp) {
                        if action == Action::Restart && !flags.less_graceful && self.rolling_reload
                        {
                            steps.push(PlanStep::ReloadOrStart { unit: web.clone() });
                        } else {
                            steps.push(PlanStep::RestartOrStart {
                                unit: web.clone(),
                                verb: action,
                            });
                        }
                    }
                    if let Some(companion) = &topo.sso {
                        steps.push(PlanStep::Bounce {
                            companion: companion.clone(),
                        });
                    }
                }
            }
        }

        if action == Action::Start || flags.less_graceful {
            steps.push(PlanStep::StartStopped { units: workers });
        }

        Decision::Run(Plan {
            requested,
            action,
            steps,
        })
    }

    /// Worker units in the order they will be handled.
    ///
    /// Bulk modes address the group as one wildcard; a graceful restart
    /// expands it so each worker is cycled on its own. Optional workers are
    /// included only when the supervisor knows them.
    fn worker_units(
        &self,
        observed: &ObservedState,
        requested: Action,
        flags: &RunFlags,
    ) -> Vec<String> {
        let topo = self.topology;
        let mut workers: Vec<String> = if requested == Action::Start || flags.less_graceful {
            vec![topo.workers.name.clone()]
        } else {
            observed
                .existing_matching(&[topo.workers.name.as_str()])
                .into_iter()
                .collect()
        };
        workers.extend(
            topo.optional_workers
                .iter()
                .filter(|unit| observed.exists(&unit.name))
                .map(|unit| unit.name.clone()),
        );
        workers
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
