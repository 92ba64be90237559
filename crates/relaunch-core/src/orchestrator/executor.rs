//! Walks a plan in order, resolving each step against the supervisor's state
//! at the moment it runs. The first failing call aborts the run; completed
//! steps are not rolled back.

use std::collections::BTreeSet;
use std::path::PathBuf;

use tracing::info;

use super::action::{Action, Operation, PlanStep};
use crate::control::{ControlChannel, HostSignals};
use crate::error::{RelaunchError, Result};
use crate::supervisor::{SupervisorClient, STATUS_RUNNING};
use crate::unit::ServiceUnit;

pub struct PlanExecutor<'a> {
    supervisor: &'a mut dyn SupervisorClient,
    host: &'a mut dyn HostSignals,
    control: Option<ControlChannel>,
}

impl<'a> PlanExecutor<'a> {
    pub fn new(
        supervisor: &'a mut dyn SupervisorClient,
        host: &'a mut dyn HostSignals,
        control: Option<ControlChannel>,
    ) -> Self {
        Self {
            supervisor,
            host,
            control,
        }
    }

    /// Execute `steps` strictly in order. Returns the operations performed;
    /// skipped units are not included.
    pub fn execute(&mut self, steps: &[PlanStep]) -> Result<Vec<Operation>> {
        let mut performed = Vec::with_capacity(steps.len());
        for step in steps {
            let op = self.resolve(step)?;
            if op.is_skip() {
                continue;
            }
            self.perform(&op)?;
            performed.push(op);
        }
        Ok(performed)
    }

    /// Turn a step into a concrete operation using fresh supervisor state.
    pub fn resolve(&self, step: &PlanStep) -> Result<Operation> {
        match step {
            PlanStep::Start { units } => Ok(Operation::Start {
                units: units.clone(),
            }),
            PlanStep::Stop { units } => Ok(Operation::Stop {
                units: units.clone(),
            }),
            PlanStep::RestartOrStart { unit, verb } => self.restart_or_start(unit, *verb),
            PlanStep::ReloadOrStart { unit } => {
                if self.supervisor.status(&unit.name)? == STATUS_RUNNING {
                    Ok(Operation::Signal {
                        unit: unit.name.clone(),
                    })
                } else {
                    Ok(Operation::start(unit.name.clone()))
                }
            }
            PlanStep::StartStopped { units } => {
                let existing = self.supervisor.list_existing(units)?;
                let running = self.supervisor.list_running(units)?;
                let stopped: Vec<String> = existing.difference(&running).cloned().collect();
                if stopped.is_empty() {
                    Ok(Operation::Skip {
                        unit: units.join(" "),
                    })
                } else {
                    Ok(Operation::Start { units: stopped })
                }
            }
            PlanStep::Bounce { companion } => Ok(Operation::Bounce {
                companion: companion.clone(),
            }),
        }
    }

    fn restart_or_start(&self, unit: &ServiceUnit, verb: Action) -> Result<Operation> {
        let patterns = [unit.name.clone()];
        let existing: BTreeSet<String> = self.supervisor.list_existing(&patterns)?;
        let running: BTreeSet<String> = self.supervisor.list_running(&patterns)?;

        match verb {
            Action::Restart if running.is_empty() => {
                info!("{unit} is not running; starting instead");
                Ok(Operation::start(unit.name.clone()))
            }
            Action::Restart => Ok(Operation::restart(unit.name.clone())),
            Action::Start if existing == running => {
                info!("{unit} already started");
                Ok(Operation::Skip {
                    unit: unit.name.clone(),
                })
            }
            Action::Start => Ok(Operation::start(unit.name.clone())),
        }
    }

    fn perform(&mut self, op: &Operation) -> Result<()> {
        match op {
            Operation::Start { units } => {
                info!("Starting {}", units.join(" "));
                self.supervisor.start(units)
            }
            Operation::Stop { units } => {
                info!("Stopping {}", units.join(" "));
                self.supervisor.stop(units)
            }
            Operation::Restart { unit } => {
                info!("Restarting {unit}");
                self.supervisor.restart(unit)
            }
            Operation::Signal { unit } => {
                // No control_file configured.
                let channel = self.control.as_ref().ok_or_else(|| {
                    RelaunchError::ControlChannelMissing(PathBuf::from("web.control_file"))
                })?;
                info!("Starting rolling restart of {unit}");
                self.host.chain_reload(channel)
            }
            Operation::Bounce { companion } => {
                info!("Restarting SSO companion {}", companion.process);
                self.host.bounce(companion)
            }
            Operation::Skip { .. } => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::Companion;
    use crate::supervisor::fake::{Call, FakeHost, FakeSupervisor};
    use crate::unit::UnitGroup;

    fn unit(name: &str) -> ServiceUnit {
        ServiceUnit::new(name, UnitGroup::Worker)
    }

    fn restart_or_start(name: &str, verb: Action) -> PlanStep {
        PlanStep::RestartOrStart {
            unit: unit(name),
            verb,
        }
    }

    #[test]
    fn restart_downgrades_to_start_when_not_running() {
        let mut sup = FakeSupervisor::new(["w:a", "w:b"], &["w:a"]);
        let mut host = FakeHost::default();
        let ops = PlanExecutor::new(&mut sup, &mut host, None)
            .execute(&[
                restart_or_start("w:a", Action::Restart),
                restart_or_start("w:b", Action::Restart),
            ])
            .unwrap();
        assert_eq!(
            ops,
            [Operation::restart("w:a"), Operation::start("w:b")]
        );
        assert_eq!(
            sup.calls,
            [
                Call::Restart("w:a".to_string()),
                Call::Start(vec!["w:b".to_string()])
            ]
        );
    }

    #[test]
    fn start_of_running_unit_is_skipped_not_executed() {
        let mut sup = FakeSupervisor::new(["web"], &["web"]);
        let mut host = FakeHost::default();
        let ops = PlanExecutor::new(&mut sup, &mut host, None)
            .execute(&[restart_or_start("web", Action::Start)])
            .unwrap();
        assert!(ops.is_empty());
        assert!(sup.calls.is_empty());
    }

    #[test]
    fn wildcard_restart_checks_the_whole_group() {
        let mut sup = FakeSupervisor::new(["push:p-1", "push:p-2"], &["push:p-2"]);
        let mut host = FakeHost::default();
        let ops = PlanExecutor::new(&mut sup, &mut host, None)
            .execute(&[restart_or_start("push:*", Action::Restart)])
            .unwrap();
        assert_eq!(ops, [Operation::restart("push:*")]);
        assert!(sup.is_running("push:p-1"));
    }

    #[test]
    fn reload_signals_running_web_tier() {
        let mut sup = FakeSupervisor::new(["web"], &["web"]);
        let mut host = FakeHost::default();
        let channel = ControlChannel::new("/run/web-control");
        let ops = PlanExecutor::new(&mut sup, &mut host, Some(channel))
            .execute(&[PlanStep::ReloadOrStart { unit: unit("web") }])
            .unwrap();
        assert_eq!(
            ops,
            [Operation::Signal {
                unit: "web".to_string()
            }]
        );
        assert!(sup.calls.is_empty());
        assert_eq!(host.reloads.len(), 1);
    }

    #[test]
    fn reload_starts_stopped_web_tier() {
        let mut sup = FakeSupervisor::new(["web"], &[]);
        let mut host = FakeHost::default();
        let channel = ControlChannel::new("/run/web-control");
        let ops = PlanExecutor::new(&mut sup, &mut host, Some(channel))
            .execute(&[PlanStep::ReloadOrStart { unit: unit("web") }])
            .unwrap();
        assert_eq!(ops, [Operation::start("web")]);
        assert!(host.reloads.is_empty());
        assert!(sup.is_running("web"));
    }

    #[test]
    fn start_stopped_starts_exactly_the_stopped_units() {
        let mut sup = FakeSupervisor::new(["w:a", "w:b", "w:c", "deliver"], &["w:b"]);
        let mut host = FakeHost::default();
        let ops = PlanExecutor::new(&mut sup, &mut host, None)
            .execute(&[PlanStep::StartStopped {
                units: vec!["w:*".to_string(), "deliver".to_string()],
            }])
            .unwrap();
        assert_eq!(
            ops,
            [Operation::Start {
                units: vec!["deliver".to_string(), "w:a".to_string(), "w:c".to_string()]
            }]
        );
    }

    #[test]
    fn start_stopped_with_everything_up_is_skipped() {
        let mut sup = FakeSupervisor::new(["w:a"], &["w:a"]);
        let mut host = FakeHost::default();
        let ops = PlanExecutor::new(&mut sup, &mut host, None)
            .execute(&[PlanStep::StartStopped {
                units: vec!["w:*".to_string()],
            }])
            .unwrap();
        assert!(ops.is_empty());
        assert!(sup.calls.is_empty());
    }

    #[test]
    fn failure_aborts_remaining_steps() {
        let mut sup = FakeSupervisor::new(["w:a", "w:b", "web"], &["w:a", "w:b", "web"]);
        sup.fail_on = Some("w:a".to_string());
        let mut host = FakeHost::default();
        let err = PlanExecutor::new(&mut sup, &mut host, None)
            .execute(&[
                restart_or_start("w:a", Action::Restart),
                restart_or_start("w:b", Action::Restart),
                restart_or_start("web", Action::Restart),
            ])
            .unwrap_err();
        assert!(matches!(err, RelaunchError::SupervisorFailed { .. }));
        assert_eq!(sup.calls, [Call::Restart("w:a".to_string())]);
    }

    #[test]
    fn bounce_goes_to_host() {
        let mut sup = FakeSupervisor::default();
        let mut host = FakeHost::default();
        let companion = Companion {
            process: "apache2".to_string(),
            user: Some("app".to_string()),
        };
        PlanExecutor::new(&mut sup, &mut host, None)
            .execute(&[PlanStep::Bounce { companion }])
            .unwrap();
        assert_eq!(host.bounces, ["apache2"]);
    }

    #[test]
    fn signal_without_control_channel_is_rejected() {
        let mut sup = FakeSupervisor::new(["web"], &["web"]);
        let mut host = FakeHost::default();
        let err = PlanExecutor::new(&mut sup, &mut host, None)
            .execute(&[PlanStep::ReloadOrStart { unit: unit("web") }])
            .unwrap_err();
        assert!(matches!(err, RelaunchError::ControlChannelMissing(_)));
        assert!(host.reloads.is_empty());
    }
}
