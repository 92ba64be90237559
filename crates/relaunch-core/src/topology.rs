//! Which supervisor units make up this deployment.
//!
//! Derived fresh from [`Config`] on every run; nothing here is persisted.

use crate::config::Config;
use crate::control::Companion;
use crate::unit::{group_wildcard, ServiceUnit, UnitGroup};

#[derive(Debug, Clone)]
pub struct ServiceTopology {
    /// Wildcard over the whole worker group.
    pub workers: ServiceUnit,
    /// Worker programs that may not exist in every deployment version.
    pub optional_workers: Vec<ServiceUnit>,
    /// One unit per port when sharded, otherwise a single group wildcard.
    /// Empty when this host does not run the web tier.
    pub push: Vec<ServiceUnit>,
    pub web: Option<ServiceUnit>,
    pub auxiliary: Vec<ServiceUnit>,
    pub sso: Option<Companion>,
    push_program: String,
}

impl ServiceTopology {
    pub fn from_config(config: &Config) -> Self {
        let push_program = config.push.program.clone();
        let push_ports = config.push_ports();

        let push = if !config.web.enabled {
            Vec::new()
        } else if push_ports.len() > 1 {
            push_ports
                .iter()
                .enumerate()
                .map(|(i, port)| {
                    let weight = UnitGroup::PushShard.weight() + i as u32;
                    ServiceUnit::new(push_shard_name(&push_program, *port), UnitGroup::PushShard)
                        .with_weight(weight)
                })
                .collect()
        } else {
            vec![ServiceUnit::new(
                group_wildcard(&push_program),
                UnitGroup::PushShard,
            )]
        };

        let web = config
            .web
            .enabled
            .then(|| ServiceUnit::new(config.web.unit.clone(), UnitGroup::WebApp));

        let sso = (config.web.enabled && config.sso.enabled).then(|| Companion {
            process: config.sso.process.clone(),
            user: config.sso.user.clone(),
        });

        Self {
            workers: ServiceUnit::new(group_wildcard(&config.workers.group), UnitGroup::Worker),
            optional_workers: config
                .workers
                .optional
                .iter()
                .map(|name| ServiceUnit::new(name.clone(), UnitGroup::Worker))
                .collect(),
            push,
            web,
            auxiliary: config
                .auxiliary
                .iter()
                .map(|name| ServiceUnit::new(name.clone(), UnitGroup::Auxiliary))
                .collect(),
            sso,
            push_program,
        }
    }

    /// Units whose running state decides whether a restart has anything to restart.
    pub fn activity_patterns(&self) -> Vec<String> {
        let mut patterns = vec![self.workers.name.clone()];
        patterns.extend(self.optional_workers.iter().map(|u| u.name.clone()));
        if let Some(web) = &self.web {
            patterns.push(web.name.clone());
            patterns.push(group_wildcard(&self.push_program));
        }
        patterns
    }

    /// Everything that should be up once a run completes.
    pub fn candidate_patterns(&self) -> Vec<String> {
        let mut patterns = self.activity_patterns();
        patterns.extend(self.auxiliary.iter().map(|u| u.name.clone()));
        patterns
    }

    pub fn auxiliary_patterns(&self) -> Vec<String> {
        self.auxiliary.iter().map(|u| u.name.clone()).collect()
    }

    /// All units in ordering-weight order.
    pub fn units(&self) -> Vec<&ServiceUnit> {
        let mut units: Vec<&ServiceUnit> = self
            .auxiliary
            .iter()
            .chain(std::iter::once(&self.workers))
            .chain(self.optional_workers.iter())
            .chain(self.push.iter())
            .chain(self.web.iter())
            .collect();
        units.sort_by_key(|u| u.weight);
        units
    }

    /// Units of one group, lightest first.
    pub fn units_in(&self, group: UnitGroup) -> Vec<&ServiceUnit> {
        self.units()
            .into_iter()
            .filter(|u| u.group == group)
            .collect()
    }

    /// Groups in the order their lightest unit sorts.
    pub fn group_order(&self) -> Vec<UnitGroup> {
        let mut groups = Vec::new();
        for unit in self.units() {
            if !groups.contains(&unit.group) {
                groups.push(unit.group);
            }
        }
        groups
    }
}

pub fn push_shard_name(program: &str, port: u16) -> String {
    format!("{program}:{program}-port-{port}")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
