use crate::error::Result;
use crate::supervisor::SupervisorClient;
use crate::unit::matches_any;
use std::collections::BTreeSet;

/// Point-in-time view of what the supervisor knows about and what is up.
///
/// Captured once per decision point and never mutated. Anything acting on a
/// single unit re-queries the supervisor instead of trusting this snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObservedState {
    existing: BTreeSet<String>,
    running: BTreeSet<String>,
}

impl ObservedState {
    /// `running` entries are folded into `existing` so the subset relation holds.
    pub fn new<E, R>(existing: E, running: R) -> Self
    where
        E: IntoIterator,
        E::Item: Into<String>,
        R: IntoIterator,
        R::Item: Into<String>,
    {
        let running: BTreeSet<String> = running.into_iter().map(Into::into).collect();
        let mut existing: BTreeSet<String> = existing.into_iter().map(Into::into).collect();
        existing.extend(running.iter().cloned());
        Self { existing, running }
    }

    pub fn capture(client: &dyn SupervisorClient, patterns: &[String]) -> Result<Self> {
        let existing = client.list_existing(patterns)?;
        let running = client.list_running(patterns)?;
        Ok(Self::new(existing, running))
    }

    pub fn existing_matching<S: AsRef<str>>(&self, patterns: &[S]) -> BTreeSet<String> {
        filter(&self.existing, patterns)
    }

    pub fn running_matching<S: AsRef<str>>(&self, patterns: &[S]) -> BTreeSet<String> {
        filter(&self.running, patterns)
    }

    /// Existing units matching `patterns` that are not running.
    pub fn stopped_matching<S: AsRef<str>>(&self, patterns: &[S]) -> BTreeSet<String> {
        self.existing_matching(patterns)
            .difference(&self.running)
            .cloned()
            .collect()
    }

    pub fn exists(&self, pattern: &str) -> bool {
        !self.existing_matching(&[pattern]).is_empty()
    }

    /// True when every existing unit matching `patterns` is running.
    pub fn all_running<S: AsRef<str>>(&self, patterns: &[S]) -> bool {
        self.existing_matching(patterns) == self.running_matching(patterns)
    }
}

fn filter<S: AsRef<str>>(names: &BTreeSet<String>, patterns: &[S]) -> BTreeSet<String> {
    names
        .iter()
        .filter(|name| matches_any(patterns, name))
        .cloned()
        .collect()
}
