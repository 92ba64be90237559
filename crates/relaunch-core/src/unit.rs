use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// UnitGroup
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnitGroup {
    Auxiliary,
    Worker,
    PushShard,
    WebApp,
}

impl UnitGroup {
    pub fn as_str(self) -> &'static str {
        match self {
            UnitGroup::Auxiliary => "auxiliary",
            UnitGroup::Worker => "worker",
            UnitGroup::PushShard => "push-shard",
            UnitGroup::WebApp => "web-app",
        }
    }

    /// Default ordering weight: auxiliary units come up first, the web tier last.
    pub fn weight(self) -> u32 {
        match self {
            UnitGroup::Auxiliary => 0,
            UnitGroup::Worker => 10,
            UnitGroup::PushShard => 20,
            UnitGroup::WebApp => 30,
        }
    }
}

impl fmt::Display for UnitGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ServiceUnit
// ---------------------------------------------------------------------------

/// A supervisor program, or a whole group when the name ends in `:*`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServiceUnit {
    pub name: String,
    pub group: UnitGroup,
    pub weight: u32,
}

impl ServiceUnit {
    pub fn new(name: impl Into<String>, group: UnitGroup) -> Self {
        Self {
            name: name.into(),
            group,
            weight: group.weight(),
        }
    }

    pub fn with_weight(mut self, weight: u32) -> Self {
        self.weight = weight;
        self
    }

}

impl fmt::Display for ServiceUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Wildcard for every program in a supervisor group.
pub fn group_wildcard(group: &str) -> String {
    format!("{group}:*")
}

// ---------------------------------------------------------------------------
// Pattern matching
// ---------------------------------------------------------------------------

/// Match a supervisor process name against a unit pattern.
///
/// `group:*` matches `group` itself (a standalone program lives in a group of
/// the same name) and every `group:program`. Anything else is an exact match.
pub fn pattern_matches(pattern: &str, name: &str) -> bool {
    match pattern.strip_suffix(":*") {
        Some(group) => {
            name == group
                || name
                    .strip_prefix(group)
                    .is_some_and(|rest| rest.starts_with(':'))
        }
        None => pattern == name,
    }
}

pub fn matches_any<S: AsRef<str>>(patterns: &[S], name: &str) -> bool {
    patterns.iter().any(|p| pattern_matches(p.as_ref(), name))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
