//! Build report types
//!
//! The report is keyed by component name rather than finish time so it
//! reads deterministically regardless of scheduling order. It is created
//! empty at orchestration start, appended to as components finish, and
//! read-only afterwards.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Terminal outcome for one component
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ComponentStatus {
    Succeeded,
    Failed { reason: String },
    /// Not attempted because a build dependency did not succeed
    Skipped { caused_by: String },
}

impl ComponentStatus {
    pub fn is_succeeded(&self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

impl fmt::Display for ComponentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed { reason } => write!(f, "failed: {reason}"),
            Self::Skipped { caused_by } => write!(f, "skipped (caused by {caused_by})"),
        }
    }
}

/// Per-component outcomes for one orchestration run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildReport {
    entries: BTreeMap<String, ComponentStatus>,
}

impl BuildReport {
    /// Create an empty report
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a component's terminal status
    ///
    /// A component is recorded at most once; a second record for the same
    /// name is ignored so the first terminal status wins.
    pub fn record(&mut self, name: impl Into<String>, status: ComponentStatus) {
        self.entries.entry(name.into()).or_insert(status);
    }

    /// Status of one component
    pub fn status(&self, name: &str) -> Option<&ComponentStatus> {
        self.entries.get(name)
    }

    /// Iterate entries in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ComponentStatus)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of recorded components
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the report is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether every recorded component succeeded
    pub fn all_succeeded(&self) -> bool {
        self.entries.values().all(ComponentStatus::is_succeeded)
    }

    /// Number of failed components
    pub fn failed_count(&self) -> usize {
        self.entries
            .values()
            .filter(|s| matches!(s, ComponentStatus::Failed { .. }))
            .count()
    }
}
