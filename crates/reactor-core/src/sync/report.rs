//! Sync run outcome and progress reporting

use std::fmt;

use serde::Serialize;

use crate::model::ResourceType;

/// Which phases a sync run performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SyncDirection {
    pub push: bool,
    pub pull: bool,
}

impl SyncDirection {
    pub const BOTH: SyncDirection = SyncDirection {
        push: true,
        pull: true,
    };

    /// Resolve the `--modified` / `--behind` flags.
    ///
    /// No flag (or both) runs both phases; a single flag restricts the run
    /// to the matching phase.
    pub fn from_flags(modified: bool, behind: bool) -> Self {
        Self {
            push: !behind || modified,
            pull: !modified || behind,
        }
    }
}

impl Default for SyncDirection {
    fn default() -> Self {
        Self::BOTH
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPhase {
    Push,
    Pull,
}

impl fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncPhase::Push => f.write_str("push"),
            SyncPhase::Pull => f.write_str("pull"),
        }
    }
}

/// A single item that failed during a phase
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemFailure {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ResourceType,
    pub phase: SyncPhase,
    pub message: String,
}

/// Outcome of a sync run.
///
/// Per-item failures never abort a phase, so a report can hold successes
/// and failures side by side.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Ids pushed (and revised, where required)
    pub pushed: Vec<String>,
    /// Ids fetched and materialized
    pub pulled: Vec<String>,
    pub failures: Vec<ItemFailure>,
}

impl SyncReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failed(&self, phase: SyncPhase) -> impl Iterator<Item = &ItemFailure> {
        self.failures.iter().filter(move |f| f.phase == phase)
    }

    pub(crate) fn fail(
        &mut self,
        id: impl Into<String>,
        kind: ResourceType,
        phase: SyncPhase,
        message: impl fmt::Display,
    ) {
        let failure = ItemFailure {
            id: id.into(),
            kind,
            phase,
            message: message.to_string(),
        };
        tracing::warn!(
            id = %failure.id,
            kind = %failure.kind,
            phase = %failure.phase,
            "{}",
            failure.message
        );
        self.failures.push(failure);
    }
}

/// Observer for sync progress; both hooks default to doing nothing.
pub trait SyncProgress: Send + Sync {
    /// A phase begins with `total` items.
    fn started(&self, _phase: SyncPhase, _total: usize) {}

    /// `completed` items of the phase are done.
    fn advanced(&self, _phase: SyncPhase, _completed: usize) {}
}

/// Progress observer that ignores everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl SyncProgress for NoProgress {}
