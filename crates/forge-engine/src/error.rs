//! Error taxonomy for the workflow engine (spec.md §4.3, §4.5, §7).

use forge_storage::RepositoryError;

use crate::dependency_graph::Blocker;

/// An engine-level failure. Each variant halts the transition before any
/// mutation (spec.md §4.3: "a failure halts the transition and yields an
/// error without mutation").
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The `resolve` phase rejected the `(role, trigger)` pair.
    #[error("{0}")]
    Resolve(String),

    /// The `validate` phase found unsatisfied dependency blockers.
    #[error("blocked by {} unsatisfied dependencies", .blockers.len())]
    Validate { blockers: Vec<Blocker> },

    /// A gate (spec.md §4.3.3) rejected the transition for missing
    /// required notes.
    #[error("missing required notes: {}", .missing.join(", "))]
    Gate { missing: Vec<String> },

    /// The underlying repository returned an error.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl EngineError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Repository(e) if e.is_conflict())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Repository(e) if e.is_not_found())
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
