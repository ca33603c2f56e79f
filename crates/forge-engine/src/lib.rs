//! Dependency graph and workflow engine for the task-orchestration core
//! (spec.md §4.2, §4.3).
//!
//! Parameterized entirely by a [`forge_storage::Repository`] and a
//! [`forge_core::note_schema::NoteSchemaSource`] — no global state
//! (spec.md §9).

pub mod dependency_graph;
pub mod error;
pub mod gates;
pub mod workflow;

pub use dependency_graph::{classify_block_status, BlockStatus, BlockType, Blocker};
pub use error::{EngineError, Result};
pub use gates::ExpectedNote;
pub use workflow::{
    advance_item, apply_transition, detect_and_apply_cascade, detect_unblocked,
    queue_priority_key, resolve_transition, validate_transition, AdvanceOutcome, CascadeEvent,
    ResolveOutcome, DEFAULT_MAX_CASCADE_DEPTH,
};
