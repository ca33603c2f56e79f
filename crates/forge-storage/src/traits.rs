//! Repository and Transaction traits -- the public API for work-item
//! persistence (spec.md §4.1).
//!
//! Consumers depend on these traits rather than on concrete
//! implementations so that the engine and tool-handler layers can be
//! tested against an in-memory or mock backend.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use forge_core::dependency::Dependency;
use forge_core::enums::{NoteRole, Role};
use forge_core::filter::WorkItemFilter;
use forge_core::note::Note;
use forge_core::role_transition::RoleTransition;
use forge_core::work_item::WorkItem;

use crate::error::Result;

// ---------------------------------------------------------------------------
// View / helper types
// ---------------------------------------------------------------------------

/// Typed partial-update struct for work items.
///
/// Only `Some` fields are applied; `None` fields are left unchanged.
/// `expected_version` is mandatory: the update is rejected with
/// `RepositoryError::ConflictError` unless it matches the row's current
/// `version` (spec.md §4.1, "optimistic update").
#[derive(Debug, Clone)]
pub struct WorkItemUpdate {
    pub expected_version: i64,
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub summary: Option<String>,
    pub role: Option<Role>,
    pub previous_role: Option<Option<Role>>,
    pub status_label: Option<Option<String>>,
    pub priority: Option<forge_core::enums::Priority>,
    pub complexity: Option<Option<i32>>,
    pub requires_verification: Option<bool>,
    pub metadata: Option<Option<String>>,
    pub tags: Option<String>,
    pub role_changed_at: Option<DateTime<Utc>>,
}

impl WorkItemUpdate {
    /// An update touching only `expected_version` -- a pure no-op guard,
    /// useful as a builder starting point.
    pub fn for_version(expected_version: i64) -> Self {
        Self {
            expected_version,
            title: None,
            description: None,
            summary: None,
            role: None,
            previous_role: None,
            status_label: None,
            priority: None,
            complexity: None,
            requires_verification: None,
            metadata: None,
            tags: None,
            role_changed_at: None,
        }
    }
}

/// Per-role child counts, as returned by `countChildrenByRole`.
#[derive(Debug, Clone, Default)]
pub struct ChildRoleCounts {
    pub queue: i64,
    pub work: i64,
    pub review: i64,
    pub terminal: i64,
    pub blocked: i64,
}

impl ChildRoleCounts {
    pub fn total(&self) -> i64 {
        self.queue + self.work + self.review + self.terminal + self.blocked
    }

    /// `true` iff there is at least one child and all children are
    /// `Terminal` (spec.md §4.3.5, cascade-eligibility test).
    pub fn all_terminal(&self) -> bool {
        self.total() > 0 && self.terminal == self.total()
    }
}

// ---------------------------------------------------------------------------
// Repository trait
// ---------------------------------------------------------------------------

/// The Repository facade (spec.md §4.1): typed operations over
/// persistence returning tagged `Result<T, RepositoryError>`.
pub trait Repository: Send + Sync {
    // -- WorkItem operations --------------------------------------------------

    fn get_item(&self, id: &str) -> Result<WorkItem>;
    fn create_item(&self, item: &WorkItem) -> Result<WorkItem>;
    fn update_item(&self, id: &str, update: &WorkItemUpdate) -> Result<WorkItem>;
    fn delete_item(&self, id: &str) -> Result<()>;

    fn find_by_parent(&self, parent_id: &str) -> Result<Vec<WorkItem>>;
    fn find_by_role(&self, role: Role) -> Result<Vec<WorkItem>>;
    fn find_by_depth(&self, depth: i32) -> Result<Vec<WorkItem>>;
    fn find_root(&self, id: &str) -> Result<WorkItem>;
    fn find_root_items(&self) -> Result<Vec<WorkItem>>;
    fn search(&self, query: &str, limit: i64) -> Result<Vec<WorkItem>>;
    fn count(&self) -> Result<i64>;
    fn find_children(&self, id: &str) -> Result<Vec<WorkItem>>;
    fn count_children_by_role(&self, id: &str) -> Result<ChildRoleCounts>;

    /// Breadth-first subtree of `id`, excluding `id` itself.
    fn find_descendants(&self, id: &str) -> Result<Vec<WorkItem>>;
    fn find_by_ids(&self, ids: &[String]) -> Result<Vec<WorkItem>>;
    fn delete_all(&self, ids: &[String]) -> Result<()>;

    /// For each id, the path `[root, ..., directParent]`.
    fn find_ancestor_chains(&self, ids: &[String]) -> Result<HashMap<String, Vec<WorkItem>>>;

    fn find_by_filters(&self, filter: &WorkItemFilter) -> Result<Vec<WorkItem>>;
    fn count_by_filters(&self, filter: &WorkItemFilter) -> Result<i64>;

    // -- Dependency operations -------------------------------------------------

    /// Inserts one edge and cycle-checks it in the same transaction.
    fn create_dependency(&self, dep: &Dependency) -> Result<Dependency>;

    /// Inserts a set of edges atomically with batch-aware cycle detection.
    fn create_dependencies_batch(&self, deps: &[Dependency]) -> Result<Vec<Dependency>>;

    fn delete_dependency(&self, id: &str) -> Result<()>;
    fn delete_dependencies_by_item(&self, item_id: &str) -> Result<()>;
    fn find_dependencies_by_item(&self, item_id: &str) -> Result<Vec<Dependency>>;
    fn find_dependencies_by_from(&self, from_item_id: &str) -> Result<Vec<Dependency>>;
    fn find_dependencies_by_to(&self, to_item_id: &str) -> Result<Vec<Dependency>>;

    // -- Note operations ---------------------------------------------------------

    /// Keyed by `(itemId, key)`, preserving the existing `id` when present.
    fn upsert_note(&self, note: &Note) -> Result<Note>;
    fn get_note(&self, id: &str) -> Result<Note>;
    fn delete_note(&self, id: &str) -> Result<()>;
    fn delete_notes_by_item(&self, item_id: &str) -> Result<()>;
    fn find_notes_by_item(&self, item_id: &str, role: Option<NoteRole>) -> Result<Vec<Note>>;
    fn find_note_by_item_and_key(&self, item_id: &str, key: &str) -> Result<Option<Note>>;

    // -- RoleTransition operations -------------------------------------------------

    fn append_role_transition(&self, record: &RoleTransition) -> Result<RoleTransition>;
    fn find_role_transitions_by_item(&self, item_id: &str) -> Result<Vec<RoleTransition>>;

    // -- Transactions ----------------------------------------------------------

    /// Executes a closure within a database transaction. Commits on `Ok`,
    /// rolls back on `Err`.
    fn run_in_transaction(&self, f: &mut dyn FnMut(&dyn Transaction) -> Result<()>) -> Result<()>;

    // -- Lifecycle ---------------------------------------------------------------

    fn close(&self) -> Result<()>;
}

// ---------------------------------------------------------------------------
// Transaction trait
// ---------------------------------------------------------------------------

/// Subset of [`Repository`] usable inside a `run_in_transaction` closure.
///
/// All operations share a single connection and commit or roll back
/// atomically. The workflow engine's `applyTransition` (item update +
/// `RoleTransition` append, spec.md §4.3.4) and the tool handlers' atomic
/// work-tree creation (spec.md §4.4) both run entirely through this trait.
pub trait Transaction {
    fn get_item(&self, id: &str) -> Result<WorkItem>;
    fn create_item(&self, item: &WorkItem) -> Result<WorkItem>;
    fn update_item(&self, id: &str, update: &WorkItemUpdate) -> Result<WorkItem>;
    fn delete_item(&self, id: &str) -> Result<()>;
    fn find_children(&self, id: &str) -> Result<Vec<WorkItem>>;
    fn count_children_by_role(&self, id: &str) -> Result<ChildRoleCounts>;

    fn create_dependency(&self, dep: &Dependency) -> Result<Dependency>;
    fn create_dependencies_batch(&self, deps: &[Dependency]) -> Result<Vec<Dependency>>;
    fn delete_dependency(&self, id: &str) -> Result<()>;
    fn find_dependencies_by_item(&self, item_id: &str) -> Result<Vec<Dependency>>;

    fn upsert_note(&self, note: &Note) -> Result<Note>;
    fn delete_notes_by_item(&self, item_id: &str) -> Result<()>;

    fn append_role_transition(&self, record: &RoleTransition) -> Result<RoleTransition>;
}
