//! Storage backend for the task-orchestration core.
//!
//! Provides the [`Repository`]/[`Transaction`] traits (spec.md §4.1) and a
//! SQLite implementation ([`SqliteStore`]).

pub mod error;
pub mod sqlite;
pub mod traits;

pub use error::{RepositoryError, STRUCTURAL_VALIDATION_PREFIX};
pub use sqlite::SqliteStore;
pub use traits::{ChildRoleCounts, Repository, Transaction, WorkItemUpdate};

use std::collections::HashMap;

use forge_core::dependency::Dependency;
use forge_core::enums::{NoteRole, Role};
use forge_core::filter::WorkItemFilter;
use forge_core::note::Note;
use forge_core::role_transition::RoleTransition;
use forge_core::work_item::WorkItem;

use crate::error::Result;

impl Repository for SqliteStore {
    fn get_item(&self, id: &str) -> Result<WorkItem> {
        self.get_item_impl(id)
    }

    fn create_item(&self, item: &WorkItem) -> Result<WorkItem> {
        self.create_item_impl(item)
    }

    fn update_item(&self, id: &str, update: &WorkItemUpdate) -> Result<WorkItem> {
        self.update_item_impl(id, update)
    }

    fn delete_item(&self, id: &str) -> Result<()> {
        self.delete_item_impl(id)
    }

    fn find_by_parent(&self, parent_id: &str) -> Result<Vec<WorkItem>> {
        self.find_by_parent_impl(parent_id)
    }

    fn find_by_role(&self, role: Role) -> Result<Vec<WorkItem>> {
        self.find_by_role_impl(role)
    }

    fn find_by_depth(&self, depth: i32) -> Result<Vec<WorkItem>> {
        self.find_by_depth_impl(depth)
    }

    fn find_root(&self, id: &str) -> Result<WorkItem> {
        self.find_root_impl(id)
    }

    fn find_root_items(&self) -> Result<Vec<WorkItem>> {
        self.find_root_items_impl()
    }

    fn search(&self, query: &str, limit: i64) -> Result<Vec<WorkItem>> {
        self.search_impl(query, limit)
    }

    fn count(&self) -> Result<i64> {
        self.count_impl()
    }

    fn find_children(&self, id: &str) -> Result<Vec<WorkItem>> {
        self.find_children_impl(id)
    }

    fn count_children_by_role(&self, id: &str) -> Result<ChildRoleCounts> {
        self.count_children_by_role_impl(id)
    }

    fn find_descendants(&self, id: &str) -> Result<Vec<WorkItem>> {
        self.find_descendants_impl(id)
    }

    fn find_by_ids(&self, ids: &[String]) -> Result<Vec<WorkItem>> {
        self.find_by_ids_impl(ids)
    }

    fn delete_all(&self, ids: &[String]) -> Result<()> {
        self.delete_all_impl(ids)
    }

    fn find_ancestor_chains(&self, ids: &[String]) -> Result<HashMap<String, Vec<WorkItem>>> {
        self.find_ancestor_chains_impl(ids)
    }

    fn find_by_filters(&self, filter: &WorkItemFilter) -> Result<Vec<WorkItem>> {
        self.find_by_filters_impl(filter)
    }

    fn count_by_filters(&self, filter: &WorkItemFilter) -> Result<i64> {
        self.count_by_filters_impl(filter)
    }

    fn create_dependency(&self, dep: &Dependency) -> Result<Dependency> {
        self.create_dependency_impl(dep)
    }

    fn create_dependencies_batch(&self, deps: &[Dependency]) -> Result<Vec<Dependency>> {
        self.create_dependencies_batch_impl(deps)
    }

    fn delete_dependency(&self, id: &str) -> Result<()> {
        self.delete_dependency_impl(id)
    }

    fn delete_dependencies_by_item(&self, item_id: &str) -> Result<()> {
        self.delete_dependencies_by_item_impl(item_id)
    }

    fn find_dependencies_by_item(&self, item_id: &str) -> Result<Vec<Dependency>> {
        self.find_dependencies_by_item_impl(item_id)
    }

    fn find_dependencies_by_from(&self, from_item_id: &str) -> Result<Vec<Dependency>> {
        self.find_dependencies_by_from_impl(from_item_id)
    }

    fn find_dependencies_by_to(&self, to_item_id: &str) -> Result<Vec<Dependency>> {
        self.find_dependencies_by_to_impl(to_item_id)
    }

    fn upsert_note(&self, note: &Note) -> Result<Note> {
        self.upsert_note_impl(note)
    }

    fn get_note(&self, id: &str) -> Result<Note> {
        self.get_note_impl(id)
    }

    fn delete_note(&self, id: &str) -> Result<()> {
        self.delete_note_impl(id)
    }

    fn delete_notes_by_item(&self, item_id: &str) -> Result<()> {
        self.delete_notes_by_item_impl(item_id)
    }

    fn find_notes_by_item(&self, item_id: &str, role: Option<NoteRole>) -> Result<Vec<Note>> {
        self.find_notes_by_item_impl(item_id, role)
    }

    fn find_note_by_item_and_key(&self, item_id: &str, key: &str) -> Result<Option<Note>> {
        self.find_note_by_item_and_key_impl(item_id, key)
    }

    fn append_role_transition(&self, record: &RoleTransition) -> Result<RoleTransition> {
        self.append_role_transition_impl(record)
    }

    fn find_role_transitions_by_item(&self, item_id: &str) -> Result<Vec<RoleTransition>> {
        self.find_role_transitions_by_item_impl(item_id)
    }

    fn run_in_transaction(&self, f: &mut dyn FnMut(&dyn Transaction) -> Result<()>) -> Result<()> {
        self.run_in_transaction_impl(f)
    }

    fn close(&self) -> Result<()> {
        // SQLite connections close when the `Connection` is dropped; the
        // `Mutex` wrapper only ensures thread safety, it has nothing to
        // flush explicitly.
        Ok(())
    }
}
