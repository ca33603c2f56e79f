//! Transaction wrapper for [`SqliteStore`].

use rusqlite::Connection;

use forge_core::dependency::Dependency;
use forge_core::note::Note;
use forge_core::role_transition::RoleTransition;
use forge_core::work_item::WorkItem;

use crate::error::Result;
use crate::sqlite::dependencies;
use crate::sqlite::items;
use crate::sqlite::notes;
use crate::sqlite::role_transitions;
use crate::sqlite::store::SqliteStore;
use crate::traits::{ChildRoleCounts, Transaction, WorkItemUpdate};

/// A thin wrapper around a SQLite connection that is inside a transaction.
///
/// [`SqliteTx`] holds a reference to the connection (which already has an
/// active transaction via `BEGIN`). It implements [`Transaction`] by
/// delegating to the same connection-level helpers used by [`SqliteStore`],
/// so a single transaction can mix item updates, dependency writes, and
/// role-transition appends (spec.md §4.3.4, §4.4's atomic work-tree
/// creation).
pub(crate) struct SqliteTx<'a> {
    pub(crate) conn: &'a Connection,
}

impl Transaction for SqliteTx<'_> {
    fn get_item(&self, id: &str) -> Result<WorkItem> {
        items::get_item_on_conn(self.conn, id)
    }

    fn create_item(&self, item: &WorkItem) -> Result<WorkItem> {
        items::insert_item_on_conn(self.conn, item)
    }

    fn update_item(&self, id: &str, update: &WorkItemUpdate) -> Result<WorkItem> {
        items::update_item_on_conn(self.conn, id, update)
    }

    fn delete_item(&self, id: &str) -> Result<()> {
        items::delete_item_on_conn(self.conn, id)
    }

    fn find_children(&self, id: &str) -> Result<Vec<WorkItem>> {
        items::find_children_on_conn(self.conn, id)
    }

    fn count_children_by_role(&self, id: &str) -> Result<ChildRoleCounts> {
        items::count_children_by_role_on_conn(self.conn, id)
    }

    fn create_dependency(&self, dep: &Dependency) -> Result<Dependency> {
        dependencies::insert_dependency_on_conn(self.conn, dep)
    }

    fn create_dependencies_batch(&self, deps: &[Dependency]) -> Result<Vec<Dependency>> {
        dependencies::insert_dependencies_batch_on_conn(self.conn, deps)
    }

    fn delete_dependency(&self, id: &str) -> Result<()> {
        dependencies::delete_dependency_on_conn(self.conn, id)
    }

    fn find_dependencies_by_item(&self, item_id: &str) -> Result<Vec<Dependency>> {
        dependencies::find_by_item_on_conn(self.conn, item_id)
    }

    fn upsert_note(&self, note: &Note) -> Result<Note> {
        notes::upsert_note_on_conn(self.conn, note)
    }

    fn delete_notes_by_item(&self, item_id: &str) -> Result<()> {
        notes::delete_notes_by_item_on_conn(self.conn, item_id)
    }

    fn append_role_transition(&self, record: &RoleTransition) -> Result<RoleTransition> {
        role_transitions::append_role_transition_on_conn(self.conn, record)
    }
}

impl SqliteStore {
    /// Runs a closure inside a database transaction. Commits on `Ok(())`,
    /// rolls back on `Err`.
    pub(crate) fn run_in_transaction_impl(
        &self,
        f: &mut dyn FnMut(&dyn Transaction) -> Result<()>,
    ) -> Result<()> {
        let conn = self.lock_conn()?;
        let tx = conn.unchecked_transaction().map_err(|e| {
            crate::error::RepositoryError::DatabaseError(format!("failed to begin transaction: {e}"))
        })?;

        let sqlite_tx = SqliteTx { conn: &tx };
        match f(&sqlite_tx) {
            Ok(()) => {
                tx.commit().map_err(|e| {
                    crate::error::RepositoryError::DatabaseError(format!("failed to commit: {e}"))
                })?;
                Ok(())
            }
            Err(e) => Err(e), // rolled back on drop
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forge_core::enums::DependencyType;
    use forge_core::work_item::WorkItemBuilder;

    fn test_store() -> SqliteStore {
        SqliteStore::open_in_memory().unwrap()
    }

    #[test]
    fn transaction_commit() {
        let store = test_store();
        store
            .run_in_transaction_impl(&mut |tx| {
                let item = WorkItemBuilder::new("In transaction").id("wi-tx1").build();
                tx.create_item(&item)?;
                Ok(())
            })
            .unwrap();

        let item = store.get_item_impl("wi-tx1").unwrap();
        assert_eq!(item.title, "In transaction");
    }

    #[test]
    fn transaction_rollback_on_error() {
        let store = test_store();
        let result = store.run_in_transaction_impl(&mut |tx| {
            let item = WorkItemBuilder::new("Should rollback").id("wi-tx2").build();
            tx.create_item(&item)?;
            Err(crate::error::RepositoryError::DatabaseError("forced".into()))
        });
        assert!(result.is_err());

        let err = store.get_item_impl("wi-tx2").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn transaction_with_dependencies() {
        let store = test_store();
        store
            .run_in_transaction_impl(&mut |tx| {
                let parent = WorkItemBuilder::new("Parent").id("wi-txp1").build();
                let child = WorkItemBuilder::new("Child")
                    .id("wi-txc1")
                    .parent_id("wi-txp1")
                    .depth(1)
                    .build();
                tx.create_item(&parent)?;
                tx.create_item(&child)?;
                tx.create_dependency(&Dependency {
                    id: String::new(),
                    from_item_id: "wi-txc1".into(),
                    to_item_id: "wi-txp1".into(),
                    dep_type: DependencyType::RelatesTo,
                    unblock_at: None,
                    created_at: chrono::Utc::now(),
                })?;
                Ok(())
            })
            .unwrap();

        let deps = store.find_dependencies_by_item_impl("wi-txc1").unwrap();
        assert_eq!(deps.len(), 1);
    }
}
