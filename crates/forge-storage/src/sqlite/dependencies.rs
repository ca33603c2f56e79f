//! Dependency CRUD and cycle detection for [`SqliteStore`] (spec.md §4.1, §4.2).

use std::collections::{HashMap, HashSet};

use rusqlite::{Connection, OptionalExtension, Row, params};

use forge_core::dependency::Dependency;
use forge_core::enums::{DependencyType, Role};
use forge_core::idgen;
use forge_core::validation::validate_dependency;

use crate::error::{RepositoryError, Result};
use crate::sqlite::store::SqliteStore;
use crate::sqlite::util::{collect_tolerant, format_datetime, parse_datetime};

pub(crate) const DEP_COLUMNS: &str = "id, from_item_id, to_item_id, type, unblock_at, created_at";

pub(crate) fn scan_dependency(row: &Row<'_>) -> rusqlite::Result<Dependency> {
    let dep_type_str: String = row.get("type")?;
    let unblock_at_str: Option<String> = row.get("unblock_at")?;
    let created_at_str: String = row.get("created_at")?;

    Ok(Dependency {
        id: row.get("id")?,
        from_item_id: row.get("from_item_id")?,
        to_item_id: row.get("to_item_id")?,
        dep_type: DependencyType::try_from(dep_type_str.as_str()).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })?,
        unblock_at: unblock_at_str
            .map(|s| {
                Role::try_from(s.as_str()).map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        0,
                        rusqlite::types::Type::Text,
                        Box::new(e),
                    )
                })
            })
            .transpose()?,
        created_at: parse_datetime(&created_at_str)?,
    })
}

pub(crate) fn find_by_item_on_conn(conn: &Connection, item_id: &str) -> Result<Vec<Dependency>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {DEP_COLUMNS} FROM dependencies WHERE from_item_id = ?1 OR to_item_id = ?1"
    ))?;
    let rows = stmt.query_map(params![item_id], scan_dependency)?;
    Ok(collect_tolerant(rows))
}

fn find_by_from_on_conn(conn: &Connection, from_item_id: &str) -> Result<Vec<Dependency>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {DEP_COLUMNS} FROM dependencies WHERE from_item_id = ?1"
    ))?;
    let rows = stmt.query_map(params![from_item_id], scan_dependency)?;
    Ok(collect_tolerant(rows))
}

fn find_by_to_on_conn(conn: &Connection, to_item_id: &str) -> Result<Vec<Dependency>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {DEP_COLUMNS} FROM dependencies WHERE to_item_id = ?1"
    ))?;
    let rows = stmt.query_map(params![to_item_id], scan_dependency)?;
    Ok(collect_tolerant(rows))
}

fn exact_duplicate_exists(conn: &Connection, dep: &Dependency) -> Result<bool> {
    Ok(conn
        .query_row(
            "SELECT 1 FROM dependencies WHERE from_item_id = ?1 AND to_item_id = ?2 AND type = ?3",
            params![dep.from_item_id, dep.to_item_id, dep.dep_type.as_str()],
            |_| Ok(true),
        )
        .optional()?
        .unwrap_or(false))
}

/// Builds the cycle-check adjacency list: `BLOCKS` edges as-is, `IS_BLOCKED_BY`
/// normalized to the reverse `BLOCKS` direction, `RELATES_TO` excluded
/// (spec.md §4.2 step 3).
fn gating_adjacency(existing: &[Dependency], proposed: &[Dependency]) -> HashMap<String, Vec<String>> {
    let mut adj: HashMap<String, Vec<String>> = HashMap::new();
    let mut add_edge = |from: &str, to: &str, adj: &mut HashMap<String, Vec<String>>| {
        adj.entry(from.to_owned()).or_default().push(to.to_owned());
    };

    for dep in existing.iter().chain(proposed.iter()) {
        match dep.dep_type {
            DependencyType::Blocks => add_edge(&dep.from_item_id, &dep.to_item_id, &mut adj),
            DependencyType::IsBlockedBy => add_edge(&dep.to_item_id, &dep.from_item_id, &mut adj),
            DependencyType::RelatesTo => {}
        }
    }
    adj
}

#[derive(Clone, Copy, PartialEq)]
enum Color {
    White,
    Gray,
    Black,
}

/// Three-colour DFS cycle detection (spec.md §4.2 step 4).
fn has_cycle(adj: &HashMap<String, Vec<String>>) -> bool {
    let mut color: HashMap<&str, Color> = HashMap::new();
    for node in adj.keys() {
        color.insert(node.as_str(), Color::White);
    }

    fn visit<'a>(
        node: &'a str,
        adj: &'a HashMap<String, Vec<String>>,
        color: &mut HashMap<&'a str, Color>,
    ) -> bool {
        color.insert(node, Color::Gray);
        if let Some(neighbors) = adj.get(node) {
            for next in neighbors {
                match color.get(next.as_str()).copied().unwrap_or(Color::White) {
                    Color::Gray => return true,
                    Color::White => {
                        if visit(next, adj, color) {
                            return true;
                        }
                    }
                    Color::Black => {}
                }
            }
        }
        color.insert(node, Color::Black);
        false
    }

    let nodes: Vec<&str> = adj.keys().map(|s| s.as_str()).collect();
    for node in nodes {
        if color.get(node).copied().unwrap_or(Color::White) == Color::White && visit(node, adj, &mut color) {
            return true;
        }
    }
    false
}

pub(crate) fn insert_dependency_on_conn(conn: &Connection, dep: &Dependency) -> Result<Dependency> {
    insert_dependencies_batch_on_conn(conn, std::slice::from_ref(dep)).map(|mut v| v.remove(0))
}

/// Inserts a batch of edges atomically with batch-aware cycle detection,
/// duplicate detection, and self-reference rejection (spec.md §4.1
/// `createBatch`, §4.2 "Cycle detection").
pub(crate) fn insert_dependencies_batch_on_conn(
    conn: &Connection,
    deps: &[Dependency],
) -> Result<Vec<Dependency>> {
    // Step 1: structural validation (self-ref, RELATES_TO/unblockAt rule).
    // Marked distinctly from a true conflict (spec.md §4.5: these are
    // "domain rule violations", not "Cycle / duplicate") so the MCP layer
    // can report VALIDATION_ERROR instead of CONFLICT_ERROR.
    for dep in deps {
        validate_dependency(dep).map_err(RepositoryError::structural_validation)?;
    }

    // Reject duplicates within the batch itself.
    let mut seen: HashSet<(String, String, DependencyType)> = HashSet::new();
    for dep in deps {
        let key = (dep.from_item_id.clone(), dep.to_item_id.clone(), dep.dep_type);
        if !seen.insert(key) {
            return Err(RepositoryError::conflict(format!(
                "duplicate edge in batch: {} -> {} ({})",
                dep.from_item_id,
                dep.to_item_id,
                dep.dep_type.as_str()
            )));
        }
    }

    // Step 2: reject exact duplicates of existing rows.
    for dep in deps {
        if exact_duplicate_exists(conn, dep)? {
            return Err(RepositoryError::conflict(format!(
                "duplicate edge: {} -> {} ({})",
                dep.from_item_id,
                dep.to_item_id,
                dep.dep_type.as_str()
            )));
        }
    }

    // Step 3-4: build the gating graph from existing + proposed edges and
    // run cycle detection before touching the database.
    let mut all_existing_ids: HashSet<String> = HashSet::new();
    for dep in deps {
        all_existing_ids.insert(dep.from_item_id.clone());
        all_existing_ids.insert(dep.to_item_id.clone());
    }
    let mut existing = Vec::new();
    for id in &all_existing_ids {
        existing.extend(find_by_item_on_conn(conn, id)?);
    }
    existing.sort_by(|a, b| a.id.cmp(&b.id));
    existing.dedup_by(|a, b| a.id == b.id);

    let adj = gating_adjacency(&existing, deps);
    if has_cycle(&adj) {
        return Err(RepositoryError::conflict("circular"));
    }

    // Step 5: insert.
    let mut inserted = Vec::with_capacity(deps.len());
    for dep in deps {
        let mut dep = dep.clone();
        if dep.id.is_empty() {
            dep.id = idgen::generate_hash_id(
                "dep",
                &dep.from_item_id,
                &dep.to_item_id,
                "",
                dep.created_at,
                6,
                inserted.len() as i32,
            );
        }
        conn.execute(
            "INSERT INTO dependencies (id, from_item_id, to_item_id, type, unblock_at, created_at) \
             VALUES (?1,?2,?3,?4,?5,?6)",
            params![
                dep.id,
                dep.from_item_id,
                dep.to_item_id,
                dep.dep_type.as_str(),
                dep.unblock_at.map(|r| r.as_str()),
                format_datetime(&dep.created_at),
            ],
        )?;
        inserted.push(dep);
    }

    Ok(inserted)
}

pub(crate) fn delete_dependency_on_conn(conn: &Connection, id: &str) -> Result<()> {
    let affected = conn.execute("DELETE FROM dependencies WHERE id = ?1", params![id])?;
    if affected == 0 {
        return Err(RepositoryError::not_found("dependency", id));
    }
    Ok(())
}

pub(crate) fn delete_dependencies_by_item_on_conn(conn: &Connection, item_id: &str) -> Result<()> {
    conn.execute(
        "DELETE FROM dependencies WHERE from_item_id = ?1 OR to_item_id = ?1",
        params![item_id],
    )?;
    Ok(())
}

impl SqliteStore {
    pub(crate) fn create_dependency_impl(&self, dep: &Dependency) -> Result<Dependency> {
        insert_dependency_on_conn(&self.lock_conn()?, dep)
    }

    pub(crate) fn create_dependencies_batch_impl(&self, deps: &[Dependency]) -> Result<Vec<Dependency>> {
        insert_dependencies_batch_on_conn(&self.lock_conn()?, deps)
    }

    pub(crate) fn delete_dependency_impl(&self, id: &str) -> Result<()> {
        delete_dependency_on_conn(&self.lock_conn()?, id)
    }

    pub(crate) fn delete_dependencies_by_item_impl(&self, item_id: &str) -> Result<()> {
        delete_dependencies_by_item_on_conn(&self.lock_conn()?, item_id)
    }

    pub(crate) fn find_dependencies_by_item_impl(&self, item_id: &str) -> Result<Vec<Dependency>> {
        find_by_item_on_conn(&self.lock_conn()?, item_id)
    }

    pub(crate) fn find_dependencies_by_from_impl(&self, from_item_id: &str) -> Result<Vec<Dependency>> {
        find_by_from_on_conn(&self.lock_conn()?, from_item_id)
    }

    pub(crate) fn find_dependencies_by_to_impl(&self, to_item_id: &str) -> Result<Vec<Dependency>> {
        find_by_to_on_conn(&self.lock_conn()?, to_item_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::items::insert_item_on_conn;
    use chrono::Utc;
    use forge_core::work_item::WorkItemBuilder;

    fn test_store() -> SqliteStore {
        let store = SqliteStore::open_in_memory().unwrap();
        let conn = store.lock_conn().unwrap();
        for id in ["a", "b", "c"] {
            insert_item_on_conn(&conn, &WorkItemBuilder::new(id).id(id).build()).unwrap();
        }
        drop(conn);
        store
    }

    fn dep(from: &str, to: &str, t: DependencyType) -> Dependency {
        Dependency {
            id: String::new(),
            from_item_id: from.into(),
            to_item_id: to.into(),
            dep_type: t,
            unblock_at: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn create_and_find() {
        let store = test_store();
        store
            .create_dependency_impl(&dep("a", "b", DependencyType::Blocks))
            .unwrap();
        let found = store.find_dependencies_by_item_impl("a").unwrap();
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn direct_cycle_rejected() {
        let store = test_store();
        store
            .create_dependency_impl(&dep("a", "b", DependencyType::Blocks))
            .unwrap();
        let err = store
            .create_dependency_impl(&dep("b", "a", DependencyType::Blocks))
            .unwrap_err();
        assert!(err.is_conflict());
    }

    #[test]
    fn batch_with_internal_cycle_rejected_atomically() {
        let store = test_store();
        let err = store
            .create_dependencies_batch_impl(&[
                dep("a", "b", DependencyType::Blocks),
                dep("b", "a", DependencyType::Blocks),
            ])
            .unwrap_err();
        assert!(err.is_conflict());
        assert!(store.find_dependencies_by_item_impl("a").unwrap().is_empty());
    }

    #[test]
    fn relates_to_excluded_from_cycle_check() {
        let store = test_store();
        store
            .create_dependency_impl(&dep("a", "b", DependencyType::RelatesTo))
            .unwrap();
        store
            .create_dependency_impl(&dep("b", "a", DependencyType::RelatesTo))
            .unwrap();
    }

    #[test]
    fn is_blocked_by_normalizes_to_reverse_blocks_for_cycle_check() {
        let store = test_store();
        // a IS_BLOCKED_BY b means b -> a in gating terms (same as BLOCKS b->a).
        store
            .create_dependency_impl(&dep("a", "b", DependencyType::IsBlockedBy))
            .unwrap();
        // Now BLOCKS a->b would close a cycle: b->a (from above) and a->b.
        let err = store
            .create_dependency_impl(&dep("a", "b", DependencyType::Blocks))
            .unwrap_err();
        assert!(err.is_conflict());
    }

    #[test]
    fn self_reference_rejected() {
        let store = test_store();
        let err = store
            .create_dependency_impl(&dep("a", "a", DependencyType::Blocks))
            .unwrap_err();
        assert!(err.is_conflict());
        assert!(
            err.is_structural_validation(),
            "self-reference is a structural rule violation, not a true conflict"
        );
    }

    #[test]
    fn exact_duplicate_rejected() {
        let store = test_store();
        store
            .create_dependency_impl(&dep("a", "b", DependencyType::Blocks))
            .unwrap();
        let err = store
            .create_dependency_impl(&dep("a", "b", DependencyType::Blocks))
            .unwrap_err();
        assert!(err.is_conflict());
    }
}
