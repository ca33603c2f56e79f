//! WorkItem CRUD and query operations for [`SqliteStore`] (spec.md §4.1).

use std::collections::{HashMap, VecDeque};

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Row, params};

use forge_core::enums::{Priority, Role, SortBy, SortOrder};
use forge_core::filter::WorkItemFilter;
use forge_core::idgen;
use forge_core::work_item::WorkItem;

use crate::error::{RepositoryError, Result};
use crate::sqlite::store::SqliteStore;
use crate::sqlite::util::{collect_tolerant, format_datetime, parse_datetime};
use crate::traits::{ChildRoleCounts, WorkItemUpdate};

pub(crate) const ITEM_COLUMNS: &str = "id, parent_id, title, description, summary, role, \
    previous_role, status_label, priority, complexity, requires_verification, depth, \
    metadata, tags, created_at, modified_at, role_changed_at, version";

pub(crate) fn scan_item(row: &Row<'_>) -> rusqlite::Result<WorkItem> {
    let role_str: String = row.get("role")?;
    let previous_role_str: Option<String> = row.get("previous_role")?;
    let priority_str: String = row.get("priority")?;
    let requires_verification_int: i32 = row.get("requires_verification")?;
    let created_at_str: String = row.get("created_at")?;
    let modified_at_str: String = row.get("modified_at")?;
    let role_changed_at_str: String = row.get("role_changed_at")?;

    Ok(WorkItem {
        id: row.get("id")?,
        parent_id: row.get("parent_id")?,
        title: row.get("title")?,
        description: row.get("description")?,
        summary: row.get("summary")?,
        role: Role::try_from(role_str.as_str()).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })?,
        previous_role: previous_role_str
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
        status_label: row.get("status_label")?,
        priority: Priority::try_from(priority_str.as_str()).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })?,
        complexity: row.get("complexity")?,
        requires_verification: requires_verification_int != 0,
        depth: row.get("depth")?,
        metadata: row.get("metadata")?,
        tags: row.get("tags")?,
        created_at: parse_datetime(&created_at_str)?,
        modified_at: parse_datetime(&modified_at_str)?,
        role_changed_at: parse_datetime(&role_changed_at_str)?,
        version: row.get("version")?,
    })
}

pub(crate) fn insert_item_on_conn(conn: &Connection, item: &WorkItem) -> Result<WorkItem> {
    let mut item = item.clone();
    if item.id.is_empty() {
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM work_items", [], |r| r.get(0))?;
        let length = idgen::compute_adaptive_length(
            count as usize,
            idgen::adaptive_defaults::MIN_LENGTH,
            idgen::adaptive_defaults::MAX_LENGTH,
            idgen::adaptive_defaults::MAX_COLLISION_PROB,
        );
        item.id = idgen::generate_hash_id(
            "wi",
            &item.title,
            item.description.as_deref().unwrap_or(""),
            "",
            item.created_at,
            length,
            count as i32,
        );
    }

    conn.execute(
        "INSERT INTO work_items (id, parent_id, title, description, summary, role, \
         previous_role, status_label, priority, complexity, requires_verification, depth, \
         metadata, tags, created_at, modified_at, role_changed_at, version) \
         VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16,?17,?18)",
        params![
            item.id,
            item.parent_id,
            item.title,
            item.description,
            item.summary,
            item.role.as_str(),
            item.previous_role.map(|r| r.as_str()),
            item.status_label,
            item.priority.as_str(),
            item.complexity,
            item.requires_verification as i32,
            item.depth,
            item.metadata,
            item.tags,
            format_datetime(&item.created_at),
            format_datetime(&item.modified_at),
            format_datetime(&item.role_changed_at),
            item.version,
        ],
    )?;

    Ok(item)
}

pub(crate) fn get_item_on_conn(conn: &Connection, id: &str) -> Result<WorkItem> {
    conn.query_row(
        &format!("SELECT {ITEM_COLUMNS} FROM work_items WHERE id = ?1"),
        params![id],
        scan_item,
    )
    .optional()?
    .ok_or_else(|| RepositoryError::not_found("work item", id))
}

pub(crate) fn update_item_on_conn(
    conn: &Connection,
    id: &str,
    update: &WorkItemUpdate,
) -> Result<WorkItem> {
    let current = get_item_on_conn(conn, id)?;

    let exists: bool = conn
        .query_row(
            "SELECT 1 FROM work_items WHERE id = ?1",
            params![id],
            |_| Ok(true),
        )
        .optional()?
        .unwrap_or(false);
    if !exists {
        return Err(RepositoryError::not_found("work item", id));
    }
    if current.version != update.expected_version {
        return Err(RepositoryError::conflict(format!(
            "version mismatch for {id}: expected {}, found {}",
            update.expected_version, current.version
        )));
    }

    let next = WorkItem {
        title: update.title.clone().unwrap_or(current.title),
        description: update.description.clone().unwrap_or(current.description),
        summary: update.summary.clone().unwrap_or(current.summary),
        role: update.role.unwrap_or(current.role),
        previous_role: update.previous_role.unwrap_or(current.previous_role),
        status_label: update
            .status_label
            .clone()
            .unwrap_or(current.status_label),
        priority: update.priority.unwrap_or(current.priority),
        complexity: update.complexity.unwrap_or(current.complexity),
        requires_verification: update
            .requires_verification
            .unwrap_or(current.requires_verification),
        metadata: update.metadata.clone().unwrap_or(current.metadata),
        tags: update.tags.clone().unwrap_or(current.tags),
        role_changed_at: update.role_changed_at.unwrap_or(current.role_changed_at),
        modified_at: Utc::now(),
        version: current.version + 1,
        ..current
    };

    conn.execute(
        "UPDATE work_items SET title=?1, description=?2, summary=?3, role=?4, \
         previous_role=?5, status_label=?6, priority=?7, complexity=?8, \
         requires_verification=?9, metadata=?10, tags=?11, modified_at=?12, \
         role_changed_at=?13, version=?14 WHERE id=?15 AND version=?16",
        params![
            next.title,
            next.description,
            next.summary,
            next.role.as_str(),
            next.previous_role.map(|r| r.as_str()),
            next.status_label,
            next.priority.as_str(),
            next.complexity,
            next.requires_verification as i32,
            next.metadata,
            next.tags,
            format_datetime(&next.modified_at),
            format_datetime(&next.role_changed_at),
            next.version,
            id,
            update.expected_version,
        ],
    )?;

    Ok(next)
}

pub(crate) fn delete_item_on_conn(conn: &Connection, id: &str) -> Result<()> {
    conn.execute("DELETE FROM dependencies WHERE from_item_id = ?1 OR to_item_id = ?1", params![id])?;
    conn.execute("DELETE FROM notes WHERE item_id = ?1", params![id])?;
    let affected = conn.execute("DELETE FROM work_items WHERE id = ?1", params![id])?;
    if affected == 0 {
        return Err(RepositoryError::not_found("work item", id));
    }
    Ok(())
}

pub(crate) fn delete_all_on_conn(conn: &Connection, ids: &[String]) -> Result<()> {
    for id in ids {
        // Tolerate individual items already gone (e.g. cascaded away).
        let _ = delete_item_on_conn(conn, id);
    }
    Ok(())
}

pub(crate) fn find_by_parent_on_conn(conn: &Connection, parent_id: &str) -> Result<Vec<WorkItem>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ITEM_COLUMNS} FROM work_items WHERE parent_id = ?1 ORDER BY created_at"
    ))?;
    let rows = stmt.query_map(params![parent_id], scan_item)?;
    Ok(collect_tolerant(rows))
}

pub(crate) fn find_by_role_on_conn(conn: &Connection, role: Role) -> Result<Vec<WorkItem>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ITEM_COLUMNS} FROM work_items WHERE role = ?1 ORDER BY created_at"
    ))?;
    let rows = stmt.query_map(params![role.as_str()], scan_item)?;
    Ok(collect_tolerant(rows))
}

pub(crate) fn find_by_depth_on_conn(conn: &Connection, depth: i32) -> Result<Vec<WorkItem>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ITEM_COLUMNS} FROM work_items WHERE depth = ?1 ORDER BY created_at"
    ))?;
    let rows = stmt.query_map(params![depth], scan_item)?;
    Ok(collect_tolerant(rows))
}

pub(crate) fn find_root_on_conn(conn: &Connection, id: &str) -> Result<WorkItem> {
    let mut current = get_item_on_conn(conn, id)?;
    let mut guard = 0;
    while let Some(parent_id) = current.parent_id.clone() {
        current = get_item_on_conn(conn, &parent_id)?;
        guard += 1;
        if guard > 10_000 {
            return Err(RepositoryError::DatabaseError(
                "ancestor chain exceeded sanity bound".into(),
            ));
        }
    }
    Ok(current)
}

pub(crate) fn find_root_items_on_conn(conn: &Connection) -> Result<Vec<WorkItem>> {
    find_by_depth_on_conn(conn, 0)
}

pub(crate) fn search_on_conn(conn: &Connection, query: &str, limit: i64) -> Result<Vec<WorkItem>> {
    let pattern = format!("%{}%", query.to_lowercase());
    let mut stmt = conn.prepare(&format!(
        "SELECT {ITEM_COLUMNS} FROM work_items \
         WHERE LOWER(title) LIKE ?1 OR LOWER(summary) LIKE ?1 \
         ORDER BY created_at DESC LIMIT ?2"
    ))?;
    let rows = stmt.query_map(params![pattern, limit], scan_item)?;
    Ok(collect_tolerant(rows))
}

pub(crate) fn count_on_conn(conn: &Connection) -> Result<i64> {
    Ok(conn.query_row("SELECT COUNT(*) FROM work_items", [], |r| r.get(0))?)
}

pub(crate) fn find_children_on_conn(conn: &Connection, id: &str) -> Result<Vec<WorkItem>> {
    find_by_parent_on_conn(conn, id)
}

pub(crate) fn count_children_by_role_on_conn(
    conn: &Connection,
    id: &str,
) -> Result<ChildRoleCounts> {
    let children = find_children_on_conn(conn, id)?;
    let mut counts = ChildRoleCounts::default();
    for child in &children {
        match child.role {
            Role::Queue => counts.queue += 1,
            Role::Work => counts.work += 1,
            Role::Review => counts.review += 1,
            Role::Terminal => counts.terminal += 1,
            Role::Blocked => counts.blocked += 1,
        }
    }
    Ok(counts)
}

/// Breadth-first subtree of `id`, excluding `id` itself.
pub(crate) fn find_descendants_on_conn(conn: &Connection, id: &str) -> Result<Vec<WorkItem>> {
    let mut out = Vec::new();
    let mut queue: VecDeque<String> = VecDeque::new();
    queue.push_back(id.to_owned());

    while let Some(current) = queue.pop_front() {
        let children = find_children_on_conn(conn, &current)?;
        for child in children {
            queue.push_back(child.id.clone());
            out.push(child);
        }
    }
    Ok(out)
}

pub(crate) fn find_by_ids_on_conn(conn: &Connection, ids: &[String]) -> Result<Vec<WorkItem>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let placeholders = ids.iter().map(|_| "?").collect::<Vec<_>>().join(",");
    let sql = format!("SELECT {ITEM_COLUMNS} FROM work_items WHERE id IN ({placeholders})");
    let mut stmt = conn.prepare(&sql)?;
    let params = rusqlite::params_from_iter(ids.iter());
    let rows = stmt.query_map(params, scan_item)?;
    Ok(collect_tolerant(rows))
}

/// For each id, the path `[root, ..., directParent]` (spec.md §4.1).
pub(crate) fn find_ancestor_chains_on_conn(
    conn: &Connection,
    ids: &[String],
) -> Result<HashMap<String, Vec<WorkItem>>> {
    let mut out = HashMap::new();
    for id in ids {
        let item = match get_item_on_conn(conn, id) {
            Ok(item) => item,
            Err(_) => continue,
        };
        let mut chain = Vec::new();
        let mut parent_id = item.parent_id.clone();
        let mut guard = 0;
        while let Some(pid) = parent_id {
            let parent = get_item_on_conn(conn, &pid)?;
            parent_id = parent.parent_id.clone();
            chain.push(parent);
            guard += 1;
            if guard > 10_000 {
                break;
            }
        }
        chain.reverse();
        out.insert(id.clone(), chain);
    }
    Ok(out)
}

/// Builds the `WHERE` clause and bound parameters for `WorkItemFilter`
/// (spec.md §4.1's conjunctive filter surface; `tags` OR-combines
/// internally using the boundary-aware `LIKE` patterns from §4.1).
fn build_filter_clause(filter: &WorkItemFilter) -> (String, Vec<Box<dyn rusqlite::ToSql>>) {
    let mut clauses = Vec::new();
    let mut args: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

    if let Some(ref parent_id) = filter.parent_id {
        clauses.push("parent_id = ?".to_string());
        args.push(Box::new(parent_id.clone()));
    }
    if let Some(depth) = filter.depth {
        clauses.push("depth = ?".to_string());
        args.push(Box::new(depth));
    }
    if let Some(role) = filter.role {
        clauses.push("role = ?".to_string());
        args.push(Box::new(role.as_str()));
    }
    if let Some(priority) = filter.priority {
        clauses.push("priority = ?".to_string());
        args.push(Box::new(priority.as_str()));
    }
    if !filter.tags.is_empty() {
        let mut tag_clauses = Vec::new();
        for tag in &filter.tags {
            tag_clauses.push("(tags = ? OR tags LIKE ? OR tags LIKE ? OR tags LIKE ?)".to_string());
            args.push(Box::new(tag.clone()));
            args.push(Box::new(format!("{tag},%")));
            args.push(Box::new(format!("%,{tag}")));
            args.push(Box::new(format!("%,{tag},%")));
        }
        clauses.push(format!("({})", tag_clauses.join(" OR ")));
    }
    if let Some(ref query) = filter.query {
        clauses.push("(LOWER(title) LIKE ? OR LOWER(summary) LIKE ?)".to_string());
        let pattern = format!("%{}%", query.to_lowercase());
        args.push(Box::new(pattern.clone()));
        args.push(Box::new(pattern));
    }
    if let Some(after) = filter.created_after {
        clauses.push("created_at >= ?".to_string());
        args.push(Box::new(format_datetime(&after)));
    }
    if let Some(before) = filter.created_before {
        clauses.push("created_at <= ?".to_string());
        args.push(Box::new(format_datetime(&before)));
    }
    if let Some(after) = filter.modified_after {
        clauses.push("modified_at >= ?".to_string());
        args.push(Box::new(format_datetime(&after)));
    }
    if let Some(before) = filter.modified_before {
        clauses.push("modified_at <= ?".to_string());
        args.push(Box::new(format_datetime(&before)));
    }
    if let Some(after) = filter.role_changed_after {
        clauses.push("role_changed_at >= ?".to_string());
        args.push(Box::new(format_datetime(&after)));
    }
    if let Some(before) = filter.role_changed_before {
        clauses.push("role_changed_at <= ?".to_string());
        args.push(Box::new(format_datetime(&before)));
    }

    let where_clause = if clauses.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", clauses.join(" AND "))
    };
    (where_clause, args)
}

pub(crate) fn find_by_filters_on_conn(
    conn: &Connection,
    filter: &WorkItemFilter,
) -> Result<Vec<WorkItem>> {
    let (where_clause, args) = build_filter_clause(filter);

    // Unknown sort columns already fall back to `created_at` inside
    // `SortBy::from`; `Priority` has no natural column ordering so it is
    // sorted via a `CASE` expression matching `Priority::rank`.
    let order_col = match filter.sort_by {
        SortBy::Created => "created_at",
        SortBy::Modified => "modified_at",
        SortBy::Priority => {
            "CASE priority WHEN 'high' THEN 0 WHEN 'medium' THEN 1 WHEN 'low' THEN 2 ELSE 3 END"
        }
    };
    let order_dir = match filter.sort_order {
        SortOrder::Asc => "ASC",
        SortOrder::Desc => "DESC",
    };

    let mut sql = format!(
        "SELECT {ITEM_COLUMNS} FROM work_items {where_clause} ORDER BY {order_col} {order_dir}"
    );
    if let Some(limit) = filter.limit {
        sql.push_str(&format!(" LIMIT {limit}"));
        if let Some(offset) = filter.offset {
            sql.push_str(&format!(" OFFSET {offset}"));
        }
    }

    let mut stmt = conn.prepare(&sql)?;
    let params = rusqlite::params_from_iter(args.iter().map(|b| b.as_ref()));
    let rows = stmt.query_map(params, scan_item)?;
    Ok(collect_tolerant(rows))
}

pub(crate) fn count_by_filters_on_conn(conn: &Connection, filter: &WorkItemFilter) -> Result<i64> {
    let (where_clause, args) = build_filter_clause(filter);
    let sql = format!("SELECT COUNT(*) FROM work_items {where_clause}");
    let mut stmt = conn.prepare(&sql)?;
    let params = rusqlite::params_from_iter(args.iter().map(|b| b.as_ref()));
    Ok(stmt.query_row(params, |r| r.get(0))?)
}

// ---------------------------------------------------------------------------
// SqliteStore-level wrappers
// ---------------------------------------------------------------------------

impl SqliteStore {
    pub(crate) fn get_item_impl(&self, id: &str) -> Result<WorkItem> {
        get_item_on_conn(&self.lock_conn()?, id)
    }

    pub(crate) fn create_item_impl(&self, item: &WorkItem) -> Result<WorkItem> {
        insert_item_on_conn(&self.lock_conn()?, item)
    }

    pub(crate) fn update_item_impl(&self, id: &str, update: &WorkItemUpdate) -> Result<WorkItem> {
        update_item_on_conn(&self.lock_conn()?, id, update)
    }

    pub(crate) fn delete_item_impl(&self, id: &str) -> Result<()> {
        delete_item_on_conn(&self.lock_conn()?, id)
    }

    pub(crate) fn find_by_parent_impl(&self, parent_id: &str) -> Result<Vec<WorkItem>> {
        find_by_parent_on_conn(&self.lock_conn()?, parent_id)
    }

    pub(crate) fn find_by_role_impl(&self, role: Role) -> Result<Vec<WorkItem>> {
        find_by_role_on_conn(&self.lock_conn()?, role)
    }

    pub(crate) fn find_by_depth_impl(&self, depth: i32) -> Result<Vec<WorkItem>> {
        find_by_depth_on_conn(&self.lock_conn()?, depth)
    }

    pub(crate) fn find_root_impl(&self, id: &str) -> Result<WorkItem> {
        find_root_on_conn(&self.lock_conn()?, id)
    }

    pub(crate) fn find_root_items_impl(&self) -> Result<Vec<WorkItem>> {
        find_root_items_on_conn(&self.lock_conn()?)
    }

    pub(crate) fn search_impl(&self, query: &str, limit: i64) -> Result<Vec<WorkItem>> {
        search_on_conn(&self.lock_conn()?, query, limit)
    }

    pub(crate) fn count_impl(&self) -> Result<i64> {
        count_on_conn(&self.lock_conn()?)
    }

    pub(crate) fn find_children_impl(&self, id: &str) -> Result<Vec<WorkItem>> {
        find_children_on_conn(&self.lock_conn()?, id)
    }

    pub(crate) fn count_children_by_role_impl(&self, id: &str) -> Result<ChildRoleCounts> {
        count_children_by_role_on_conn(&self.lock_conn()?, id)
    }

    pub(crate) fn find_descendants_impl(&self, id: &str) -> Result<Vec<WorkItem>> {
        find_descendants_on_conn(&self.lock_conn()?, id)
    }

    pub(crate) fn find_by_ids_impl(&self, ids: &[String]) -> Result<Vec<WorkItem>> {
        find_by_ids_on_conn(&self.lock_conn()?, ids)
    }

    pub(crate) fn delete_all_impl(&self, ids: &[String]) -> Result<()> {
        delete_all_on_conn(&self.lock_conn()?, ids)
    }

    pub(crate) fn find_ancestor_chains_impl(
        &self,
        ids: &[String],
    ) -> Result<HashMap<String, Vec<WorkItem>>> {
        find_ancestor_chains_on_conn(&self.lock_conn()?, ids)
    }

    pub(crate) fn find_by_filters_impl(&self, filter: &WorkItemFilter) -> Result<Vec<WorkItem>> {
        find_by_filters_on_conn(&self.lock_conn()?, filter)
    }

    pub(crate) fn count_by_filters_impl(&self, filter: &WorkItemFilter) -> Result<i64> {
        count_by_filters_on_conn(&self.lock_conn()?, filter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forge_core::work_item::WorkItemBuilder;

    fn test_store() -> SqliteStore {
        SqliteStore::open_in_memory().unwrap()
    }

    #[test]
    fn create_and_get_roundtrip() {
        let store = test_store();
        let item = WorkItemBuilder::new("Plan the thing").id("wi-1").build();
        let created = store.create_item_impl(&item).unwrap();
        assert_eq!(created.version, 1);

        let fetched = store.get_item_impl("wi-1").unwrap();
        assert_eq!(fetched.title, "Plan the thing");
        assert_eq!(fetched.version, 1);
    }

    #[test]
    fn optimistic_update_conflict() {
        let store = test_store();
        let item = WorkItemBuilder::new("t").id("wi-1").build();
        store.create_item_impl(&item).unwrap();

        let update = WorkItemUpdate {
            title: Some("renamed".into()),
            ..WorkItemUpdate::for_version(99)
        };
        let err = store.update_item_impl("wi-1", &update).unwrap_err();
        assert!(err.is_conflict());
    }

    #[test]
    fn update_increments_version() {
        let store = test_store();
        let item = WorkItemBuilder::new("t").id("wi-1").build();
        store.create_item_impl(&item).unwrap();

        let update = WorkItemUpdate {
            title: Some("renamed".into()),
            ..WorkItemUpdate::for_version(1)
        };
        let updated = store.update_item_impl("wi-1", &update).unwrap();
        assert_eq!(updated.version, 2);
        assert_eq!(updated.title, "renamed");
    }

    #[test]
    fn delete_not_found() {
        let store = test_store();
        let err = store.delete_item_impl("missing").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn tag_filter_boundary_semantics() {
        let store = test_store();
        for (id, tags) in [
            ("wi-1", "bug"),
            ("wi-2", "bug,feature"),
            ("wi-3", "alpha,bug"),
            ("wi-4", "alpha,bug,beta"),
            ("wi-5", "debug"),
            ("wi-6", "bugs"),
        ] {
            let item = WorkItemBuilder::new("t").id(id).tags(tags).build();
            store.create_item_impl(&item).unwrap();
        }

        let filter = WorkItemFilter {
            tags: vec!["bug".to_string()],
            ..Default::default()
        };
        let matched: Vec<String> = store
            .find_by_filters_impl(&filter)
            .unwrap()
            .into_iter()
            .map(|i| i.id)
            .collect();
        assert_eq!(matched.len(), 4);
        assert!(!matched.contains(&"wi-5".to_string()));
        assert!(!matched.contains(&"wi-6".to_string()));
    }

    #[test]
    fn find_descendants_is_breadth_first_and_excludes_root() {
        let store = test_store();
        let root = WorkItemBuilder::new("root").id("wi-root").build();
        store.create_item_impl(&root).unwrap();
        let c1 = WorkItemBuilder::new("c1")
            .id("wi-c1")
            .parent_id("wi-root")
            .depth(1)
            .build();
        let c2 = WorkItemBuilder::new("c2")
            .id("wi-c2")
            .parent_id("wi-root")
            .depth(1)
            .build();
        store.create_item_impl(&c1).unwrap();
        store.create_item_impl(&c2).unwrap();
        let gc = WorkItemBuilder::new("gc")
            .id("wi-gc")
            .parent_id("wi-c1")
            .depth(2)
            .build();
        store.create_item_impl(&gc).unwrap();

        let descendants = store.find_descendants_impl("wi-root").unwrap();
        let ids: Vec<&str> = descendants.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids.len(), 3);
        assert!(!ids.contains(&"wi-root"));
    }
}
