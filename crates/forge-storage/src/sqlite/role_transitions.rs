//! RoleTransition audit-log operations for [`SqliteStore`] (spec.md §4.1).

use rusqlite::{Connection, Row, params};

use forge_core::enums::{Role, Trigger};
use forge_core::role_transition::RoleTransition;

use crate::error::Result;
use crate::sqlite::store::SqliteStore;
use crate::sqlite::util::{collect_tolerant, format_datetime, parse_datetime};

pub(crate) const ROLE_TRANSITION_COLUMNS: &str =
    "id, item_id, from_role, to_role, trigger, summary, status_label, occurred_at";

pub(crate) fn scan_role_transition(row: &Row<'_>) -> rusqlite::Result<RoleTransition> {
    let from_role_str: String = row.get("from_role")?;
    let to_role_str: String = row.get("to_role")?;
    let trigger_str: String = row.get("trigger")?;
    let occurred_at_str: String = row.get("occurred_at")?;

    Ok(RoleTransition {
        id: row.get("id")?,
        item_id: row.get("item_id")?,
        from_role: Role::try_from(from_role_str.as_str()).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })?,
        to_role: Role::try_from(to_role_str.as_str()).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })?,
        trigger: Trigger::try_from(trigger_str.as_str()).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })?,
        summary: row.get("summary")?,
        status_label: row.get("status_label")?,
        occurred_at: parse_datetime(&occurred_at_str)?,
    })
}

pub(crate) fn append_role_transition_on_conn(
    conn: &Connection,
    record: &RoleTransition,
) -> Result<RoleTransition> {
    conn.execute(
        "INSERT INTO role_transitions (item_id, from_role, to_role, trigger, summary, status_label, occurred_at) \
         VALUES (?1,?2,?3,?4,?5,?6,?7)",
        params![
            record.item_id,
            record.from_role.as_str(),
            record.to_role.as_str(),
            record.trigger.as_str(),
            record.summary,
            record.status_label,
            format_datetime(&record.occurred_at),
        ],
    )?;
    let id = conn.last_insert_rowid();
    Ok(RoleTransition {
        id,
        ..record.clone()
    })
}

pub(crate) fn find_role_transitions_by_item_on_conn(
    conn: &Connection,
    item_id: &str,
) -> Result<Vec<RoleTransition>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ROLE_TRANSITION_COLUMNS} FROM role_transitions WHERE item_id = ?1 ORDER BY occurred_at ASC, id ASC"
    ))?;
    let rows = stmt.query_map(params![item_id], scan_role_transition)?;
    Ok(collect_tolerant(rows))
}

impl SqliteStore {
    pub(crate) fn append_role_transition_impl(&self, record: &RoleTransition) -> Result<RoleTransition> {
        append_role_transition_on_conn(&self.lock_conn()?, record)
    }

    pub(crate) fn find_role_transitions_by_item_impl(&self, item_id: &str) -> Result<Vec<RoleTransition>> {
        find_role_transitions_by_item_on_conn(&self.lock_conn()?, item_id)
    }
}
