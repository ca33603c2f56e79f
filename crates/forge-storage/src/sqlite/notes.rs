//! Note CRUD operations for [`SqliteStore`] (spec.md §4.1).

use rusqlite::{Connection, OptionalExtension, Row, params};

use forge_core::enums::NoteRole;
use forge_core::idgen;
use forge_core::note::Note;

use crate::error::{RepositoryError, Result};
use crate::sqlite::store::SqliteStore;
use crate::sqlite::util::{collect_tolerant, format_datetime, parse_datetime};

pub(crate) const NOTE_COLUMNS: &str = "id, item_id, key, role, body, created_at, modified_at";

pub(crate) fn scan_note(row: &Row<'_>) -> rusqlite::Result<Note> {
    let role_str: String = row.get("role")?;
    let created_at_str: String = row.get("created_at")?;
    let modified_at_str: String = row.get("modified_at")?;

    Ok(Note {
        id: row.get("id")?,
        item_id: row.get("item_id")?,
        key: row.get("key")?,
        role: NoteRole::try_from(role_str.as_str()).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })?,
        body: row.get("body")?,
        created_at: parse_datetime(&created_at_str)?,
        modified_at: parse_datetime(&modified_at_str)?,
    })
}

/// Keyed by `(itemId, key)`, preserving the existing `id` when present
/// (spec.md §4.1 "upsert(note)").
pub(crate) fn upsert_note_on_conn(conn: &Connection, note: &Note) -> Result<Note> {
    let existing_id: Option<String> = conn
        .query_row(
            "SELECT id FROM notes WHERE item_id = ?1 AND key = ?2",
            params![note.item_id, note.key],
            |row| row.get(0),
        )
        .optional()?;

    let mut note = note.clone();
    let now = chrono::Utc::now();
    note.modified_at = now;

    match existing_id {
        Some(id) => {
            note.id = id;
            conn.execute(
                "UPDATE notes SET role = ?1, body = ?2, modified_at = ?3 WHERE item_id = ?4 AND key = ?5",
                params![
                    note.role.as_str(),
                    note.body,
                    format_datetime(&note.modified_at),
                    note.item_id,
                    note.key,
                ],
            )?;
        }
        None => {
            if note.id.is_empty() {
                note.id = idgen::generate_hash_id("note", &note.item_id, &note.key, "", now, 6, 0);
            }
            note.created_at = now;
            conn.execute(
                "INSERT INTO notes (id, item_id, key, role, body, created_at, modified_at) \
                 VALUES (?1,?2,?3,?4,?5,?6,?7)",
                params![
                    note.id,
                    note.item_id,
                    note.key,
                    note.role.as_str(),
                    note.body,
                    format_datetime(&note.created_at),
                    format_datetime(&note.modified_at),
                ],
            )?;
        }
    }

    Ok(note)
}

pub(crate) fn get_note_on_conn(conn: &Connection, id: &str) -> Result<Note> {
    conn.query_row(
        &format!("SELECT {NOTE_COLUMNS} FROM notes WHERE id = ?1"),
        params![id],
        scan_note,
    )
    .optional()?
    .ok_or_else(|| RepositoryError::not_found("note", id))
}

pub(crate) fn delete_note_on_conn(conn: &Connection, id: &str) -> Result<()> {
    let affected = conn.execute("DELETE FROM notes WHERE id = ?1", params![id])?;
    if affected == 0 {
        return Err(RepositoryError::not_found("note", id));
    }
    Ok(())
}

pub(crate) fn delete_notes_by_item_on_conn(conn: &Connection, item_id: &str) -> Result<()> {
    conn.execute("DELETE FROM notes WHERE item_id = ?1", params![item_id])?;
    Ok(())
}

pub(crate) fn find_notes_by_item_on_conn(
    conn: &Connection,
    item_id: &str,
    role: Option<NoteRole>,
) -> Result<Vec<Note>> {
    let rows = match role {
        Some(role) => {
            let mut stmt = conn.prepare(&format!(
                "SELECT {NOTE_COLUMNS} FROM notes WHERE item_id = ?1 AND role = ?2 ORDER BY key"
            ))?;
            collect_tolerant(stmt.query_map(params![item_id, role.as_str()], scan_note)?)
        }
        None => {
            let mut stmt = conn.prepare(&format!(
                "SELECT {NOTE_COLUMNS} FROM notes WHERE item_id = ?1 ORDER BY key"
            ))?;
            collect_tolerant(stmt.query_map(params![item_id], scan_note)?)
        }
    };
    Ok(rows)
}

pub(crate) fn find_note_by_item_and_key_on_conn(
    conn: &Connection,
    item_id: &str,
    key: &str,
) -> Result<Option<Note>> {
    Ok(conn
        .query_row(
            &format!("SELECT {NOTE_COLUMNS} FROM notes WHERE item_id = ?1 AND key = ?2"),
            params![item_id, key],
            scan_note,
        )
        .optional()?)
}

impl SqliteStore {
    pub(crate) fn upsert_note_impl(&self, note: &Note) -> Result<Note> {
        upsert_note_on_conn(&self.lock_conn()?, note)
    }

    pub(crate) fn get_note_impl(&self, id: &str) -> Result<Note> {
        get_note_on_conn(&self.lock_conn()?, id)
    }

    pub(crate) fn delete_note_impl(&self, id: &str) -> Result<()> {
        delete_note_on_conn(&self.lock_conn()?, id)
    }

    pub(crate) fn delete_notes_by_item_impl(&self, item_id: &str) -> Result<()> {
        delete_notes_by_item_on_conn(&self.lock_conn()?, item_id)
    }

    pub(crate) fn find_notes_by_item_impl(
        &self,
        item_id: &str,
        role: Option<NoteRole>,
    ) -> Result<Vec<Note>> {
        find_notes_by_item_on_conn(&self.lock_conn()?, item_id, role)
    }

    pub(crate) fn find_note_by_item_and_key_impl(
        &self,
        item_id: &str,
        key: &str,
    ) -> Result<Option<Note>> {
        find_note_by_item_and_key_on_conn(&self.lock_conn()?, item_id, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::items::insert_item_on_conn;
    use forge_core::work_item::WorkItemBuilder;

    fn test_store() -> SqliteStore {
        let store = SqliteStore::open_in_memory().unwrap();
        let conn = store.lock_conn().unwrap();
        insert_item_on_conn(&conn, &WorkItemBuilder::new("t").id("wi-1").build()).unwrap();
        drop(conn);
        store
    }

    fn note(item_id: &str, key: &str, body: &str) -> Note {
        Note {
            id: String::new(),
            item_id: item_id.into(),
            key: key.into(),
            role: NoteRole::Work,
            body: body.into(),
            created_at: chrono::Utc::now(),
            modified_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn upsert_is_idempotent_on_item_and_key() {
        let store = test_store();
        let first = store.upsert_note_impl(&note("wi-1", "acceptance-criteria", "v1")).unwrap();
        let second = store
            .upsert_note_impl(&note("wi-1", "acceptance-criteria", "v2"))
            .unwrap();
        assert_eq!(first.id, second.id);

        let all = store.find_notes_by_item_impl("wi-1", None).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].body, "v2");
    }

    #[test]
    fn delete_by_item_removes_all() {
        let store = test_store();
        store.upsert_note_impl(&note("wi-1", "a", "x")).unwrap();
        store.upsert_note_impl(&note("wi-1", "b", "y")).unwrap();
        store.delete_notes_by_item_impl("wi-1").unwrap();
        assert!(store.find_notes_by_item_impl("wi-1", None).unwrap().is_empty());
    }
}
