//! Note-schema gates (spec.md §4.3.3). Applied by the tool handler around
//! the engine's resolve/validate/apply phases, not inside them -- kept in
//! this crate because the logic is pure and shared by every call site that
//! needs it (`advance_item`, `complete_tree`).

use std::collections::HashMap;

use forge_core::enums::{NoteRole, Role};
use forge_core::note::Note;
use forge_core::note_schema::NoteSchemaEntry;

/// Checks the `start` gate: required notes whose `role` equals the
/// **current** role must have a non-empty body.
///
/// Returns the missing keys; an empty vector means the gate passed.
pub fn start_gate(
    current_role: Role,
    notes: &[Note],
    schema: Option<&[NoteSchemaEntry]>,
) -> Vec<String> {
    let Some(schema) = schema else {
        return Vec::new(); // no schema match => gate passes vacuously
    };
    let Ok(current_note_role) = NoteRole::try_from(current_role.as_str()) else {
        return Vec::new(); // current role has no note-schema counterpart
    };

    let bodies = note_bodies(notes);
    schema
        .iter()
        .filter(|entry| entry.required && entry.role == current_note_role)
        .filter(|entry| !has_body(&bodies, &entry.key))
        .map(|entry| entry.key.clone())
        .collect()
}

/// Checks the `complete` gate: every required note across all roles must
/// have a non-empty body.
pub fn complete_gate(notes: &[Note], schema: Option<&[NoteSchemaEntry]>) -> Vec<String> {
    let Some(schema) = schema else {
        return Vec::new();
    };

    let bodies = note_bodies(notes);
    schema
        .iter()
        .filter(|entry| entry.required)
        .filter(|entry| !has_body(&bodies, &entry.key))
        .map(|entry| entry.key.clone())
        .collect()
}

/// One schema entry's presence status on the item, reported back to the
/// caller of `advance_item` (spec.md §4.4: "expectedNotes ... each tagged
/// with `exists`").
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpectedNote {
    pub key: String,
    pub role: NoteRole,
    pub required: bool,
    pub exists: bool,
}

/// The schema entries matching `target_role`, each tagged with whether the
/// item already carries a note under that key.
pub fn expected_notes(
    target_role: Role,
    notes: &[Note],
    schema: Option<&[NoteSchemaEntry]>,
) -> Vec<ExpectedNote> {
    let Some(schema) = schema else {
        return Vec::new();
    };
    let Ok(target_note_role) = NoteRole::try_from(target_role.as_str()) else {
        return Vec::new();
    };

    let bodies = note_bodies(notes);
    schema
        .iter()
        .filter(|entry| entry.role == target_note_role)
        .map(|entry| ExpectedNote {
            key: entry.key.clone(),
            role: entry.role,
            required: entry.required,
            exists: bodies.contains_key(entry.key.as_str()),
        })
        .collect()
}

fn note_bodies(notes: &[Note]) -> HashMap<&str, &str> {
    notes
        .iter()
        .map(|n| (n.key.as_str(), n.body.as_str()))
        .collect()
}

fn has_body(bodies: &HashMap<&str, &str>, key: &str) -> bool {
    bodies.get(key).is_some_and(|body| !body.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn note(key: &str, role: NoteRole, body: &str) -> Note {
        Note {
            id: format!("note-{key}"),
            item_id: "item".into(),
            key: key.into(),
            role,
            body: body.into(),
            created_at: Utc::now(),
            modified_at: Utc::now(),
        }
    }

    fn entry(key: &str, role: NoteRole, required: bool) -> NoteSchemaEntry {
        NoteSchemaEntry {
            key: key.into(),
            role,
            required,
            description: String::new(),
            guidance: None,
        }
    }

    #[test]
    fn no_schema_match_passes_vacuously() {
        assert!(start_gate(Role::Queue, &[], None).is_empty());
        assert!(complete_gate(&[], None).is_empty());
    }

    #[test]
    fn start_gate_checks_current_role_only() {
        let schema = vec![
            entry("acceptance-criteria", NoteRole::Work, true),
            entry("intake", NoteRole::Queue, true),
        ];
        let missing = start_gate(Role::Queue, &[], Some(&schema));
        assert_eq!(missing, vec!["intake".to_string()]);
    }

    #[test]
    fn start_gate_passes_when_body_present() {
        let schema = vec![entry("intake", NoteRole::Queue, true)];
        let notes = vec![note("intake", NoteRole::Queue, "filled in")];
        assert!(start_gate(Role::Queue, &notes, Some(&schema)).is_empty());
    }

    #[test]
    fn complete_gate_checks_every_role() {
        let schema = vec![
            entry("acceptance-criteria", NoteRole::Work, true),
            entry("post-mortem", NoteRole::Review, true),
        ];
        let notes = vec![note("acceptance-criteria", NoteRole::Work, "done")];
        let missing = complete_gate(&notes, Some(&schema));
        assert_eq!(missing, vec!["post-mortem".to_string()]);
    }

    #[test]
    fn expected_notes_reports_existence() {
        let schema = vec![entry("acceptance-criteria", NoteRole::Work, true)];
        let notes = vec![note("acceptance-criteria", NoteRole::Work, "done")];
        let expected = expected_notes(Role::Work, &notes, Some(&schema));
        assert_eq!(expected.len(), 1);
        assert!(expected[0].exists);
    }
}
