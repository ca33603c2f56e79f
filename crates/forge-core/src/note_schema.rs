//! The note-schema service contract (spec.md §3.1 `NoteSchema`, §6).
//!
//! The schema itself lives outside the core (a configuration file, per
//! spec.md §6: "Opaque source... the core only observes the returned
//! shape"); this module only defines the shape the workflow engine and
//! gate checks consume.

use crate::enums::NoteRole;

/// One required-or-optional note slot for a tag set.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteSchemaEntry {
    pub key: String,
    pub role: NoteRole,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guidance: Option<String>,
}

/// Looked up by an item's tags; resolves which notes are expected at which
/// role (spec.md §4.3.3's gates, §4.4's `expectedNotes`).
pub trait NoteSchemaSource: Send + Sync {
    /// The schema entries applicable to this tag set, or `None` if no
    /// schema matches (spec.md §4.3.3: "No schema match ⟹ gate passes
    /// vacuously").
    fn schema_for_tags(&self, tags: &[&str]) -> Option<Vec<NoteSchemaEntry>>;

    /// `true` iff the schema for `tags` has at least one entry with
    /// `role == NoteRole::Review` (spec.md §4.3.1's `hasReviewPhase`).
    fn has_review_phase(&self, tags: &[&str]) -> bool {
        self.schema_for_tags(tags)
            .map(|entries| entries.iter().any(|e| e.role == NoteRole::Review))
            .unwrap_or(false)
    }
}

/// A schema source with no entries for any tag set; every gate passes
/// vacuously and `hasReviewPhase` is always false. Useful as a default and
/// in tests that don't exercise the note-schema gate.
pub struct EmptyNoteSchemaSource;

impl NoteSchemaSource for EmptyNoteSchemaSource {
    fn schema_for_tags(&self, _tags: &[&str]) -> Option<Vec<NoteSchemaEntry>> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_source_has_no_review_phase() {
        let source = EmptyNoteSchemaSource;
        assert!(!source.has_review_phase(&["bug"]));
        assert!(source.schema_for_tags(&["bug"]).is_none());
    }

    struct FixedSource(Vec<NoteSchemaEntry>);
    impl NoteSchemaSource for FixedSource {
        fn schema_for_tags(&self, _tags: &[&str]) -> Option<Vec<NoteSchemaEntry>> {
            Some(self.0.clone())
        }
    }

    #[test]
    fn has_review_phase_true_when_any_entry_is_review() {
        let source = FixedSource(vec![
            NoteSchemaEntry {
                key: "acceptance-criteria".into(),
                role: NoteRole::Work,
                required: true,
                description: String::new(),
                guidance: None,
            },
            NoteSchemaEntry {
                key: "post-mortem".into(),
                role: NoteRole::Review,
                required: true,
                description: String::new(),
                guidance: None,
            },
        ]);
        assert!(source.has_review_phase(&["any"]));
    }
}
