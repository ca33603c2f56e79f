//! Validation rules for work items, dependencies, and notes.

use crate::dependency::Dependency;
use crate::enums::DependencyType;
use crate::note::Note;
use crate::work_item::WorkItem;

/// Error type for validation failures.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("title is required")]
    TitleRequired,

    #[error("title must be 500 characters or less (got {0})")]
    TitleTooLong(usize),

    #[error("summary must be 2000 characters or less (got {0})")]
    SummaryTooLong(usize),

    #[error("description must not be blank when present")]
    BlankDescription,

    #[error("complexity must be between 1 and 10 (got {0})")]
    InvalidComplexity(i32),

    #[error("invalid tag {0:?}: must match [a-z0-9][a-z0-9-]*")]
    InvalidTag(String),

    #[error("parentId must be set iff depth is non-zero")]
    ParentDepthMismatch,

    #[error("update would move modifiedAt backwards")]
    ModifiedAtRegression,

    #[error("a dependency's fromItemId and toItemId must differ")]
    SelfDependency,

    #[error("RELATES_TO dependencies must not set unblockAt")]
    RelatesToWithUnblockAt,

    #[error("note key must be 200 characters or less (got {0})")]
    NoteKeyTooLong(usize),
}

/// Validates a work item's content invariants (spec.md §3.1).
///
/// Does not check `parentId`/`depth` consistency against the persisted
/// parent -- that check requires a repository lookup and lives in the
/// tool handlers (spec.md §4.4, "parent existence; depth derivation").
pub fn validate_work_item(item: &WorkItem) -> Result<(), ValidationError> {
    if item.title.trim().is_empty() {
        return Err(ValidationError::TitleRequired);
    }
    if item.title.chars().count() > 500 {
        return Err(ValidationError::TitleTooLong(item.title.chars().count()));
    }
    if let Some(ref description) = item.description {
        if description.trim().is_empty() {
            return Err(ValidationError::BlankDescription);
        }
    }
    if item.summary.chars().count() > 2000 {
        return Err(ValidationError::SummaryTooLong(item.summary.chars().count()));
    }
    if let Some(complexity) = item.complexity {
        if !(1..=10).contains(&complexity) {
            return Err(ValidationError::InvalidComplexity(complexity));
        }
    }
    if (item.parent_id.is_none()) != (item.depth == 0) {
        return Err(ValidationError::ParentDepthMismatch);
    }
    for tag in item.tag_list() {
        if !is_valid_tag(tag) {
            return Err(ValidationError::InvalidTag(tag.to_owned()));
        }
    }
    Ok(())
}

/// `true` iff `tag` matches `[a-z0-9][a-z0-9-]*`.
fn is_valid_tag(tag: &str) -> bool {
    let mut chars = tag.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() || c.is_ascii_digit() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

/// Validates a dependency edge's structural invariants (spec.md §3.1,
/// §4.2 step 1: "Validate each edge structurally").
pub fn validate_dependency(dep: &Dependency) -> Result<(), ValidationError> {
    if dep.from_item_id == dep.to_item_id {
        return Err(ValidationError::SelfDependency);
    }
    if dep.dep_type == DependencyType::RelatesTo && dep.unblock_at.is_some() {
        return Err(ValidationError::RelatesToWithUnblockAt);
    }
    Ok(())
}

/// Validates a note's structural invariants.
pub fn validate_note(note: &Note) -> Result<(), ValidationError> {
    if note.key.chars().count() > 200 {
        return Err(ValidationError::NoteKeyTooLong(note.key.chars().count()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enums::{DependencyType, NoteRole};
    use crate::work_item::WorkItemBuilder;
    use chrono::Utc;

    #[test]
    fn valid_item_passes() {
        let item = WorkItemBuilder::new("Write the spec").build();
        assert!(validate_work_item(&item).is_ok());
    }

    #[test]
    fn empty_title_fails() {
        let item = WorkItemBuilder::new("").build();
        assert!(matches!(
            validate_work_item(&item),
            Err(ValidationError::TitleRequired)
        ));
    }

    #[test]
    fn title_exactly_500_is_accepted() {
        let item = WorkItemBuilder::new("x".repeat(500)).build();
        assert!(validate_work_item(&item).is_ok());
    }

    #[test]
    fn title_501_is_rejected() {
        let item = WorkItemBuilder::new("x".repeat(501)).build();
        assert!(matches!(
            validate_work_item(&item),
            Err(ValidationError::TitleTooLong(501))
        ));
    }

    #[test]
    fn summary_2000_accepted_2001_rejected() {
        let mut item = WorkItemBuilder::new("t").build();
        item.summary = "x".repeat(2000);
        assert!(validate_work_item(&item).is_ok());
        item.summary = "x".repeat(2001);
        assert!(matches!(
            validate_work_item(&item),
            Err(ValidationError::SummaryTooLong(2001))
        ));
    }

    #[test]
    fn complexity_boundaries() {
        let mut item = WorkItemBuilder::new("t").build();
        item.complexity = Some(1);
        assert!(validate_work_item(&item).is_ok());
        item.complexity = Some(10);
        assert!(validate_work_item(&item).is_ok());
        item.complexity = Some(0);
        assert!(matches!(
            validate_work_item(&item),
            Err(ValidationError::InvalidComplexity(0))
        ));
        item.complexity = Some(11);
        assert!(matches!(
            validate_work_item(&item),
            Err(ValidationError::InvalidComplexity(11))
        ));
    }

    #[test]
    fn parent_depth_consistency() {
        let mut item = WorkItemBuilder::new("t").build();
        item.depth = 1;
        assert!(matches!(
            validate_work_item(&item),
            Err(ValidationError::ParentDepthMismatch)
        ));
        item.parent_id = Some("parent".into());
        assert!(validate_work_item(&item).is_ok());
    }

    #[test]
    fn tag_format_rejects_uppercase_and_leading_dash() {
        let item = WorkItemBuilder::new("t").tags("Bug").build();
        assert!(matches!(
            validate_work_item(&item),
            Err(ValidationError::InvalidTag(_))
        ));
        let item = WorkItemBuilder::new("t").tags("-bug").build();
        assert!(matches!(
            validate_work_item(&item),
            Err(ValidationError::InvalidTag(_))
        ));
    }

    #[test]
    fn self_dependency_rejected() {
        let dep = Dependency {
            id: "d".into(),
            from_item_id: "a".into(),
            to_item_id: "a".into(),
            dep_type: DependencyType::Blocks,
            unblock_at: None,
            created_at: Utc::now(),
        };
        assert!(matches!(
            validate_dependency(&dep),
            Err(ValidationError::SelfDependency)
        ));
    }

    #[test]
    fn relates_to_with_unblock_at_rejected() {
        use crate::enums::Role;
        let dep = Dependency {
            id: "d".into(),
            from_item_id: "a".into(),
            to_item_id: "b".into(),
            dep_type: DependencyType::RelatesTo,
            unblock_at: Some(Role::Work),
            created_at: Utc::now(),
        };
        assert!(matches!(
            validate_dependency(&dep),
            Err(ValidationError::RelatesToWithUnblockAt)
        ));
    }

    #[test]
    fn note_key_length_boundary() {
        let mut note = Note {
            id: "n".into(),
            item_id: "i".into(),
            key: "x".repeat(200),
            role: NoteRole::Work,
            body: String::new(),
            created_at: Utc::now(),
            modified_at: Utc::now(),
        };
        assert!(validate_note(&note).is_ok());
        note.key = "x".repeat(201);
        assert!(matches!(
            validate_note(&note),
            Err(ValidationError::NoteKeyTooLong(201))
        ));
    }
}
