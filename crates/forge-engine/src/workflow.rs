//! The workflow engine: resolve, validate, apply, cascade, unblock
//! (spec.md §4.3).

use std::cell::RefCell;
use std::collections::HashMap;

use chrono::Utc;
use tracing::debug;

use forge_core::enums::{Priority, Role, Trigger};
use forge_core::note_schema::NoteSchemaSource;
use forge_core::role_transition::RoleTransition;
use forge_core::work_item::WorkItem;
use forge_storage::{Repository, Transaction, WorkItemUpdate};

use crate::dependency_graph::{self, Blocker};
use crate::error::{EngineError, Result};
use crate::gates::{self, ExpectedNote};

/// Default bound on cascade-detection depth (spec.md §4.3.5).
pub const DEFAULT_MAX_CASCADE_DEPTH: u32 = 16;

/// The role/label/previous-role change `resolveTransition` computes,
/// before validation or persistence.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolveOutcome {
    pub target_role: Role,
    pub status_label: Option<String>,
    /// `Some(Some(role))` when entering `BLOCKED` (records the role being
    /// left); `Some(None)` when leaving `BLOCKED` (clears it); `None` when
    /// the current `previous_role` is left untouched.
    pub previous_role_update: Option<Option<Role>>,
    /// `true` iff this outcome came from a `resume` (restoring
    /// `previousRole`). spec.md §4.3.2: "`BLOCKED` and `previousRole`
    /// targets skip dependency validation" -- resume is unconditional even
    /// when `target_role` lands on `WORK`/`REVIEW`, so this flag is the
    /// only way `validate_transition` can tell a resume apart from a plain
    /// forward transition landing on the same role.
    pub is_resume: bool,
}

impl ResolveOutcome {
    fn plain(target_role: Role) -> Self {
        Self {
            target_role,
            status_label: None,
            previous_role_update: None,
            is_resume: false,
        }
    }

    fn cancelled(target_role: Role) -> Self {
        Self {
            target_role,
            status_label: Some("cancelled".to_string()),
            previous_role_update: None,
            is_resume: false,
        }
    }

    fn entering_blocked(from: Role) -> Self {
        Self {
            target_role: Role::Blocked,
            status_label: None,
            previous_role_update: Some(Some(from)),
            is_resume: false,
        }
    }

    fn resuming_to(role: Role) -> Self {
        Self {
            target_role: role,
            status_label: None,
            previous_role_update: Some(None),
            is_resume: true,
        }
    }
}

/// `resolveTransition(item, trigger, hasReviewPhase)` (spec.md §4.3.1).
///
/// `current_role`/`previous_role` are the item's current state; `trigger`
/// is the requested action. Fails without mutation for any cell marked
/// `fail` or `—` in the spec's transition table.
pub fn resolve_transition(
    current_role: Role,
    previous_role: Option<Role>,
    trigger: Trigger,
    has_review_phase: bool,
) -> Result<ResolveOutcome> {
    use Role::*;
    use Trigger::*;

    match (current_role, trigger) {
        (Terminal, _) => Err(EngineError::Resolve("item is already terminal".into())),

        (Queue, Start) => Ok(ResolveOutcome::plain(Work)),
        (Queue, Complete) => Ok(ResolveOutcome::plain(Terminal)),
        (Queue, Block) | (Queue, Hold) => Ok(ResolveOutcome::entering_blocked(Queue)),
        (Queue, Cancel) => Ok(ResolveOutcome::cancelled(Terminal)),
        (Queue, Resume) => Err(invalid_trigger(trigger, current_role)),
        (Queue, Cascade) => Err(cascade_is_internal()),

        (Work, Start) => {
            if has_review_phase {
                Ok(ResolveOutcome::plain(Review))
            } else {
                Ok(ResolveOutcome::plain(Terminal))
            }
        }
        (Work, Complete) => Ok(ResolveOutcome::plain(Terminal)),
        (Work, Block) | (Work, Hold) => Ok(ResolveOutcome::entering_blocked(Work)),
        (Work, Cancel) => Ok(ResolveOutcome::cancelled(Terminal)),
        (Work, Resume) => Err(invalid_trigger(trigger, current_role)),
        (Work, Cascade) => Err(cascade_is_internal()),

        (Review, Start) => Ok(ResolveOutcome::plain(Terminal)),
        (Review, Complete) => Ok(ResolveOutcome::plain(Terminal)),
        (Review, Block) | (Review, Hold) => Ok(ResolveOutcome::entering_blocked(Review)),
        (Review, Cancel) => Ok(ResolveOutcome::cancelled(Terminal)),
        (Review, Resume) => Err(invalid_trigger(trigger, current_role)),
        (Review, Cascade) => Err(cascade_is_internal()),

        (Blocked, Complete) => Ok(ResolveOutcome::plain(Terminal)),
        (Blocked, Resume) => match previous_role {
            Some(role) => Ok(ResolveOutcome::resuming_to(role)),
            None => Err(EngineError::Resolve(
                "blocked item has no previous role to resume to".into(),
            )),
        },
        (Blocked, Cancel) => Ok(ResolveOutcome::cancelled(Terminal)),
        (Blocked, Start) | (Blocked, Block) | (Blocked, Hold) => {
            Err(invalid_trigger(trigger, current_role))
        }
        (Blocked, Cascade) => Err(cascade_is_internal()),
    }
}

fn invalid_trigger(trigger: Trigger, role: Role) -> EngineError {
    EngineError::Resolve(format!(
        "cannot apply trigger '{trigger}' to role '{role}'"
    ))
}

fn cascade_is_internal() -> EngineError {
    EngineError::Resolve(
        "trigger 'cascade' is applied internally by cascade detection, not by advance_item"
            .into(),
    )
}

/// `validateTransition` (spec.md §4.3.2): only evaluated for target roles
/// `{WORK, REVIEW, TERMINAL}`, and skipped entirely for a `resume`
/// (spec.md §4.3.2: "`BLOCKED` and `previousRole` targets skip dependency
/// validation"; §8: resume is unconditional). Returns the unsatisfied
/// blockers, if any.
pub fn validate_transition(
    item_id: &str,
    outcome: &ResolveOutcome,
    deps: &[forge_core::dependency::Dependency],
    role_of: &HashMap<String, Role>,
) -> Vec<Blocker> {
    if outcome.is_resume {
        return Vec::new();
    }
    if !matches!(outcome.target_role, Role::Work | Role::Review | Role::Terminal) {
        return Vec::new();
    }
    dependency_graph::unsatisfied_blockers(item_id, deps, role_of)
}

/// `applyTransition` (spec.md §4.3.4): persists the new state
/// transactionally and appends the matching `RoleTransition` record.
pub fn apply_transition(
    tx: &dyn Transaction,
    item: &WorkItem,
    outcome: &ResolveOutcome,
    trigger: Trigger,
    summary: Option<String>,
) -> Result<WorkItem> {
    let now = Utc::now();
    let mut update = WorkItemUpdate::for_version(item.version);
    update.role = Some(outcome.target_role);
    update.role_changed_at = Some(now);
    if let Some(previous_role) = outcome.previous_role_update {
        update.previous_role = Some(previous_role);
    }
    if outcome.status_label.is_some() {
        update.status_label = Some(outcome.status_label.clone());
    }

    let updated = tx.update_item(&item.id, &update)?;

    let record = RoleTransition {
        id: 0,
        item_id: item.id.clone(),
        from_role: item.role,
        to_role: outcome.target_role,
        trigger,
        summary,
        status_label: outcome.status_label.clone(),
        occurred_at: now,
    };
    tx.append_role_transition(&record)?;

    Ok(updated)
}

/// A single ancestor completed via cascade (spec.md §4.3.5, §4.4's
/// `cascadeEvents`).
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CascadeEvent {
    pub item_id: String,
    pub previous_role: Role,
    pub target_role: Role,
}

/// Walks the parent chain of `completed_item`, completing any ancestor
/// whose children are now all `TERMINAL` (spec.md §4.3.5). Each ancestor
/// transition runs in its own transaction so the next ancestor is examined
/// against freshly committed state.
pub fn detect_and_apply_cascade(
    repo: &dyn Repository,
    completed_item: &WorkItem,
    max_depth: u32,
) -> Result<Vec<CascadeEvent>> {
    let mut events = Vec::new();
    let mut current_parent_id = completed_item.parent_id.clone();
    let mut depth = 0;

    while let Some(parent_id) = current_parent_id.take() {
        if depth >= max_depth {
            break;
        }
        depth += 1;

        let parent = match repo.get_item(&parent_id) {
            Ok(item) => item,
            Err(_) => break,
        };
        if parent.role == Role::Terminal {
            break;
        }

        let counts = repo.count_children_by_role(&parent_id)?;
        if !counts.all_terminal() {
            break;
        }

        let outcome = ResolveOutcome::plain(Role::Terminal);
        let updated = RefCell::new(None);
        let apply_result = repo.run_in_transaction(&mut |tx| {
            let item = apply_transition(
                tx,
                &parent,
                &outcome,
                Trigger::Cascade,
                Some("all children completed".to_string()),
            )?;
            *updated.borrow_mut() = Some(item);
            Ok(())
        });

        match apply_result {
            Ok(()) => {
                let updated_parent = updated.into_inner().expect("set on Ok");
                debug!(item_id = %parent_id, "cascaded to terminal");
                events.push(CascadeEvent {
                    item_id: parent_id.clone(),
                    previous_role: parent.role,
                    target_role: Role::Terminal,
                });
                current_parent_id = updated_parent.parent_id;
            }
            Err(_) => break,
        }
    }

    Ok(events)
}

/// Enumerates items that depend on `transitioned_item` (its outgoing
/// `BLOCKS` edges and incoming `IS_BLOCKED_BY` edges) and reports those
/// whose dependency-blocking set is now fully satisfied (spec.md §4.3.6).
/// Advisory only: does not mutate any item.
pub fn detect_unblocked(repo: &dyn Repository, transitioned_item_id: &str) -> Result<Vec<String>> {
    let outgoing = repo.find_dependencies_by_from(transitioned_item_id)?;
    let incoming = repo.find_dependencies_by_to(transitioned_item_id)?;

    let mut dependent_ids: Vec<String> = Vec::new();
    for dep in &outgoing {
        if dep.dep_type == forge_core::enums::DependencyType::Blocks {
            dependent_ids.push(dep.to_item_id.clone());
        }
    }
    for dep in &incoming {
        if dep.dep_type == forge_core::enums::DependencyType::IsBlockedBy {
            dependent_ids.push(dep.from_item_id.clone());
        }
    }
    dependent_ids.sort();
    dependent_ids.dedup();

    let mut unblocked = Vec::new();
    for dependent_id in dependent_ids {
        let item = match repo.get_item(&dependent_id) {
            Ok(item) => item,
            Err(_) => continue,
        };
        let deps = repo.find_dependencies_by_item(&dependent_id)?;
        let blocker_ids: Vec<String> = deps
            .iter()
            .flat_map(|d| [d.from_item_id.clone(), d.to_item_id.clone()])
            .collect();
        let blocker_items = repo.find_by_ids(&blocker_ids)?;
        let role_of: HashMap<String, Role> = blocker_items
            .into_iter()
            .map(|item| (item.id, item.role))
            .collect();

        if dependency_graph::unsatisfied_blockers(&dependent_id, &deps, &role_of).is_empty() {
            let _ = item; // only needed to confirm the item still exists
            unblocked.push(dependent_id);
        }
    }

    Ok(unblocked)
}

/// Full outcome of a single `advance_item` element (spec.md §4.4).
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvanceOutcome {
    pub item: WorkItem,
    pub cascade_events: Vec<CascadeEvent>,
    pub unblocked_item_ids: Vec<String>,
    pub expected_notes: Vec<ExpectedNote>,
}

/// Drives one element of `advance_item`: fetch -> resolve -> validate ->
/// gate -> apply -> cascade -> unblock (spec.md §4.4).
pub fn advance_item(
    repo: &dyn Repository,
    note_schema: &dyn NoteSchemaSource,
    item_id: &str,
    trigger: Trigger,
    summary: Option<String>,
    max_cascade_depth: u32,
) -> Result<AdvanceOutcome> {
    let item = repo.get_item(item_id)?;
    let tags = item.tag_list();
    let schema = note_schema.schema_for_tags(&tags);
    let has_review_phase = note_schema.has_review_phase(&tags);

    let outcome = resolve_transition(item.role, item.previous_role, trigger, has_review_phase)?;

    if !outcome.is_resume
        && matches!(outcome.target_role, Role::Work | Role::Review | Role::Terminal)
    {
        let deps = repo.find_dependencies_by_item(item_id)?;
        let blocker_ids: Vec<String> = deps
            .iter()
            .flat_map(|d| [d.from_item_id.clone(), d.to_item_id.clone()])
            .collect();
        let blocker_items = repo.find_by_ids(&blocker_ids)?;
        let role_of: HashMap<String, Role> = blocker_items
            .into_iter()
            .map(|item| (item.id, item.role))
            .collect();

        let blockers = validate_transition(item_id, &outcome, &deps, &role_of);
        if !blockers.is_empty() {
            return Err(EngineError::Validate { blockers });
        }
    }

    let notes = repo.find_notes_by_item(item_id, None)?;
    let missing = match trigger {
        Trigger::Start => gates::start_gate(item.role, &notes, schema.as_deref()),
        Trigger::Complete => gates::complete_gate(&notes, schema.as_deref()),
        _ => Vec::new(),
    };
    if !missing.is_empty() {
        return Err(EngineError::Gate { missing });
    }

    let updated = RefCell::new(None);
    repo.run_in_transaction(&mut |tx| {
        let result = apply_transition(tx, &item, &outcome, trigger, summary.clone())?;
        *updated.borrow_mut() = Some(result);
        Ok(())
    })?;
    let updated_item = updated.into_inner().expect("set on Ok");

    let cascade_events = if trigger == Trigger::Complete && updated_item.role == Role::Terminal {
        detect_and_apply_cascade(repo, &updated_item, max_cascade_depth)?
    } else {
        Vec::new()
    };

    let unblocked_item_ids = detect_unblocked(repo, item_id)?;
    let expected = gates::expected_notes(updated_item.role, &notes, schema.as_deref());

    Ok(AdvanceOutcome {
        item: updated_item,
        cascade_events,
        unblocked_item_ids,
        expected_notes: expected,
    })
}

/// Quick-wins-first comparator for `get_next_item` (spec.md §4.4):
/// priority ascending (`HIGH<MEDIUM<LOW`) then `complexity` ascending,
/// nulls last.
pub fn queue_priority_key(item: &WorkItem) -> (u8, i32) {
    (
        item_priority_rank(item.priority),
        item.complexity.unwrap_or(i32::MAX),
    )
}

fn item_priority_rank(priority: Priority) -> u8 {
    priority.rank()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_to_work_on_start() {
        let outcome = resolve_transition(Role::Queue, None, Trigger::Start, false).unwrap();
        assert_eq!(outcome.target_role, Role::Work);
        assert!(outcome.previous_role_update.is_none());
    }

    #[test]
    fn work_to_review_when_review_phase_present() {
        let outcome = resolve_transition(Role::Work, None, Trigger::Start, true).unwrap();
        assert_eq!(outcome.target_role, Role::Review);
    }

    #[test]
    fn work_to_terminal_without_review_phase() {
        let outcome = resolve_transition(Role::Work, None, Trigger::Start, false).unwrap();
        assert_eq!(outcome.target_role, Role::Terminal);
    }

    #[test]
    fn terminal_always_fails() {
        assert!(resolve_transition(Role::Terminal, None, Trigger::Start, false).is_err());
        assert!(resolve_transition(Role::Terminal, None, Trigger::Cancel, false).is_err());
    }

    #[test]
    fn block_records_previous_role() {
        let outcome = resolve_transition(Role::Work, None, Trigger::Block, false).unwrap();
        assert_eq!(outcome.target_role, Role::Blocked);
        assert_eq!(outcome.previous_role_update, Some(Some(Role::Work)));
    }

    #[test]
    fn resume_restores_previous_role() {
        let outcome =
            resolve_transition(Role::Blocked, Some(Role::Work), Trigger::Resume, false).unwrap();
        assert_eq!(outcome.target_role, Role::Work);
        assert_eq!(outcome.previous_role_update, Some(None));
    }

    #[test]
    fn resume_without_previous_role_fails() {
        assert!(resolve_transition(Role::Blocked, None, Trigger::Resume, false).is_err());
    }

    #[test]
    fn cancel_sets_cancelled_label() {
        let outcome = resolve_transition(Role::Queue, None, Trigger::Cancel, false).unwrap();
        assert_eq!(outcome.target_role, Role::Terminal);
        assert_eq!(outcome.status_label, Some("cancelled".to_string()));
    }

    #[test]
    fn resume_from_queue_is_invalid() {
        assert!(resolve_transition(Role::Queue, None, Trigger::Resume, false).is_err());
    }

    #[test]
    fn cascade_trigger_rejected_directly() {
        assert!(resolve_transition(Role::Work, None, Trigger::Cascade, false).is_err());
    }

    #[test]
    fn validate_skips_entering_blocked_target() {
        let outcome = ResolveOutcome::entering_blocked(Role::Work);
        let blockers = validate_transition("x", &outcome, &[], &HashMap::new());
        assert!(blockers.is_empty());
    }

    #[test]
    fn validate_skips_resume_even_with_unsatisfied_blockers() {
        use forge_core::enums::DependencyType;

        let outcome = ResolveOutcome::resuming_to(Role::Work);
        assert!(outcome.is_resume);

        let dep = forge_core::dependency::Dependency {
            id: "dep".into(),
            from_item_id: "blocker".into(),
            to_item_id: "x".into(),
            dep_type: DependencyType::Blocks,
            unblock_at: None,
            created_at: chrono::Utc::now(),
        };
        let mut role_of = HashMap::new();
        role_of.insert("blocker".to_string(), Role::Queue);

        let blockers = validate_transition("x", &outcome, &[dep], &role_of);
        assert!(
            blockers.is_empty(),
            "resume must succeed unconditionally even with unsatisfied blockers"
        );
    }
}
