//! Atomic work-tree creation (spec.md §4.4): root + ref-named children +
//! ref-keyed dependencies + optional notes, inserted in one transaction.
//!
//! Planning (resolving refs, validating shapes) happens entirely before the
//! transaction opens, so the only way the transaction itself can fail is a
//! genuine persistence fault or a batch dependency cycle -- both already
//! `RepositoryError` -- and nothing is left half-inserted either way.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Value};

use forge_core::dependency::Dependency;
use forge_core::enums::{DependencyType, NoteRole, Role};
use forge_core::note::Note;
use forge_core::validation::{validate_dependency, validate_note, validate_work_item};
use forge_core::work_item::{WorkItem, WorkItemBuilder};
use forge_storage::Repository;

use crate::error::{AppError, Result};
use crate::server::{normalize_tags, parse_dep_type, parse_note_role, parse_priority, parse_role, to_json};

/// A placeholder satisfying `validate_work_item`'s `parentId`/`depth`
/// consistency check before the real, tree-internal parent id exists.
const PENDING_PARENT_PLACEHOLDER: &str = "<pending>";

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct WorkTreeInput {
    /// Root-first: the first entry (no `parentRef`) is the tree's root.
    pub items: Vec<TreeItemInput>,
    #[serde(default)]
    pub dependencies: Vec<TreeDependencyInput>,
    #[serde(default)]
    pub notes: Vec<TreeNoteInput>,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TreeItemInput {
    #[serde(rename = "ref")]
    pub item_ref: String,
    pub parent_ref: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub summary: Option<String>,
    pub priority: Option<String>,
    pub complexity: Option<i32>,
    pub requires_verification: Option<bool>,
    pub tags: Option<Vec<String>>,
    pub metadata: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TreeDependencyInput {
    pub from_ref: String,
    pub to_ref: String,
    #[serde(rename = "type")]
    pub dep_type: Option<String>,
    pub unblock_at: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TreeNoteInput {
    pub item_ref: String,
    pub key: String,
    pub role: String,
    #[serde(default)]
    pub body: String,
}

struct PlannedItem {
    item_ref: String,
    parent_ref: Option<String>,
    item: WorkItem,
}

struct PlannedDependency {
    from_ref: String,
    to_ref: String,
    dep_type: DependencyType,
    unblock_at: Option<Role>,
}

struct PlannedNote {
    item_ref: String,
    key: String,
    role: NoteRole,
    body: String,
}

fn plan(tree: &WorkTreeInput) -> Result<(Vec<PlannedItem>, Vec<PlannedDependency>, Vec<PlannedNote>)> {
    if tree.items.is_empty() {
        return Err(AppError::BadRequest("tree requires at least one item".into()));
    }

    let mut seen_refs: HashSet<String> = HashSet::new();
    let mut depth_of: HashMap<String, i32> = HashMap::new();
    let mut planned_items = Vec::with_capacity(tree.items.len());

    for entry in &tree.items {
        if !seen_refs.insert(entry.item_ref.clone()) {
            return Err(AppError::BadRequest(format!(
                "duplicate ref '{}'",
                entry.item_ref
            )));
        }

        let depth = match &entry.parent_ref {
            None => 0,
            Some(parent_ref) => {
                let parent_depth = depth_of.get(parent_ref).copied().ok_or_else(|| {
                    AppError::BadRequest(format!(
                        "parentRef '{parent_ref}' must reference an earlier item"
                    ))
                })?;
                parent_depth + 1
            }
        };
        depth_of.insert(entry.item_ref.clone(), depth);

        let mut item = WorkItemBuilder::new(entry.title.clone()).depth(depth).build();
        if entry.parent_ref.is_some() {
            item.parent_id = Some(PENDING_PARENT_PLACEHOLDER.to_string());
        }
        item.description = entry.description.clone();
        item.summary = entry.summary.clone().unwrap_or_default();
        if let Some(priority) = &entry.priority {
            item.priority = parse_priority(priority)?;
        }
        item.complexity = entry.complexity;
        item.requires_verification = entry.requires_verification.unwrap_or(false);
        item.metadata = entry.metadata.clone();
        item.tags = normalize_tags(entry.tags.clone().unwrap_or_default());
        validate_work_item(&item)?;

        planned_items.push(PlannedItem {
            item_ref: entry.item_ref.clone(),
            parent_ref: entry.parent_ref.clone(),
            item,
        });
    }

    let mut planned_deps = Vec::with_capacity(tree.dependencies.len());
    for dep in &tree.dependencies {
        if !seen_refs.contains(&dep.from_ref) {
            return Err(AppError::BadRequest(format!(
                "dependency fromRef '{}' does not match any item",
                dep.from_ref
            )));
        }
        if !seen_refs.contains(&dep.to_ref) {
            return Err(AppError::BadRequest(format!(
                "dependency toRef '{}' does not match any item",
                dep.to_ref
            )));
        }
        let dep_type = match &dep.dep_type {
            Some(t) => parse_dep_type(t)?,
            None => DependencyType::Blocks,
        };
        let unblock_at = match &dep.unblock_at {
            Some(r) => Some(parse_role(r)?),
            None => None,
        };
        validate_dependency(&Dependency {
            id: String::new(),
            from_item_id: dep.from_ref.clone(),
            to_item_id: dep.to_ref.clone(),
            dep_type,
            unblock_at,
            created_at: Utc::now(),
        })?;
        planned_deps.push(PlannedDependency {
            from_ref: dep.from_ref.clone(),
            to_ref: dep.to_ref.clone(),
            dep_type,
            unblock_at,
        });
    }

    let mut planned_notes = Vec::with_capacity(tree.notes.len());
    for note in &tree.notes {
        if !seen_refs.contains(&note.item_ref) {
            return Err(AppError::BadRequest(format!(
                "note itemRef '{}' does not match any item",
                note.item_ref
            )));
        }
        let role = parse_note_role(&note.role)?;
        validate_note(&Note {
            id: String::new(),
            item_id: note.item_ref.clone(),
            key: note.key.clone(),
            role,
            body: note.body.clone(),
            created_at: Utc::now(),
            modified_at: Utc::now(),
        })?;
        planned_notes.push(PlannedNote {
            item_ref: note.item_ref.clone(),
            key: note.key.clone(),
            role,
            body: note.body.clone(),
        });
    }

    Ok((planned_items, planned_deps, planned_notes))
}

/// Inserts root, children, dependencies, and notes in a single transaction.
/// Any failure -- an invalid ref, a batch cycle, a database fault -- rolls
/// back every insert (spec.md §4.4, §7: "Atomic handlers ... return
/// `success:false` on any sub-failure and guarantee rollback").
pub fn create_work_tree(repo: &dyn Repository, tree: WorkTreeInput) -> Result<Value> {
    let (planned_items, planned_deps, planned_notes) = plan(&tree)?;

    let mut created: Vec<WorkItem> = Vec::with_capacity(planned_items.len());
    let mut ref_to_id: HashMap<String, String> = HashMap::new();

    repo.run_in_transaction(&mut |tx| {
        for planned in &planned_items {
            let mut item = planned.item.clone();
            if let Some(parent_ref) = &planned.parent_ref {
                // Planning guarantees this ref was already inserted: items
                // are processed root-first and every parentRef must name an
                // earlier entry.
                item.parent_id = ref_to_id.get(parent_ref).cloned();
            }
            let inserted = tx.create_item(&item)?;
            ref_to_id.insert(planned.item_ref.clone(), inserted.id.clone());
            created.push(inserted);
        }

        if !planned_deps.is_empty() {
            let resolved: Vec<Dependency> = planned_deps
                .iter()
                .map(|d| Dependency {
                    id: String::new(),
                    from_item_id: ref_to_id[&d.from_ref].clone(),
                    to_item_id: ref_to_id[&d.to_ref].clone(),
                    dep_type: d.dep_type,
                    unblock_at: d.unblock_at,
                    created_at: Utc::now(),
                })
                .collect();
            tx.create_dependencies_batch(&resolved)?;
        }

        for planned in &planned_notes {
            let note = Note {
                id: String::new(),
                item_id: ref_to_id[&planned.item_ref].clone(),
                key: planned.key.clone(),
                role: planned.role,
                body: planned.body.clone(),
                created_at: Utc::now(),
                modified_at: Utc::now(),
            };
            tx.upsert_note(&note)?;
        }

        Ok(())
    })?;

    Ok(json!({ "items": to_json(&created), "refs": ref_to_id }))
}
