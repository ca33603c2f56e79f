//! Tool handlers: the MCP-facing surface of the task-orchestration core
//! (spec.md §4.4, §6).
//!
//! Every `#[tool]` method does the same three things: hop into
//! `spawn_blocking` to run the synchronous storage/engine call, fold the
//! `Result<Value, AppError>` it gets back into an [`Envelope`], and return
//! that envelope as the tool's structured JSON content. A tool method never
//! returns a transport-level error for a domain failure -- only the
//! envelope's `success` flag carries that.

use std::collections::{HashMap, HashSet, VecDeque};

use chrono::Utc;
use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::tool::Parameters;
use rmcp::model::{
    CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo,
};
use rmcp::{tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler};
use serde::Serialize;
use serde_json::{json, Value};

use forge_core::dependency::Dependency;
use forge_core::enums::{DependencyType, NoteRole, Priority, Role, SortBy, SortOrder, Trigger};
use forge_core::filter::WorkItemFilter;
use forge_core::note::Note;
use forge_core::validation::{validate_dependency, validate_note, validate_work_item};
use forge_core::work_item::{WorkItem, WorkItemBuilder};
use forge_engine::{self, dependency_graph, BlockType, EngineError};
use forge_storage::{Repository, WorkItemUpdate};

use crate::envelope::Envelope;
use crate::error::{AppError, Result};
use crate::params::*;
use crate::state::AppState;
use crate::tree::{self, WorkTreeInput};

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

pub(crate) fn to_json<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

/// Lowercases, trims, drops empty entries, and comma-joins a tag list, per
/// spec.md §4.4's "tag normalization" step on item create/update.
pub(crate) fn normalize_tags(tags: Vec<String>) -> String {
    tags.iter()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(",")
}

pub(crate) fn parse_role(s: &str) -> Result<Role> {
    Role::try_from(s).map_err(|e| AppError::BadRequest(e.to_string()))
}

pub(crate) fn parse_priority(s: &str) -> Result<Priority> {
    Priority::try_from(s).map_err(|e| AppError::BadRequest(e.to_string()))
}

pub(crate) fn parse_dep_type(s: &str) -> Result<DependencyType> {
    DependencyType::try_from(s).map_err(|e| AppError::BadRequest(e.to_string()))
}

pub(crate) fn parse_trigger(s: &str) -> Result<Trigger> {
    Trigger::try_from(s).map_err(|e| AppError::BadRequest(e.to_string()))
}

pub(crate) fn parse_note_role(s: &str) -> Result<NoteRole> {
    NoteRole::try_from(s).map_err(|e| AppError::BadRequest(e.to_string()))
}

/// Runs a synchronous storage/engine call off the async runtime's worker
/// threads, the way this codebase's other embedded-SQLite callers bridge a
/// blocking `rusqlite` connection into an async caller.
async fn run_blocking<F, T>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(result) => result,
        Err(join_err) => Err(AppError::Internal(format!(
            "background task failed: {join_err}"
        ))),
    }
}

fn envelope_result(result: Result<Value>) -> Result<CallToolResult, McpError> {
    let envelope = match result {
        Ok(data) => Envelope::ok(data),
        Err(err) => err.into_envelope(),
    };
    let content = Content::json(&envelope)
        .map_err(|e| McpError::internal_error(format!("envelope serialization failed: {e}"), None))?;
    Ok(CallToolResult::success(vec![content]))
}

/// Builds a `{itemId -> role}` map for every item touched by `deps`,
/// the shape `classify_block_status`/`unsatisfied_blockers` need.
fn role_map_for(repo: &dyn Repository, deps: &[Dependency]) -> Result<HashMap<String, Role>> {
    let mut ids: Vec<String> = deps
        .iter()
        .flat_map(|d| [d.from_item_id.clone(), d.to_item_id.clone()])
        .collect();
    ids.sort();
    ids.dedup();
    let items = repo.find_by_ids(&ids)?;
    Ok(items.into_iter().map(|i| (i.id, i.role)).collect())
}

/// BFS over `find_dependencies_by_item`, bounded by `max_nodes`, used by
/// `query_dependencies`'s optional `chain` output.
fn bounded_connected_subgraph(
    repo: &dyn Repository,
    start: &str,
    max_nodes: usize,
) -> Result<Vec<String>> {
    let mut visited: HashSet<String> = HashSet::new();
    let mut order = Vec::new();
    let mut queue = VecDeque::new();
    queue.push_back(start.to_string());
    visited.insert(start.to_string());

    while let Some(id) = queue.pop_front() {
        order.push(id.clone());
        if order.len() >= max_nodes {
            break;
        }
        for dep in repo.find_dependencies_by_item(&id)? {
            for neighbor in [dep.from_item_id, dep.to_item_id] {
                if visited.insert(neighbor.clone()) {
                    queue.push_back(neighbor);
                }
            }
        }
    }

    Ok(order)
}

fn collect_edges_among(repo: &dyn Repository, nodes: &[String]) -> Result<Vec<Dependency>> {
    let mut all = Vec::new();
    let mut seen = HashSet::new();
    for id in nodes {
        for dep in repo.find_dependencies_by_item(id)? {
            if seen.insert(dep.id.clone()) {
                all.push(dep);
            }
        }
    }
    Ok(all)
}

fn propagate_skip(adjacency: &HashMap<String, Vec<String>>, item_id: &str, skipped: &mut HashSet<String>) {
    if let Some(dependents) = adjacency.get(item_id) {
        for dependent in dependents {
            skipped.insert(dependent.clone());
        }
    }
}

/// Builds a per-element failure object for a batch handler, carrying the
/// same structured data `AppError::into_envelope` attaches for a
/// single-operation failure (spec.md §7: "failure for role transitions
/// includes a `blockers` array where applicable; for gate failures, the
/// list of missing note keys").
fn engine_failure_json(item_id: &str, error: &EngineError) -> Value {
    match error {
        EngineError::Validate { blockers } => json!({
            "itemId": item_id,
            "error": error.to_string(),
            "blockers": to_json(blockers),
        }),
        EngineError::Gate { missing } => json!({
            "itemId": item_id,
            "error": error.to_string(),
            "missing": missing,
        }),
        _ => json!({ "itemId": item_id, "error": error.to_string() }),
    }
}

// ---------------------------------------------------------------------------
// manage_items
// ---------------------------------------------------------------------------

fn handle_manage_items(store: &dyn Repository, params: ManageItemsParams) -> Result<Value> {
    match params.op.as_str() {
        "create" => {
            let mut items = Vec::new();
            let mut failures = Vec::new();
            for (index, raw) in params.items.into_iter().enumerate() {
                match create_one_item(store, raw) {
                    Ok(item) => items.push(to_json(&item)),
                    Err(e) => failures.push(json!({"index": index, "error": e.to_string()})),
                }
            }
            Ok(json!({
                "total": items.len() + failures.len(),
                "succeeded": items.len(),
                "failed": failures.len(),
                "items": items,
                "failures": failures,
            }))
        }
        "update" => {
            let mut items = Vec::new();
            let mut failures = Vec::new();
            for (index, raw) in params.items.into_iter().enumerate() {
                match update_one_item(store, raw) {
                    Ok(item) => items.push(to_json(&item)),
                    Err(e) => failures.push(json!({"index": index, "error": e.to_string()})),
                }
            }
            Ok(json!({
                "total": items.len() + failures.len(),
                "succeeded": items.len(),
                "failed": failures.len(),
                "items": items,
                "failures": failures,
            }))
        }
        "delete" => {
            let mut deleted_ids = Vec::new();
            let mut failures = Vec::new();
            for (index, raw) in params.items.into_iter().enumerate() {
                match delete_one_item(store, &raw) {
                    Ok(ids) => deleted_ids.extend(ids),
                    Err(e) => failures.push(json!({"index": index, "error": e.to_string()})),
                }
            }
            Ok(json!({ "deletedIds": deleted_ids, "failures": failures }))
        }
        other => Err(AppError::BadRequest(format!(
            "unknown op '{other}' for manage_items"
        ))),
    }
}

fn create_one_item(store: &dyn Repository, raw: ItemWriteItem) -> Result<WorkItem> {
    let title = raw
        .title
        .ok_or_else(|| AppError::BadRequest("create requires 'title'".into()))?;

    let depth = match &raw.parent_id {
        Some(parent_id) => store.get_item(parent_id)?.depth + 1,
        None => 0,
    };

    let mut item = WorkItemBuilder::new(title).depth(depth).build();
    item.parent_id = raw.parent_id;
    item.description = raw.description;
    item.summary = raw.summary.unwrap_or_default();
    if let Some(priority) = &raw.priority {
        item.priority = parse_priority(priority)?;
    }
    item.complexity = raw.complexity;
    item.requires_verification = raw.requires_verification.unwrap_or(false);
    item.metadata = raw.metadata;
    item.tags = normalize_tags(raw.tags.unwrap_or_default());
    validate_work_item(&item)?;

    Ok(store.create_item(&item)?)
}

fn update_one_item(store: &dyn Repository, raw: ItemWriteItem) -> Result<WorkItem> {
    let id = raw
        .id
        .ok_or_else(|| AppError::BadRequest("update requires 'id'".into()))?;
    let expected_version = raw
        .expected_version
        .ok_or_else(|| AppError::BadRequest("update requires 'expectedVersion'".into()))?;

    let current = store.get_item(&id)?;
    let priority = match &raw.priority {
        Some(p) => Some(parse_priority(p)?),
        None => None,
    };
    let tags = raw.tags.map(normalize_tags);

    let mut merged = current.clone();
    if let Some(title) = &raw.title {
        merged.title = title.clone();
    }
    if let Some(description) = &raw.description {
        merged.description = Some(description.clone());
    }
    if let Some(summary) = &raw.summary {
        merged.summary = summary.clone();
    }
    if let Some(p) = priority {
        merged.priority = p;
    }
    if let Some(complexity) = raw.complexity {
        merged.complexity = Some(complexity);
    }
    if let Some(rv) = raw.requires_verification {
        merged.requires_verification = rv;
    }
    if let Some(metadata) = &raw.metadata {
        merged.metadata = Some(metadata.clone());
    }
    if let Some(t) = &tags {
        merged.tags = t.clone();
    }
    validate_work_item(&merged)?;

    let mut update = WorkItemUpdate::for_version(expected_version);
    update.title = raw.title;
    update.description = raw.description.map(Some);
    update.summary = raw.summary;
    update.priority = priority;
    update.complexity = raw.complexity.map(Some);
    update.requires_verification = raw.requires_verification;
    update.metadata = raw.metadata.map(Some);
    update.tags = tags;

    Ok(store.update_item(&id, &update)?)
}

fn delete_one_item(store: &dyn Repository, raw: &ItemWriteItem) -> Result<Vec<String>> {
    let id = raw
        .id
        .clone()
        .ok_or_else(|| AppError::BadRequest("delete requires 'id'".into()))?;

    if raw.with_descendants.unwrap_or(false) {
        let mut ids: Vec<String> = store
            .find_descendants(&id)?
            .into_iter()
            .map(|i| i.id)
            .collect();
        ids.push(id);
        store.delete_all(&ids)?;
        Ok(ids)
    } else {
        store.delete_item(&id)?;
        Ok(vec![id])
    }
}

// ---------------------------------------------------------------------------
// query_items
// ---------------------------------------------------------------------------

fn handle_query_items(store: &dyn Repository, params: QueryItemsParams) -> Result<Value> {
    match params.op.as_str() {
        "get" => {
            if params.ids.is_empty() {
                return Err(AppError::BadRequest("'get' requires 'ids'".into()));
            }
            let items = store.find_by_ids(&params.ids)?;
            let ancestors = if params.include_ancestors {
                Some(store.find_ancestor_chains(&params.ids)?)
            } else {
                None
            };
            let children = if params.include_children {
                let mut map = HashMap::new();
                for id in &params.ids {
                    map.insert(id.clone(), store.find_children(id)?);
                }
                Some(map)
            } else {
                None
            };
            Ok(json!({
                "items": to_json(&items),
                "ancestors": ancestors.map(|a| to_json(&a)),
                "children": children.map(|c| to_json(&c)),
            }))
        }
        "search" => {
            let filter = build_filter(&params)?;
            let items = store.find_by_filters(&filter)?;
            let total = store.count_by_filters(&filter)?;
            Ok(json!({ "items": to_json(&items), "total": total }))
        }
        "overview" => {
            let roots = store.find_root_items()?;
            let total = store.count()?;
            Ok(json!({ "roots": to_json(&roots), "total": total }))
        }
        other => Err(AppError::BadRequest(format!(
            "unknown op '{other}' for query_items"
        ))),
    }
}

fn build_filter(params: &QueryItemsParams) -> Result<WorkItemFilter> {
    let role = match &params.role {
        Some(r) => Some(parse_role(r)?),
        None => None,
    };
    let priority = match &params.priority {
        Some(p) => Some(parse_priority(p)?),
        None => None,
    };
    let sort_by = params
        .sort_by
        .as_deref()
        .map(SortBy::from)
        .unwrap_or_default();
    let sort_order = match params.sort_order.as_deref() {
        Some("asc") => SortOrder::Asc,
        _ => SortOrder::Desc,
    };

    Ok(WorkItemFilter {
        parent_id: params.parent_id.clone(),
        depth: params.depth,
        role,
        priority,
        tags: params.tags.clone(),
        query: params.query.clone(),
        sort_by,
        sort_order,
        limit: params.limit,
        offset: params.offset,
        ..Default::default()
    })
}

// ---------------------------------------------------------------------------
// manage_dependencies
// ---------------------------------------------------------------------------

fn handle_manage_dependencies(store: &dyn Repository, params: ManageDependenciesParams) -> Result<Value> {
    match params.op.as_str() {
        "create" => handle_create_dependencies(store, &params),
        "delete" => handle_delete_dependencies(store, params),
        other => Err(AppError::BadRequest(format!(
            "unknown op '{other}' for manage_dependencies"
        ))),
    }
}

fn resolve_dependency_edges(params: &ManageDependenciesParams) -> Result<Vec<Dependency>> {
    let default_type = match &params.dep_type {
        Some(t) => Some(parse_dep_type(t)?),
        None => None,
    };
    let default_unblock_at = match &params.unblock_at {
        Some(r) => Some(parse_role(r)?),
        None => None,
    };

    type RawEdge = (String, String, Option<DependencyType>, Option<Role>);
    let raw_edges: Vec<RawEdge> = match params.pattern.as_deref() {
        None => {
            let mut out = Vec::with_capacity(params.edges.len());
            for edge in &params.edges {
                let dep_type = match &edge.dep_type {
                    Some(t) => Some(parse_dep_type(t)?),
                    None => None,
                };
                let unblock_at = match &edge.unblock_at {
                    Some(r) => Some(parse_role(r)?),
                    None => None,
                };
                out.push((edge.from_item_id.clone(), edge.to_item_id.clone(), dep_type, unblock_at));
            }
            out
        }
        Some("linear") => {
            if params.ids.len() < 2 {
                return Err(AppError::BadRequest(
                    "'linear' pattern requires at least 2 ids".into(),
                ));
            }
            params
                .ids
                .windows(2)
                .map(|w| (w[0].clone(), w[1].clone(), None, None))
                .collect()
        }
        Some("fan-out") => {
            let from = params
                .from
                .clone()
                .ok_or_else(|| AppError::BadRequest("'fan-out' pattern requires 'from'".into()))?;
            if params.targets.is_empty() {
                return Err(AppError::BadRequest(
                    "'fan-out' pattern requires 'targets'".into(),
                ));
            }
            params
                .targets
                .iter()
                .map(|to| (from.clone(), to.clone(), None, None))
                .collect()
        }
        Some("fan-in") => {
            let to = params
                .to
                .clone()
                .ok_or_else(|| AppError::BadRequest("'fan-in' pattern requires 'to'".into()))?;
            if params.sources.is_empty() {
                return Err(AppError::BadRequest(
                    "'fan-in' pattern requires 'sources'".into(),
                ));
            }
            params
                .sources
                .iter()
                .map(|from| (from.clone(), to.clone(), None, None))
                .collect()
        }
        Some(other) => {
            return Err(AppError::BadRequest(format!(
                "unknown dependency pattern '{other}'"
            )))
        }
    };

    let mut deps = Vec::with_capacity(raw_edges.len());
    for (from_item_id, to_item_id, dep_type, unblock_at) in raw_edges {
        let dep_type = dep_type.or(default_type).unwrap_or(DependencyType::Blocks);
        let unblock_at = unblock_at.or(default_unblock_at);
        let dep = Dependency {
            id: String::new(),
            from_item_id,
            to_item_id,
            dep_type,
            unblock_at,
            created_at: Utc::now(),
        };
        validate_dependency(&dep)?;
        deps.push(dep);
    }
    Ok(deps)
}

fn handle_create_dependencies(store: &dyn Repository, params: &ManageDependenciesParams) -> Result<Value> {
    let deps = resolve_dependency_edges(params)?;
    if deps.is_empty() {
        return Err(AppError::BadRequest(
            "create requires at least one edge".into(),
        ));
    }
    let created = store.create_dependencies_batch(&deps)?;
    Ok(json!({ "edges": to_json(&created) }))
}

fn handle_delete_dependencies(store: &dyn Repository, params: ManageDependenciesParams) -> Result<Value> {
    if let Some(id) = params.id {
        store.delete_dependency(&id)?;
        return Ok(json!({ "deletedIds": [id] }));
    }

    let dep_type = match &params.dep_type {
        Some(t) => Some(parse_dep_type(t)?),
        None => None,
    };

    match (params.from_item_id, params.to_item_id) {
        (Some(from), Some(to)) => {
            let matches: Vec<Dependency> = store
                .find_dependencies_by_from(&from)?
                .into_iter()
                .filter(|d| d.to_item_id == to)
                .filter(|d| dep_type.map_or(true, |t| d.dep_type == t))
                .collect();
            let mut deleted = Vec::new();
            for dep in &matches {
                store.delete_dependency(&dep.id)?;
                deleted.push(dep.id.clone());
            }
            Ok(json!({ "deletedIds": deleted }))
        }
        (Some(endpoint), None) | (None, Some(endpoint)) => {
            if !params.delete_all.unwrap_or(false) {
                return Err(AppError::BadRequest(
                    "deleting by a single endpoint requires deleteAll: true".into(),
                ));
            }
            if dep_type.is_none() {
                store.delete_dependencies_by_item(&endpoint)?;
                return Ok(json!({ "itemId": endpoint }));
            }
            let matches: Vec<Dependency> = store
                .find_dependencies_by_item(&endpoint)?
                .into_iter()
                .filter(|d| dep_type.map_or(true, |t| d.dep_type == t))
                .collect();
            let mut deleted = Vec::new();
            for dep in &matches {
                store.delete_dependency(&dep.id)?;
                deleted.push(dep.id.clone());
            }
            Ok(json!({ "deletedIds": deleted }))
        }
        (None, None) => Err(AppError::BadRequest(
            "delete requires 'id', or 'fromItemId'/'toItemId'".into(),
        )),
    }
}

// ---------------------------------------------------------------------------
// query_dependencies
// ---------------------------------------------------------------------------

fn handle_query_dependencies(store: &dyn Repository, params: QueryDependenciesParams) -> Result<Value> {
    let direction = params.direction.as_deref().unwrap_or("all");
    let dep_type_filter = match &params.dep_type {
        Some(t) => Some(parse_dep_type(t)?),
        None => None,
    };

    let mut edges: Vec<Dependency> = match direction {
        "outgoing" => store.find_dependencies_by_from(&params.item_id)?,
        "incoming" => store.find_dependencies_by_to(&params.item_id)?,
        "all" => store.find_dependencies_by_item(&params.item_id)?,
        other => return Err(AppError::BadRequest(format!("unknown direction '{other}'"))),
    };
    if let Some(t) = dep_type_filter {
        edges.retain(|d| d.dep_type == t);
    }

    let mut result = json!({ "edges": to_json(&edges) });

    if params.include_item_info {
        let mut ids: Vec<String> = edges
            .iter()
            .flat_map(|d| [d.from_item_id.clone(), d.to_item_id.clone()])
            .collect();
        ids.sort();
        ids.dedup();
        result["items"] = to_json(&store.find_by_ids(&ids)?);
    }

    if params.neighbors_only {
        let mut neighbor_ids: Vec<String> = edges
            .iter()
            .flat_map(|d| [d.from_item_id.clone(), d.to_item_id.clone()])
            .filter(|id| id != &params.item_id)
            .collect();
        neighbor_ids.sort();
        neighbor_ids.dedup();
        result["neighborIds"] = to_json(&neighbor_ids);
    }

    if params.chain {
        let max_nodes = params.max_depth.unwrap_or(200).max(1) as usize;
        let nodes = bounded_connected_subgraph(store, &params.item_id, max_nodes)?;
        let subgraph_edges = collect_edges_among(store, &nodes)?;
        let chain = dependency_graph::topological_order(&nodes, &subgraph_edges);
        result["depth"] = json!(chain.len());
        result["chain"] = to_json(&chain);
    }

    Ok(result)
}

// ---------------------------------------------------------------------------
// manage_notes
// ---------------------------------------------------------------------------

fn handle_manage_notes(store: &dyn Repository, params: ManageNotesParams) -> Result<Value> {
    match params.op.as_str() {
        "upsert" => {
            let mut notes = Vec::new();
            let mut failures = Vec::new();
            for (index, raw) in params.notes.into_iter().enumerate() {
                match upsert_one_note(store, raw) {
                    Ok(note) => notes.push(to_json(&note)),
                    Err(e) => failures.push(json!({"index": index, "error": e.to_string()})),
                }
            }
            Ok(json!({
                "total": notes.len() + failures.len(),
                "succeeded": notes.len(),
                "failed": failures.len(),
                "notes": notes,
                "failures": failures,
            }))
        }
        "delete" => {
            if !params.ids.is_empty() {
                let mut deleted = Vec::new();
                let mut failures = Vec::new();
                for id in &params.ids {
                    match store.delete_note(id) {
                        Ok(()) => deleted.push(id.clone()),
                        Err(e) => failures.push(json!({"id": id, "error": e.to_string()})),
                    }
                }
                return Ok(json!({ "deletedIds": deleted, "failures": failures }));
            }

            let item_id = params
                .item_id
                .ok_or_else(|| AppError::BadRequest("delete requires 'ids' or 'itemId'".into()))?;

            if let Some(key) = params.key {
                match store.find_note_by_item_and_key(&item_id, &key)? {
                    Some(note) => {
                        store.delete_note(&note.id)?;
                        Ok(json!({ "deletedIds": [note.id] }))
                    }
                    None => Ok(json!({ "deletedIds": Vec::<String>::new() })),
                }
            } else {
                store.delete_notes_by_item(&item_id)?;
                Ok(json!({ "itemId": item_id }))
            }
        }
        other => Err(AppError::BadRequest(format!(
            "unknown op '{other}' for manage_notes"
        ))),
    }
}

fn upsert_one_note(store: &dyn Repository, raw: NoteWriteItem) -> Result<Note> {
    store.get_item(&raw.item_id)?;
    let role = parse_note_role(&raw.role)?;
    let note = Note {
        id: String::new(),
        item_id: raw.item_id,
        key: raw.key,
        role,
        body: raw.body,
        created_at: Utc::now(),
        modified_at: Utc::now(),
    };
    validate_note(&note)?;
    Ok(store.upsert_note(&note)?)
}

// ---------------------------------------------------------------------------
// advance_item
// ---------------------------------------------------------------------------

fn handle_advance_item(
    repo: &dyn Repository,
    note_schema: &dyn forge_core::note_schema::NoteSchemaSource,
    params: AdvanceItemParams,
    max_cascade_depth: u32,
) -> Result<Value> {
    let mut results = Vec::new();
    let mut failures = Vec::new();
    let mut all_unblocked: Vec<String> = Vec::new();

    for entry in params.items {
        let trigger = match parse_trigger(&entry.trigger) {
            Ok(t) => t,
            Err(e) => {
                failures.push(json!({"itemId": entry.item_id, "error": e.to_string()}));
                continue;
            }
        };

        match forge_engine::advance_item(
            repo,
            note_schema,
            &entry.item_id,
            trigger,
            entry.summary,
            max_cascade_depth,
        ) {
            Ok(outcome) => {
                all_unblocked.extend(outcome.unblocked_item_ids.clone());
                results.push(json!({ "itemId": entry.item_id, "outcome": to_json(&outcome) }));
            }
            Err(e) => failures.push(engine_failure_json(&entry.item_id, &e)),
        }
    }

    all_unblocked.sort();
    all_unblocked.dedup();

    Ok(json!({
        "total": results.len() + failures.len(),
        "succeeded": results.len(),
        "failed": failures.len(),
        "results": results,
        "failures": failures,
        "allUnblockedItems": all_unblocked,
    }))
}

// ---------------------------------------------------------------------------
// complete_tree
// ---------------------------------------------------------------------------

fn handle_complete_tree(
    repo: &dyn Repository,
    note_schema: &dyn forge_core::note_schema::NoteSchemaSource,
    params: CompleteTreeParams,
    max_cascade_depth: u32,
) -> Result<Value> {
    let trigger = match params.trigger.as_deref() {
        Some("cancel") => Trigger::Cancel,
        Some("complete") | None => Trigger::Complete,
        Some(other) => {
            return Err(AppError::BadRequest(format!(
                "unknown complete_tree trigger '{other}'"
            )))
        }
    };

    let node_ids: Vec<String> = if let Some(root_id) = &params.root_id {
        let mut ids: Vec<String> = repo
            .find_descendants(root_id)?
            .into_iter()
            .map(|i| i.id)
            .collect();
        ids.push(root_id.clone());
        ids
    } else if !params.item_ids.is_empty() {
        params.item_ids.clone()
    } else {
        return Err(AppError::BadRequest(
            "complete_tree requires 'rootId' or 'itemIds'".into(),
        ));
    };

    let deps = collect_edges_among(repo, &node_ids)?;
    let order = dependency_graph::topological_order(&node_ids, &deps);
    let adjacency = dependency_graph::gating_adjacency(&deps);

    let mut skipped: HashSet<String> = params.skip_ids.into_iter().collect();
    let mut outcomes: Vec<Value> = Vec::new();
    let mut completed = 0u32;
    let mut skipped_count = 0u32;
    let mut gate_failures = 0u32;

    for item_id in &order {
        if skipped.contains(item_id) {
            outcomes.push(json!({"itemId": item_id, "status": "skipped", "reason": "dependency gate failed"}));
            skipped_count += 1;
            propagate_skip(&adjacency, item_id, &mut skipped);
            continue;
        }

        let item = match repo.get_item(item_id) {
            Ok(item) => item,
            Err(e) => {
                outcomes.push(json!({"itemId": item_id, "status": "error", "error": e.to_string()}));
                propagate_skip(&adjacency, item_id, &mut skipped);
                continue;
            }
        };

        if item.role == Role::Terminal {
            outcomes.push(json!({"itemId": item_id, "status": "skipped", "reason": "already terminal"}));
            skipped_count += 1;
            continue;
        }

        match forge_engine::advance_item(repo, note_schema, item_id, trigger, None, max_cascade_depth) {
            Ok(outcome) => {
                completed += 1;
                outcomes.push(json!({"itemId": item_id, "status": "completed", "outcome": to_json(&outcome)}));
            }
            Err(e) => {
                if matches!(e, EngineError::Gate { .. }) {
                    gate_failures += 1;
                }
                let mut failure = engine_failure_json(item_id, &e);
                failure["status"] = json!("failed");
                outcomes.push(failure);
                propagate_skip(&adjacency, item_id, &mut skipped);
            }
        }
    }

    Ok(json!({
        "total": order.len(),
        "completed": completed,
        "skipped": skipped_count,
        "gateFailures": gate_failures,
        "items": outcomes,
    }))
}

// ---------------------------------------------------------------------------
// get_next_item / get_blocked_items
// ---------------------------------------------------------------------------

fn handle_get_next_item(repo: &dyn Repository, params: GetNextItemParams) -> Result<Value> {
    let limit = params.limit.unwrap_or(1).clamp(1, 20) as usize;

    let filter = WorkItemFilter {
        role: Some(Role::Queue),
        parent_id: params.parent_id.clone(),
        limit: Some(200),
        ..Default::default()
    };
    let candidates = repo.find_by_filters(&filter)?;

    let mut ready: Vec<WorkItem> = Vec::new();
    for item in candidates {
        let deps = repo.find_dependencies_by_item(&item.id)?;
        let role_of = role_map_for(repo, &deps)?;
        if dependency_graph::unsatisfied_blockers(&item.id, &deps, &role_of).is_empty() {
            ready.push(item);
        }
    }

    ready.sort_by_key(forge_engine::queue_priority_key);
    ready.truncate(limit);

    let ancestors = if params.include_ancestors {
        let ids: Vec<String> = ready.iter().map(|i| i.id.clone()).collect();
        Some(repo.find_ancestor_chains(&ids)?)
    } else {
        None
    };

    Ok(json!({
        "items": to_json(&ready),
        "ancestors": ancestors.map(|a| to_json(&a)),
    }))
}

fn handle_get_blocked_items(repo: &dyn Repository, params: GetBlockedItemsParams) -> Result<Value> {
    let limit = params.limit.unwrap_or(200).clamp(1, 1000) as usize;

    let mut candidates: Vec<WorkItem> = Vec::new();
    for role in [Role::Blocked, Role::Queue, Role::Work, Role::Review] {
        let filter = WorkItemFilter {
            role: Some(role),
            parent_id: params.parent_id.clone(),
            limit: Some(limit as i64),
            ..Default::default()
        };
        candidates.extend(repo.find_by_filters(&filter)?);
    }

    let mut results = Vec::new();
    for item in candidates {
        let deps = repo.find_dependencies_by_item(&item.id)?;
        let role_of = role_map_for(repo, &deps)?;
        let status = dependency_graph::classify_block_status(&item.id, item.role, &deps, &role_of);
        if status.blocked {
            results.push(json!({
                "item": to_json(&item),
                "blockType": match status.block_type {
                    Some(BlockType::Explicit) => "explicit",
                    Some(BlockType::Dependency) => "dependency",
                    None => "none",
                },
                "blockers": to_json(&status.blockers),
            }));
        }
    }
    results.truncate(limit);

    Ok(json!({ "items": results, "total": results.len() }))
}

// ---------------------------------------------------------------------------
// ForgeServer
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct ForgeServer {
    state: AppState,
    tool_router: ToolRouter<ForgeServer>,
}

#[tool_router]
impl ForgeServer {
    pub fn new(state: AppState) -> Self {
        Self {
            state,
            tool_router: Self::tool_router(),
        }
    }

    #[tool(description = "Create, update, or delete work items. Each element in \
        'items' is handled independently; failures are reported per-element \
        without aborting the batch.")]
    pub async fn manage_items(
        &self,
        Parameters(mut params): Parameters<ManageItemsParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        let store = self.state.store.clone();
        let is_tree_create = params.op == "create" && params.tree.is_some();

        let result = if is_tree_create {
            let tree_input = params.tree.take().unwrap();
            run_blocking(move || tree::create_work_tree(store.as_ref(), tree_input)).await
        } else {
            run_blocking(move || handle_manage_items(store.as_ref(), params)).await
        };

        envelope_result(result)
    }

    #[tool(description = "Fetch items by id ('get'), run a filtered search \
        ('search'), or list the root-level overview ('overview').")]
    pub async fn query_items(
        &self,
        Parameters(params): Parameters<QueryItemsParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        let store = self.state.store.clone();
        let result = run_blocking(move || handle_query_items(store.as_ref(), params)).await;
        envelope_result(result)
    }

    #[tool(description = "Create dependency edges (explicitly, or via the \
        'linear'/'fan-out'/'fan-in' shortcuts) or delete them.")]
    pub async fn manage_dependencies(
        &self,
        Parameters(params): Parameters<ManageDependenciesParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        let store = self.state.store.clone();
        let result = run_blocking(move || handle_manage_dependencies(store.as_ref(), params)).await;
        envelope_result(result)
    }

    #[tool(description = "List the dependency edges touching an item, \
        optionally enriched with endpoint details or the connected \
        subgraph's topological chain.")]
    pub async fn query_dependencies(
        &self,
        Parameters(params): Parameters<QueryDependenciesParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        let store = self.state.store.clone();
        let result = run_blocking(move || handle_query_dependencies(store.as_ref(), params)).await;
        envelope_result(result)
    }

    #[tool(description = "Upsert or delete notes keyed by (itemId, key).")]
    pub async fn manage_notes(
        &self,
        Parameters(params): Parameters<ManageNotesParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        let store = self.state.store.clone();
        let result = run_blocking(move || handle_manage_notes(store.as_ref(), params)).await;
        envelope_result(result)
    }

    #[tool(description = "Advance one or more items through the workflow \
        state machine (start/complete/block/hold/resume/cancel). Each \
        element is independent; failures are reported per-element.")]
    pub async fn advance_item(
        &self,
        Parameters(params): Parameters<AdvanceItemParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        let store = self.state.store.clone();
        let note_schema = self.state.note_schema.clone();
        let max_cascade_depth = self.state.config.max_cascade_depth;
        let result = run_blocking(move || {
            handle_advance_item(store.as_ref(), note_schema.as_ref(), params, max_cascade_depth)
        })
        .await;
        envelope_result(result)
    }

    #[tool(description = "Complete or cancel a whole subtree (or an \
        explicit item set) in dependency-respecting topological order, \
        skipping dependents of any item that fails its gate.")]
    pub async fn complete_tree(
        &self,
        Parameters(params): Parameters<CompleteTreeParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        let store = self.state.store.clone();
        let note_schema = self.state.note_schema.clone();
        let max_cascade_depth = self.state.config.max_cascade_depth;
        let result = run_blocking(move || {
            handle_complete_tree(store.as_ref(), note_schema.as_ref(), params, max_cascade_depth)
        })
        .await;
        envelope_result(result)
    }

    #[tool(description = "Return the highest-priority unblocked QUEUE \
        items, quick-wins-first (priority, then complexity ascending).")]
    pub async fn get_next_item(
        &self,
        Parameters(params): Parameters<GetNextItemParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        let store = self.state.store.clone();
        let result = run_blocking(move || handle_get_next_item(store.as_ref(), params)).await;
        envelope_result(result)
    }

    #[tool(description = "List items that are explicitly BLOCKED or have \
        at least one unsatisfied dependency, with their blockers.")]
    pub async fn get_blocked_items(
        &self,
        Parameters(params): Parameters<GetBlockedItemsParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        let store = self.state.store.clone();
        let result = run_blocking(move || handle_get_blocked_items(store.as_ref(), params)).await;
        envelope_result(result)
    }
}

#[tool_handler]
impl ServerHandler for ForgeServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "Task-orchestration core: work items, typed dependency edges, \
                 notes, and a gated role lifecycle (QUEUE -> WORK -> REVIEW -> \
                 TERMINAL, with orthogonal BLOCKED). Use manage_items/query_items \
                 for content, manage_dependencies/query_dependencies for the \
                 dependency graph, advance_item to move a single item through \
                 its lifecycle, and complete_tree to finish an entire subtree \
                 in dependency order."
                    .to_string(),
            ),
        }
    }
}
