//! Wire-format parameter structs for every tool in the catalogue (spec.md
//! §6). Enum-valued fields travel as plain strings and are parsed with the
//! domain enums' own `TryFrom<&str>` at the top of each handler, rather than
//! deriving `schemars::JsonSchema` on the closed domain enums themselves.

use schemars::JsonSchema;
use serde::Deserialize;

use crate::tree::WorkTreeInput;

// ---------------------------------------------------------------------------
// manage_items
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ManageItemsParams {
    /// `"create"`, `"update"`, or `"delete"`.
    pub op: String,
    #[serde(default)]
    pub items: Vec<ItemWriteItem>,
    /// `create` only: atomically create a root, ref-named children,
    /// ref-keyed dependencies, and notes in one transaction. When set,
    /// `items` above is ignored.
    pub tree: Option<WorkTreeInput>,
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ItemWriteItem {
    /// Required for `update` and single-id `delete`.
    pub id: Option<String>,
    pub parent_id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub summary: Option<String>,
    /// `"high"`, `"medium"`, or `"low"`.
    pub priority: Option<String>,
    pub complexity: Option<i32>,
    pub requires_verification: Option<bool>,
    pub tags: Option<Vec<String>>,
    pub metadata: Option<String>,
    /// Required for `update`; rejected with `CONFLICT_ERROR` on mismatch.
    pub expected_version: Option<i64>,
    /// `delete` only: delete `id` and every descendant.
    pub with_descendants: Option<bool>,
}

// ---------------------------------------------------------------------------
// query_items
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct QueryItemsParams {
    /// `"get"`, `"search"`, or `"overview"`.
    pub op: String,
    #[serde(default)]
    pub ids: Vec<String>,
    pub query: Option<String>,
    pub parent_id: Option<String>,
    pub depth: Option<i32>,
    /// `"queue"`, `"work"`, `"review"`, `"terminal"`, or `"blocked"`.
    pub role: Option<String>,
    /// `"high"`, `"medium"`, or `"low"`.
    pub priority: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    /// `"created"`, `"modified"`, or `"priority"`.
    pub sort_by: Option<String>,
    /// `"asc"` or `"desc"`.
    pub sort_order: Option<String>,
    #[serde(default)]
    pub include_ancestors: bool,
    #[serde(default)]
    pub include_children: bool,
}

// ---------------------------------------------------------------------------
// manage_dependencies
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ManageDependenciesParams {
    /// `"create"` or `"delete"`.
    pub op: String,
    /// `create` only: `"linear"`, `"fan-out"`, `"fan-in"`; omit for an
    /// explicit `edges` array.
    pub pattern: Option<String>,
    #[serde(default)]
    pub edges: Vec<DependencyEdgeInput>,
    /// `linear`: the ordered chain of item ids.
    #[serde(default)]
    pub ids: Vec<String>,
    /// `fan-out`: the single source item.
    pub from: Option<String>,
    /// `fan-in`: the single target item.
    pub to: Option<String>,
    /// `fan-out`: the target items.
    #[serde(default)]
    pub targets: Vec<String>,
    /// `fan-in`: the source items.
    #[serde(default)]
    pub sources: Vec<String>,
    /// Default edge type applied to pattern-generated edges lacking one of
    /// their own. `"blocks"`, `"is_blocked_by"`, or `"relates_to"`.
    #[serde(rename = "type")]
    pub dep_type: Option<String>,
    pub unblock_at: Option<String>,
    /// `delete` by edge id.
    pub id: Option<String>,
    /// `delete` by `(from,to)` or by one endpoint, optionally type-filtered.
    pub from_item_id: Option<String>,
    pub to_item_id: Option<String>,
    /// `delete` by one endpoint: remove every edge touching it.
    pub delete_all: Option<bool>,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DependencyEdgeInput {
    pub from_item_id: String,
    pub to_item_id: String,
    #[serde(rename = "type")]
    pub dep_type: Option<String>,
    pub unblock_at: Option<String>,
}

// ---------------------------------------------------------------------------
// query_dependencies
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct QueryDependenciesParams {
    pub item_id: String,
    /// `"incoming"`, `"outgoing"`, or `"all"` (default).
    pub direction: Option<String>,
    #[serde(rename = "type")]
    pub dep_type: Option<String>,
    #[serde(default)]
    pub include_item_info: bool,
    #[serde(default)]
    pub neighbors_only: bool,
    /// Also return a topological `chain` of the connected subgraph.
    #[serde(default)]
    pub chain: bool,
    /// BFS bound when `chain` is set. Defaults to 200.
    pub max_depth: Option<i32>,
}

// ---------------------------------------------------------------------------
// manage_notes
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ManageNotesParams {
    /// `"upsert"` or `"delete"`.
    pub op: String,
    #[serde(default)]
    pub notes: Vec<NoteWriteItem>,
    /// `delete` by note id.
    #[serde(default)]
    pub ids: Vec<String>,
    /// `delete` by item: removes every note on the item (or, with `key`,
    /// just the one keyed note).
    pub item_id: Option<String>,
    pub key: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NoteWriteItem {
    pub item_id: String,
    pub key: String,
    /// `"queue"`, `"work"`, or `"review"`.
    pub role: String,
    #[serde(default)]
    pub body: String,
}

// ---------------------------------------------------------------------------
// advance_item
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdvanceItemParams {
    pub items: Vec<AdvanceItemEntry>,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdvanceItemEntry {
    pub item_id: String,
    /// `"start"`, `"complete"`, `"block"`, `"hold"`, `"resume"`, or `"cancel"`.
    pub trigger: String,
    pub summary: Option<String>,
}

// ---------------------------------------------------------------------------
// complete_tree
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompleteTreeParams {
    /// Descendants of this root make up the target set.
    pub root_id: Option<String>,
    /// An explicit target set, instead of `rootId`.
    #[serde(default)]
    pub item_ids: Vec<String>,
    /// `"complete"` (default) or `"cancel"`.
    pub trigger: Option<String>,
    /// Pre-marked skipped items; propagates to their dependents.
    #[serde(default)]
    pub skip_ids: Vec<String>,
}

// ---------------------------------------------------------------------------
// get_next_item / get_blocked_items
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GetNextItemParams {
    pub parent_id: Option<String>,
    /// 1-20, default 1.
    pub limit: Option<i64>,
    #[serde(default)]
    pub include_ancestors: bool,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GetBlockedItemsParams {
    pub parent_id: Option<String>,
    pub limit: Option<i64>,
}
