//! End-to-end tests for the MCP tool handlers, driven directly against an
//! in-memory store rather than through a stdio subprocess: `ForgeServer`'s
//! tool methods are plain async functions, so a test can call them exactly
//! as the `#[tool_router]`-generated dispatcher would.

use std::sync::Arc;

use rmcp::handler::server::tool::Parameters;
use serde_json::Value;

use forge_config::{AppConfig, YamlNoteSchemaSource};
use forge_mcp::params::{
    AdvanceItemEntry, AdvanceItemParams, CompleteTreeParams, DependencyEdgeInput,
    GetBlockedItemsParams, GetNextItemParams, ItemWriteItem, ManageDependenciesParams,
    ManageItemsParams, ManageNotesParams, NoteWriteItem, QueryDependenciesParams,
    QueryItemsParams,
};
use forge_mcp::{AppState, ForgeServer};
use forge_storage::SqliteStore;

fn new_server() -> ForgeServer {
    let store = SqliteStore::open_in_memory().unwrap();
    let note_schema = Arc::new(YamlNoteSchemaSource::default());
    let state = AppState::new(store, note_schema, AppConfig::default());
    ForgeServer::new(state)
}

fn envelope_data(result: &rmcp::model::CallToolResult) -> Value {
    let content = &result.content[0];
    let text = content.as_text().unwrap();
    let envelope: Value = serde_json::from_str(&text.text).unwrap();
    assert_eq!(
        envelope["success"], true,
        "expected success envelope, got: {envelope}"
    );
    envelope["data"].clone()
}

fn envelope_error(result: &rmcp::model::CallToolResult) -> Value {
    let content = &result.content[0];
    let text = content.as_text().unwrap();
    let envelope: Value = serde_json::from_str(&text.text).unwrap();
    assert_eq!(
        envelope["success"], false,
        "expected failure envelope, got: {envelope}"
    );
    envelope["error"].clone()
}

fn create_item(title: &str) -> ItemWriteItem {
    ItemWriteItem {
        title: Some(title.to_string()),
        ..Default::default()
    }
}

// ---------------------------------------------------------------------------
// manage_items / query_items
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_then_fetch_item() {
    let server = new_server();

    let result = server
        .manage_items(Parameters(ManageItemsParams {
            op: "create".into(),
            items: vec![create_item("Write the RFC")],
            tree: None,
        }))
        .await
        .unwrap();
    let data = envelope_data(&result);
    assert_eq!(data["succeeded"], 1);
    let id = data["items"][0]["id"].as_str().unwrap().to_string();

    let result = server
        .query_items(Parameters(QueryItemsParams {
            op: "get".into(),
            ids: vec![id.clone()],
            query: None,
            parent_id: None,
            depth: None,
            role: None,
            priority: None,
            tags: vec![],
            limit: None,
            offset: None,
            sort_by: None,
            sort_order: None,
            include_ancestors: false,
            include_children: false,
        }))
        .await
        .unwrap();
    let data = envelope_data(&result);
    assert_eq!(data["items"][0]["id"], id);
    assert_eq!(data["items"][0]["role"], "queue");
}

#[tokio::test]
async fn update_requires_expected_version() {
    let server = new_server();

    let result = server
        .manage_items(Parameters(ManageItemsParams {
            op: "create".into(),
            items: vec![create_item("Needs a version bump")],
            tree: None,
        }))
        .await
        .unwrap();
    let id = envelope_data(&result)["items"][0]["id"]
        .as_str()
        .unwrap()
        .to_string();

    let result = server
        .manage_items(Parameters(ManageItemsParams {
            op: "update".into(),
            items: vec![ItemWriteItem {
                id: Some(id.clone()),
                title: Some("Renamed".into()),
                expected_version: Some(1),
                ..Default::default()
            }],
            tree: None,
        }))
        .await
        .unwrap();
    let data = envelope_data(&result);
    assert_eq!(data["succeeded"], 1);
    assert_eq!(data["items"][0]["title"], "Renamed");
    assert_eq!(data["items"][0]["version"], 2);

    // Stale expectedVersion fails this element without aborting the batch.
    let result = server
        .manage_items(Parameters(ManageItemsParams {
            op: "update".into(),
            items: vec![ItemWriteItem {
                id: Some(id),
                title: Some("Stale write".into()),
                expected_version: Some(1),
                ..Default::default()
            }],
            tree: None,
        }))
        .await
        .unwrap();
    let data = envelope_data(&result);
    assert_eq!(data["succeeded"], 0);
    assert_eq!(data["failed"], 1);
}

// ---------------------------------------------------------------------------
// Atomic work-tree creation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn tree_create_inserts_root_children_and_dependencies_atomically() {
    let server = new_server();

    let tree = serde_json::json!({
        "items": [
            {"ref": "root", "title": "Ship the feature"},
            {"ref": "design", "parentRef": "root", "title": "Design"},
            {"ref": "build", "parentRef": "root", "title": "Build"}
        ],
        "dependencies": [
            {"fromRef": "build", "toRef": "design", "type": "blocks"}
        ]
    });
    let params: ManageItemsParams = serde_json::from_value(serde_json::json!({
        "op": "create",
        "tree": tree,
    }))
    .unwrap();

    let result = server.manage_items(Parameters(params)).await.unwrap();
    let data = envelope_data(&result);
    assert_eq!(data["items"].as_array().unwrap().len(), 3);
    assert_eq!(data["refs"].as_object().unwrap().len(), 3);
}

#[tokio::test]
async fn tree_create_rejects_unknown_parent_ref() {
    let server = new_server();

    let tree = serde_json::json!({
        "items": [
            {"ref": "orphan", "parentRef": "missing", "title": "Dangling"}
        ]
    });
    let params: ManageItemsParams = serde_json::from_value(serde_json::json!({
        "op": "create",
        "tree": tree,
    }))
    .unwrap();

    let result = server.manage_items(Parameters(params)).await.unwrap();
    let error = envelope_error(&result);
    assert_eq!(error["code"], "VALIDATION_ERROR");
}

// ---------------------------------------------------------------------------
// Dependencies and blocking
// ---------------------------------------------------------------------------

#[tokio::test]
async fn blocked_item_excluded_from_next_item_until_dependency_completes() {
    let server = new_server();

    let result = server
        .manage_items(Parameters(ManageItemsParams {
            op: "create".into(),
            items: vec![create_item("Foundation"), create_item("Build on it")],
            tree: None,
        }))
        .await
        .unwrap();
    let data = envelope_data(&result);
    let foundation = data["items"][0]["id"].as_str().unwrap().to_string();
    let build = data["items"][1]["id"].as_str().unwrap().to_string();

    server
        .manage_dependencies(Parameters(ManageDependenciesParams {
            op: "create".into(),
            pattern: None,
            edges: vec![DependencyEdgeInput {
                from_item_id: build.clone(),
                to_item_id: foundation.clone(),
                dep_type: Some("blocks".into()),
                unblock_at: None,
            }],
            ids: vec![],
            from: None,
            to: None,
            targets: vec![],
            sources: vec![],
            dep_type: None,
            unblock_at: None,
            id: None,
            from_item_id: None,
            to_item_id: None,
            delete_all: None,
        }))
        .await
        .unwrap();

    let result = server
        .get_next_item(Parameters(GetNextItemParams {
            parent_id: None,
            limit: Some(10),
            include_ancestors: false,
        }))
        .await
        .unwrap();
    let data = envelope_data(&result);
    let ids: Vec<&str> = data["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["id"].as_str().unwrap())
        .collect();
    assert!(ids.contains(&foundation.as_str()));
    assert!(!ids.contains(&build.as_str()));

    let result = server
        .get_blocked_items(Parameters(GetBlockedItemsParams {
            parent_id: None,
            limit: None,
        }))
        .await
        .unwrap();
    let data = envelope_data(&result);
    let blocked_ids: Vec<&str> = data["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["item"]["id"].as_str().unwrap())
        .collect();
    assert!(blocked_ids.contains(&build.as_str()));

    server
        .advance_item(Parameters(AdvanceItemParams {
            items: vec![
                AdvanceItemEntry {
                    item_id: foundation.clone(),
                    trigger: "start".into(),
                    summary: None,
                },
                AdvanceItemEntry {
                    item_id: foundation.clone(),
                    trigger: "complete".into(),
                    summary: Some("done".into()),
                },
            ],
        }))
        .await
        .unwrap();

    let result = server
        .get_next_item(Parameters(GetNextItemParams {
            parent_id: None,
            limit: Some(10),
            include_ancestors: false,
        }))
        .await
        .unwrap();
    let data = envelope_data(&result);
    let ids: Vec<&str> = data["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["id"].as_str().unwrap())
        .collect();
    assert!(ids.contains(&build.as_str()), "build should now be ready");
}

#[tokio::test]
async fn query_dependencies_reports_outgoing_edges() {
    let server = new_server();

    let result = server
        .manage_items(Parameters(ManageItemsParams {
            op: "create".into(),
            items: vec![create_item("A"), create_item("B")],
            tree: None,
        }))
        .await
        .unwrap();
    let data = envelope_data(&result);
    let a = data["items"][0]["id"].as_str().unwrap().to_string();
    let b = data["items"][1]["id"].as_str().unwrap().to_string();

    server
        .manage_dependencies(Parameters(ManageDependenciesParams {
            op: "create".into(),
            pattern: None,
            edges: vec![DependencyEdgeInput {
                from_item_id: a.clone(),
                to_item_id: b.clone(),
                dep_type: Some("blocks".into()),
                unblock_at: None,
            }],
            ids: vec![],
            from: None,
            to: None,
            targets: vec![],
            sources: vec![],
            dep_type: None,
            unblock_at: None,
            id: None,
            from_item_id: None,
            to_item_id: None,
            delete_all: None,
        }))
        .await
        .unwrap();

    let result = server
        .query_dependencies(Parameters(QueryDependenciesParams {
            item_id: a.clone(),
            direction: Some("outgoing".into()),
            dep_type: None,
            include_item_info: false,
            neighbors_only: true,
            chain: false,
            max_depth: None,
        }))
        .await
        .unwrap();
    let data = envelope_data(&result);
    assert_eq!(data["edges"].as_array().unwrap().len(), 1);
    assert_eq!(data["neighborIds"][0], b);
}

// ---------------------------------------------------------------------------
// Notes and gates
// ---------------------------------------------------------------------------

#[tokio::test]
async fn note_upsert_and_delete_round_trip() {
    let server = new_server();

    let result = server
        .manage_items(Parameters(ManageItemsParams {
            op: "create".into(),
            items: vec![create_item("Needs a note")],
            tree: None,
        }))
        .await
        .unwrap();
    let id = envelope_data(&result)["items"][0]["id"]
        .as_str()
        .unwrap()
        .to_string();

    let result = server
        .manage_notes(Parameters(ManageNotesParams {
            op: "upsert".into(),
            notes: vec![NoteWriteItem {
                item_id: id.clone(),
                key: "acceptance-criteria".into(),
                role: "work".into(),
                body: "Must pass CI".into(),
            }],
            ids: vec![],
            item_id: None,
            key: None,
        }))
        .await
        .unwrap();
    let data = envelope_data(&result);
    assert_eq!(data["succeeded"], 1);

    let result = server
        .manage_notes(Parameters(ManageNotesParams {
            op: "delete".into(),
            notes: vec![],
            ids: vec![],
            item_id: Some(id),
            key: Some("acceptance-criteria".into()),
        }))
        .await
        .unwrap();
    let data = envelope_data(&result);
    assert_eq!(data["deletedIds"].as_array().unwrap().len(), 1);
}

// ---------------------------------------------------------------------------
// complete_tree
// ---------------------------------------------------------------------------

#[tokio::test]
async fn complete_tree_walks_dependency_order() {
    let server = new_server();

    let tree = serde_json::json!({
        "items": [
            {"ref": "root", "title": "Launch"},
            {"ref": "a", "parentRef": "root", "title": "A"},
            {"ref": "b", "parentRef": "root", "title": "B"}
        ],
        "dependencies": [
            {"fromRef": "b", "toRef": "a", "type": "blocks"}
        ]
    });
    let params: ManageItemsParams = serde_json::from_value(serde_json::json!({
        "op": "create",
        "tree": tree,
    }))
    .unwrap();
    let result = server.manage_items(Parameters(params)).await.unwrap();
    let data = envelope_data(&result);
    let root = data["refs"]["root"].as_str().unwrap().to_string();

    for id in [
        data["refs"]["a"].as_str().unwrap(),
        data["refs"]["b"].as_str().unwrap(),
    ] {
        server
            .advance_item(Parameters(AdvanceItemParams {
                items: vec![AdvanceItemEntry {
                    item_id: id.to_string(),
                    trigger: "start".into(),
                    summary: None,
                }],
            }))
            .await
            .unwrap();
    }

    let result = server
        .complete_tree(Parameters(CompleteTreeParams {
            root_id: Some(root),
            item_ids: vec![],
            trigger: None,
            skip_ids: vec![],
        }))
        .await
        .unwrap();
    let data = envelope_data(&result);
    assert!(data["completed"].as_u64().unwrap() >= 2);
}

#[tokio::test]
async fn completing_last_child_cascades_parent_to_terminal() {
    let server = new_server();

    let tree = serde_json::json!({
        "items": [
            {"ref": "root", "title": "Launch"},
            {"ref": "c1", "parentRef": "root", "title": "C1"},
            {"ref": "c2", "parentRef": "root", "title": "C2"}
        ],
    });
    let params: ManageItemsParams = serde_json::from_value(serde_json::json!({
        "op": "create",
        "tree": tree,
    }))
    .unwrap();
    let result = server.manage_items(Parameters(params)).await.unwrap();
    let data = envelope_data(&result);
    let root = data["refs"]["root"].as_str().unwrap().to_string();
    let c1 = data["refs"]["c1"].as_str().unwrap().to_string();
    let c2 = data["refs"]["c2"].as_str().unwrap().to_string();

    server
        .advance_item(Parameters(AdvanceItemParams {
            items: vec![AdvanceItemEntry {
                item_id: c1,
                trigger: "complete".into(),
                summary: None,
            }],
        }))
        .await
        .unwrap();

    let query_params: QueryItemsParams = serde_json::from_value(serde_json::json!({
        "op": "get",
        "ids": [root.clone()],
    }))
    .unwrap();
    let result = server.query_items(Parameters(query_params)).await.unwrap();
    let data = envelope_data(&result);
    assert_eq!(data["items"][0]["role"], "queue", "root not yet cascaded");

    let result = server
        .advance_item(Parameters(AdvanceItemParams {
            items: vec![AdvanceItemEntry {
                item_id: c2,
                trigger: "complete".into(),
                summary: None,
            }],
        }))
        .await
        .unwrap();
    let data = envelope_data(&result);
    let cascade_events = &data["results"][0]["outcome"]["cascadeEvents"];
    assert_eq!(cascade_events[0]["itemId"], root);
    assert_eq!(cascade_events[0]["targetRole"], "terminal");

    let query_params: QueryItemsParams = serde_json::from_value(serde_json::json!({
        "op": "get",
        "ids": [root.clone()],
    }))
    .unwrap();
    let result = server.query_items(Parameters(query_params)).await.unwrap();
    let data = envelope_data(&result);
    assert_eq!(data["items"][0]["role"], "terminal");
}

#[tokio::test]
async fn complete_tree_gate_failure_skips_dependents() {
    let dir = tempfile::tempdir().unwrap();
    let schema_path = dir.path().join("note_schema.yaml");
    std::fs::write(
        &schema_path,
        r#"
schemas:
  default:
    - key: acceptance-criteria
      role: work
      required: true
    - key: post-mortem
      role: review
      required: true
"#,
    )
    .unwrap();
    let note_schema = Arc::new(YamlNoteSchemaSource::load(&schema_path).unwrap());
    let store = SqliteStore::open_in_memory().unwrap();
    let state = AppState::new(store, note_schema, AppConfig::default());
    let server = ForgeServer::new(state);

    let tree = serde_json::json!({
        "items": [
            {"ref": "x", "title": "X"},
            {"ref": "y", "title": "Y"},
            {"ref": "z", "title": "Z"}
        ],
        "dependencies": [
            {"fromRef": "x", "toRef": "y", "type": "blocks"},
            {"fromRef": "x", "toRef": "z", "type": "blocks"}
        ],
    });
    let params: ManageItemsParams = serde_json::from_value(serde_json::json!({
        "op": "create",
        "tree": tree,
    }))
    .unwrap();
    let result = server.manage_items(Parameters(params)).await.unwrap();
    let data = envelope_data(&result);
    let x = data["refs"]["x"].as_str().unwrap().to_string();
    let y = data["refs"]["y"].as_str().unwrap().to_string();
    let z = data["refs"]["z"].as_str().unwrap().to_string();

    // X has no acceptance-criteria/post-mortem notes, so its complete gate
    // fails; Y and Z are its dependents within the target set and should
    // be skipped rather than attempted (spec.md §8 scenario 6).
    let result = server
        .complete_tree(Parameters(CompleteTreeParams {
            root_id: None,
            item_ids: vec![x.clone(), y.clone(), z.clone()],
            trigger: None,
            skip_ids: vec![],
        }))
        .await
        .unwrap();
    let data = envelope_data(&result);
    assert_eq!(data["completed"], 0);
    assert_eq!(data["gateFailures"], 1);
    assert_eq!(data["skipped"], 2);

    let skipped_reasons: Vec<&str> = data["items"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|item| item["status"] == "skipped")
        .map(|item| item["reason"].as_str().unwrap())
        .collect();
    assert_eq!(skipped_reasons.len(), 2);
    assert!(skipped_reasons
        .iter()
        .all(|reason| *reason == "dependency gate failed"));
}
