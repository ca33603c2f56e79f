//! Shared server state handed to every tool handler (spec.md §5, §6).
//!
//! Mirrors `beads-storage::sqlite::store::SqliteStore`'s own
//! `Mutex<Connection>` for serialized access: handlers clone the `Arc` and
//! do the actual blocking call inside `tokio::task::spawn_blocking`, the
//! way this codebase's other embedded-SQLite callers (e.g. `PermissionStorage`)
//! bridge sync `rusqlite` into an async caller.

use std::sync::Arc;

use forge_config::AppConfig;
use forge_core::note_schema::NoteSchemaSource;
use forge_storage::SqliteStore;

/// Everything a tool handler needs, cloneable behind `Arc`s so the MCP
/// server can be `Clone` (required by `rmcp`'s `ServerHandler`).
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<SqliteStore>,
    pub note_schema: Arc<dyn NoteSchemaSource>,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(
        store: SqliteStore,
        note_schema: Arc<dyn NoteSchemaSource>,
        config: AppConfig,
    ) -> Self {
        Self {
            store: Arc::new(store),
            note_schema,
            config,
        }
    }
}
