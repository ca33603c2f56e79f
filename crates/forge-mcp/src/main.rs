//! `forge-mcp` -- MCP server exposing the task-orchestration core as tools.
//!
//! Resolves the `.forge/` project directory, loads config and the
//! note-schema source, opens the SQLite store, and serves the tool catalogue
//! over stdio (spec.md §5, §6).

mod cli;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use rmcp::transport::io::stdio;
use rmcp::ServiceExt;

use forge_config::{ensure_forge_dir, find_forge_dir, load_config, YamlNoteSchemaSource};
use forge_mcp::{AppState, ForgeServer};
use forge_storage::SqliteStore;

use cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = cli
        .log_level
        .clone()
        .unwrap_or_else(|| "forge_mcp=info,forge_engine=info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let project_dir = cli
        .project_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from("."));

    let forge_dir = if cli.init {
        ensure_forge_dir(&project_dir)?
    } else {
        find_forge_dir(&project_dir).ok_or_else(|| {
            anyhow::anyhow!(
                "no .forge directory found under {}; rerun with --init to create one",
                project_dir.display()
            )
        })?
    };

    let config = load_config(&forge_dir)?;
    let db_path = config.resolved_db_path(&forge_dir);
    let schema_path = config.resolved_note_schema_path(&forge_dir);

    tracing::info!(db_path = %db_path.display(), "opening store");
    let store = SqliteStore::open(&db_path)?;
    let note_schema: Arc<dyn forge_core::note_schema::NoteSchemaSource> =
        Arc::new(YamlNoteSchemaSource::load(&schema_path)?);

    let state = AppState::new(store, note_schema, config);
    let server = ForgeServer::new(state);

    tracing::info!("forge-mcp serving on stdio");
    let service = server.serve(stdio()).await?;
    service.waiting().await?;

    Ok(())
}
