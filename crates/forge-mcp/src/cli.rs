//! Command-line arguments for the `forge-mcp` server process.

use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "forge-mcp", version, about = "MCP server for the task-orchestration core")]
pub struct Cli {
    /// Project directory to search upward from for a `.forge/` directory.
    /// Defaults to the current directory.
    #[arg(long, env = "FORGE_PROJECT_DIR")]
    pub project_dir: Option<PathBuf>,

    /// Create `.forge/` (and its default config) if it does not exist yet.
    #[arg(long)]
    pub init: bool,

    /// Overrides `RUST_LOG`-style tracing filtering.
    #[arg(long, env = "FORGE_LOG_LEVEL")]
    pub log_level: Option<String>,
}
