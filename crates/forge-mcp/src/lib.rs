//! Library surface for the `forge-mcp` binary, split out so integration
//! tests can exercise tool handlers without spawning a subprocess.

pub mod envelope;
pub mod error;
pub mod params;
pub mod server;
pub mod state;
pub mod tree;

pub use envelope::{Envelope, ErrorCode};
pub use error::AppError;
pub use server::ForgeServer;
pub use state::AppState;
