//! Discovery and management of the `.forge/` project directory.
//!
//! The `.forge/` directory holds a project's configuration file and its
//! SQLite database. This module walks up the directory tree to find it and
//! creates it when initializing a new project.
//!
//! Ported from the teacher's `.beads/` discovery (`find_beads_dir`,
//! `ensure_beads_dir`).

use crate::config::ConfigError;
use std::path::{Path, PathBuf};

/// The name of the project metadata directory.
const FORGE_DIR_NAME: &str = ".forge";

/// The name of the environment variable that can override the project directory.
const FORGE_DIR_ENV: &str = "FORGE_DIR";

/// Walk up the directory tree from `start` looking for a `.forge/` directory.
///
/// Returns the path to the `.forge/` directory if found, or `None` if the
/// filesystem root is reached without finding one. The `FORGE_DIR`
/// environment variable is checked first (highest priority).
pub fn find_forge_dir(start: &Path) -> Option<PathBuf> {
    if let Ok(env_dir) = std::env::var(FORGE_DIR_ENV) {
        let env_path = PathBuf::from(&env_dir);
        if env_path.is_dir() {
            return Some(env_path);
        }
    }

    let start = match start.canonicalize() {
        Ok(p) => p,
        Err(_) => return None,
    };

    let mut current = start.as_path();
    loop {
        let candidate = current.join(FORGE_DIR_NAME);
        if candidate.is_dir() {
            return Some(candidate);
        }

        match current.parent() {
            Some(parent) if parent != current => {
                current = parent;
            }
            _ => break,
        }
    }

    None
}

/// Walk up the directory tree looking for `.forge/`, returning an error if
/// not found.
///
/// # Errors
///
/// Returns [`ConfigError::ForgeDirNotFound`] if no `.forge/` directory is
/// found.
pub fn find_forge_dir_or_error(start: &Path) -> Result<PathBuf, ConfigError> {
    find_forge_dir(start).ok_or(ConfigError::ForgeDirNotFound)
}

/// Ensure a `.forge/` directory exists at the given path.
///
/// If `path` itself is not called `.forge`, a `.forge/` subdirectory is
/// created under it. The directory (and any necessary parents) is created if
/// it does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] if directory creation fails.
pub fn ensure_forge_dir(path: &Path) -> Result<PathBuf, ConfigError> {
    let forge_dir = if path.ends_with(FORGE_DIR_NAME) {
        path.to_path_buf()
    } else {
        path.join(FORGE_DIR_NAME)
    };

    std::fs::create_dir_all(&forge_dir)?;
    Ok(forge_dir)
}
