//! Configuration types and loading for the task-orchestration service.
//!
//! The main entry point is [`AppConfig`], which represents the contents of
//! `.forge/config.yaml` merged with `FORGE_`-prefixed environment variables.
//! Configuration is loaded with [`load_config`] via [`figment`].
//!
//! Ported from the teacher's `beads_config::config` module, trimmed to the
//! single-process scope of spec.md (no federation, sync, or conflict
//! resolution — see DESIGN.md).

use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration could not be loaded or merged by figment.
    #[error("failed to load configuration: {0}")]
    Figment(#[from] figment::Error),

    /// The note-schema file contained invalid YAML.
    #[error("failed to parse note schema file: {0}")]
    ParseError(#[from] serde_yaml::Error),

    /// The `.forge/` directory was not found.
    #[error("no .forge directory found (run init first)")]
    ForgeDirNotFound,

    /// A configuration value was invalid.
    #[error("invalid configuration value for key '{key}': {reason}")]
    InvalidValue { key: String, reason: String },
}

/// A specialized `Result` type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Application configuration for the task-orchestration service (spec.md
/// §4.1's repository facade, §5's single-process store, §6's note-schema
/// source).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AppConfig {
    /// Path to the SQLite database file, relative to the `.forge/`
    /// directory unless absolute.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Path to the note-schema YAML file (spec.md §6's `getSchemaForTags`),
    /// relative to the `.forge/` directory unless absolute.
    #[serde(default = "default_note_schema_path")]
    pub note_schema_path: PathBuf,

    /// Maximum dependency cascade depth guarded against by the workflow
    /// engine (spec.md §4.3.5).
    #[serde(default = "default_max_cascade_depth")]
    pub max_cascade_depth: u32,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("forge.db")
}

fn default_note_schema_path() -> PathBuf {
    PathBuf::from("note_schema.yaml")
}

fn default_max_cascade_depth() -> u32 {
    16
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            note_schema_path: default_note_schema_path(),
            max_cascade_depth: default_max_cascade_depth(),
        }
    }
}

impl AppConfig {
    /// Resolves [`Self::db_path`] against `forge_dir` if it is relative.
    pub fn resolved_db_path(&self, forge_dir: &Path) -> PathBuf {
        resolve(forge_dir, &self.db_path)
    }

    /// Resolves [`Self::note_schema_path`] against `forge_dir` if it is
    /// relative.
    pub fn resolved_note_schema_path(&self, forge_dir: &Path) -> PathBuf {
        resolve(forge_dir, &self.note_schema_path)
    }
}

fn resolve(base: &Path, candidate: &Path) -> PathBuf {
    if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        base.join(candidate)
    }
}

/// Loads [`AppConfig`] from `<forge_dir>/config.yaml`, merged over the
/// defaults, then overridden by `FORGE_`-prefixed environment variables
/// (e.g. `FORGE_DB_PATH`).
///
/// Matches the teacher's figment layering: defaults, then file, then env,
/// each layer overriding the last.
pub fn load_config(forge_dir: &Path) -> Result<AppConfig> {
    let config_path = forge_dir.join("config.yaml");
    let figment = Figment::from(Serialized::defaults(AppConfig::default()))
        .merge(Yaml::file(config_path))
        .merge(Env::prefixed("FORGE_"));

    Ok(figment.extract()?)
}

/// Writes `config` to `<forge_dir>/config.yaml` as YAML.
pub fn save_config(forge_dir: &Path, config: &AppConfig) -> Result<()> {
    let config_path = forge_dir.join("config.yaml");
    let yaml = serde_yaml::to_string(config).map_err(ConfigError::ParseError)?;
    std::fs::write(config_path, yaml)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_paths() {
        let config = AppConfig::default();
        assert_eq!(config.db_path, PathBuf::from("forge.db"));
        assert_eq!(config.note_schema_path, PathBuf::from("note_schema.yaml"));
        assert_eq!(config.max_cascade_depth, 16);
    }

    #[test]
    fn load_config_falls_back_to_defaults_when_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(dir.path()).unwrap();
        assert_eq!(config.db_path, PathBuf::from("forge.db"));
    }

    #[test]
    fn load_config_reads_yaml_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("config.yaml"),
            "db-path: custom.db\nmax-cascade-depth: 8\n",
        )
        .unwrap();

        let config = load_config(dir.path()).unwrap();
        assert_eq!(config.db_path, PathBuf::from("custom.db"));
        assert_eq!(config.max_cascade_depth, 8);
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig {
            db_path: PathBuf::from("roundtrip.db"),
            note_schema_path: PathBuf::from("schema.yaml"),
            max_cascade_depth: 4,
        };
        save_config(dir.path(), &config).unwrap();

        let loaded = load_config(dir.path()).unwrap();
        assert_eq!(loaded.db_path, config.db_path);
        assert_eq!(loaded.max_cascade_depth, 4);
    }

    #[test]
    fn resolved_paths_join_relative_against_forge_dir() {
        let config = AppConfig::default();
        let forge_dir = Path::new("/tmp/project/.forge");
        assert_eq!(
            config.resolved_db_path(forge_dir),
            PathBuf::from("/tmp/project/.forge/forge.db")
        );
    }

    #[test]
    fn resolved_paths_keep_absolute_untouched() {
        let config = AppConfig {
            db_path: PathBuf::from("/var/data/forge.db"),
            ..AppConfig::default()
        };
        let forge_dir = Path::new("/tmp/project/.forge");
        assert_eq!(
            config.resolved_db_path(forge_dir),
            PathBuf::from("/var/data/forge.db")
        );
    }
}
