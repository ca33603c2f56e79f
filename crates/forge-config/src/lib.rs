//! Configuration management for the task-orchestration service.
//!
//! This crate handles loading `.forge/config.yaml`, discovering the
//! `.forge/` project directory, and loading the YAML-backed note-schema
//! source consumed by the workflow engine (spec.md §6).

pub mod config;
pub mod forge_dir;
pub mod note_schema;

pub use config::{AppConfig, ConfigError};
pub use note_schema::YamlNoteSchemaSource;
