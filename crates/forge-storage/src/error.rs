//! Repository error types (spec.md §4.1, §7).

/// The closed error taxonomy the Repository facade returns.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// The requested entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// An optimistic-locking update lost the race, a dependency batch
    /// would close a cycle, or a unique constraint was violated.
    #[error("conflict: {0}")]
    ConflictError(String),

    /// A persistence-layer fault (connection, transaction, migration, raw
    /// SQL error).
    #[error("database error: {0}")]
    DatabaseError(String),
}

/// Convenience alias used throughout the storage crate.
pub type Result<T> = std::result::Result<T, RepositoryError>;

impl RepositoryError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::ConflictError(message.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::ConflictError(_))
    }

    /// `true` for a structural domain-rule violation (self-reference,
    /// `RELATES_TO`/`unblockAt`) caught at the repository boundary rather
    /// than a true cycle/duplicate conflict (spec.md §4.5 separates
    /// "domain rule violations" from "Cycle / duplicate on batch
    /// dependency create"). `RepositoryError` stays the closed
    /// three-variant sum spec.md §4.1 defines; callers that need to tell
    /// the two apart (the MCP error-code mapping) use this marker instead
    /// of a fourth variant.
    pub fn is_structural_validation(&self) -> bool {
        matches!(self, Self::ConflictError(msg) if msg.starts_with(STRUCTURAL_VALIDATION_PREFIX))
    }

    pub fn structural_validation(message: impl std::fmt::Display) -> Self {
        Self::ConflictError(format!("{STRUCTURAL_VALIDATION_PREFIX}{message}"))
    }
}

/// Message prefix marking a [`RepositoryError::ConflictError`] as a
/// structural domain-rule violation rather than a cycle/duplicate
/// conflict. See [`RepositoryError::is_structural_validation`].
pub const STRUCTURAL_VALIDATION_PREFIX: &str = "validation: ";

impl From<rusqlite::Error> for RepositoryError {
    fn from(err: rusqlite::Error) -> Self {
        Self::DatabaseError(err.to_string())
    }
}

impl From<serde_json::Error> for RepositoryError {
    fn from(err: serde_json::Error) -> Self {
        Self::DatabaseError(format!("serialization error: {err}"))
    }
}
