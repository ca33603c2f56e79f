//! Maps the lower layers' closed error enums onto the envelope's `code`
//! taxonomy (spec.md §7.1).

use forge_core::validation::ValidationError;
use forge_engine::EngineError;
use forge_storage::RepositoryError;
use serde_json::json;

use crate::envelope::{Envelope, ErrorCode};

/// The handler-facing error type every tool operation returns. Logged once
/// at the tool-handler boundary, then encoded into an [`Envelope`] (spec.md
/// §7.1) -- it never aborts the server process.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("{0}")]
    BadRequest(String),

    /// A background task panicked or was cancelled before it could finish.
    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Validation(_) => ErrorCode::ValidationError,
            Self::BadRequest(_) => ErrorCode::ValidationError,
            Self::Internal(_) => ErrorCode::InternalError,
            Self::Repository(RepositoryError::NotFound { .. }) => ErrorCode::ResourceNotFound,
            Self::Repository(e @ RepositoryError::ConflictError(_)) => {
                if e.is_structural_validation() {
                    ErrorCode::ValidationError
                } else {
                    ErrorCode::ConflictError
                }
            }
            Self::Repository(RepositoryError::DatabaseError(_)) => ErrorCode::DatabaseError,
            Self::Engine(EngineError::Repository(e)) => {
                AppError::Repository(clone_repository_error(e)).code()
            }
            Self::Engine(EngineError::Resolve(_))
            | Self::Engine(EngineError::Validate { .. })
            | Self::Engine(EngineError::Gate { .. }) => ErrorCode::OperationFailed,
        }
    }

    pub fn into_envelope(self) -> Envelope {
        let code = self.code();
        match &self {
            Self::Engine(EngineError::Validate { blockers }) => {
                let details = json!({ "blockers": blockers });
                if code == ErrorCode::DatabaseError || code == ErrorCode::ResourceNotFound {
                    tracing::error!(error = %self, "database fault crossing tool boundary");
                } else {
                    tracing::warn!(error = %self, "domain failure crossing tool boundary");
                }
                Envelope::err(code, self.to_string(), Some(details))
            }
            Self::Engine(EngineError::Gate { missing }) => {
                let details = json!({ "missingNotes": missing });
                tracing::warn!(error = %self, "domain failure crossing tool boundary");
                Envelope::err(code, self.to_string(), Some(details))
            }
            _ => {
                if code == ErrorCode::DatabaseError || code == ErrorCode::InternalError {
                    tracing::error!(error = %self, "fault crossing tool boundary");
                } else {
                    tracing::warn!(error = %self, "domain failure crossing tool boundary");
                }
                Envelope::err(code, self.to_string(), None)
            }
        }
    }
}

/// `RepositoryError` has no `Clone`; this mirrors the variant we need to
/// inspect without consuming the original error out of `&self`.
fn clone_repository_error(err: &RepositoryError) -> RepositoryError {
    match err {
        RepositoryError::NotFound { entity, id } => RepositoryError::NotFound {
            entity: entity.clone(),
            id: id.clone(),
        },
        RepositoryError::ConflictError(msg) => RepositoryError::ConflictError(msg.clone()),
        RepositoryError::DatabaseError(msg) => RepositoryError::DatabaseError(msg.clone()),
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
