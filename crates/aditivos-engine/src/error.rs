use std::fmt::Display;

use aditivos_core::{InvalidTransition, RepositoryError, ValidationError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    InvalidStateTransition(#[from] InvalidTransition),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    /// Collaborator failure. Never retried here; the caller owns retry policy.
    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),
}

impl EngineError {
    pub(crate) fn not_found(entity: &'static str, id: impl Display) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}
