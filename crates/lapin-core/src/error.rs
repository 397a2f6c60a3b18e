//! Engine error taxonomy.
//!
//! Every engine operation returns an [`EngineResult`]. Errors are local,
//! synchronous values: a failed operation commits nothing, so the request
//! layer can map them straight to responses.

use lapin_catalog::CatalogError;
use thiserror::Error;

use crate::store::StoreError;

/// Result alias used throughout the engine.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors returned by engine operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// Unknown player, attack, defense, title or stat name.
    #[error("not found: {0}")]
    NotFound(String),

    /// A field the operation needs is missing or malformed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The player may not perform this action.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Concurrent modification detected; the operation may be retried.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The persistence collaborator failed.
    #[error("storage failure: {0}")]
    Storage(String),
}

impl EngineError {
    /// Returns true if retrying the same operation may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }

    pub(crate) fn player_not_found(username: &str) -> Self {
        Self::NotFound(format!("player '{username}'"))
    }
}

impl From<CatalogError> for EngineError {
    fn from(err: CatalogError) -> Self {
        if err.is_lookup_miss() {
            Self::NotFound(err.to_string())
        } else {
            Self::Storage(err.to_string())
        }
    }
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict { .. } | StoreError::Exists(_) => Self::Conflict(err.to_string()),
            StoreError::Missing(ref username) => Self::player_not_found(username),
            StoreError::Backend(_) => Self::Storage(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lapin_catalog::AttackId;

    #[test]
    fn only_conflicts_are_retryable() {
        assert!(EngineError::Conflict("x".into()).is_retryable());
        assert!(!EngineError::Forbidden("x".into()).is_retryable());
        assert!(!EngineError::Storage("x".into()).is_retryable());
    }

    #[test]
    fn catalog_misses_map_to_not_found() {
        let err: EngineError = CatalogError::UnknownAttack(AttackId::new(99)).into();
        assert_eq!(err, EngineError::NotFound("unknown attack 99".into()));
    }

    #[test]
    fn version_conflicts_map_to_conflict() {
        let err: EngineError = StoreError::Conflict {
            username: "bob".into(),
            expected: 3,
            found: 4,
        }
        .into();
        assert!(err.is_retryable());
    }
}
