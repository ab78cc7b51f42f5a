use thiserror::Error;

/// Validation errors raised while building core inventory types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("Invalid resource kind: {0}")]
    InvalidResourceKind(String),

    #[error("Invalid resource id: {0}")]
    InvalidId(String),

    #[error("Invalid scope reference: {0}")]
    InvalidScope(String),
}

impl CoreError {
    pub fn invalid_resource_kind(kind: impl Into<String>) -> Self {
        Self::InvalidResourceKind(kind.into())
    }

    pub fn invalid_id(id: impl Into<String>) -> Self {
        Self::InvalidId(id.into())
    }

    pub fn invalid_scope(scope: impl Into<String>) -> Self {
        Self::InvalidScope(scope.into())
    }
}
