use invsync_core::{ResourceKind, ResourceRef, ScopeRef};
use invsync_storage::{ErrorCategory, OperationKind, StorageError};
use thiserror::Error;

/// Failure reported by a provider-side collaborator (credentials, listing, lookups).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid provider response: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse(message.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Errors raised while running an enumeration cycle.
///
/// Fatal variants end the cycle in the error stage. `BatchOperation` and
/// `EnrichmentLookup` are recovered inside the cycle and only logged.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Authentication failed for {scope}: {source}")]
    Auth {
        scope: ScopeRef,
        #[source]
        source: ProviderError,
    },

    #[error("Listing {kind} failed: {source}")]
    ListingTransport {
        kind: ResourceKind,
        #[source]
        source: ProviderError,
    },

    #[error("Local store query failed during {phase}: {source}")]
    StoreQuery {
        phase: &'static str,
        #[source]
        source: StorageError,
    },

    #[error("{operation} of {target} failed: {source}")]
    BatchOperation {
        operation: OperationKind,
        target: ResourceRef,
        #[source]
        source: StorageError,
    },

    #[error("Enrichment lookup {lookup} for {target} failed: {reason}")]
    EnrichmentLookup {
        lookup: String,
        target: ResourceRef,
        reason: String,
    },

    #[error("Unknown action: {0}")]
    UnknownAction(String),

    #[error("Unknown stage transition: {0}")]
    UnknownStage(String),

    #[error("Unknown adapter: {0}")]
    UnknownAdapter(String),
}

impl EngineError {
    pub fn auth(scope: &ScopeRef, source: ProviderError) -> Self {
        Self::Auth {
            scope: scope.clone(),
            source,
        }
    }

    pub fn listing(kind: ResourceKind, source: ProviderError) -> Self {
        Self::ListingTransport { kind, source }
    }

    pub fn store_query(phase: &'static str, source: StorageError) -> Self {
        Self::StoreQuery { phase, source }
    }

    pub fn batch_operation(operation: OperationKind, target: ResourceRef, source: StorageError) -> Self {
        Self::BatchOperation {
            operation,
            target,
            source,
        }
    }

    pub fn enrichment(
        lookup: impl Into<String>,
        target: ResourceRef,
        reason: impl Into<String>,
    ) -> Self {
        Self::EnrichmentLookup {
            lookup: lookup.into(),
            target,
            reason: reason.into(),
        }
    }

    pub fn unknown_stage(message: impl Into<String>) -> Self {
        Self::UnknownStage(message.into())
    }

    /// Category of the underlying local store failure, if the store failed.
    pub fn storage_category(&self) -> Option<ErrorCategory> {
        match self {
            Self::StoreQuery { source, .. } | Self::BatchOperation { source, .. } => {
                Some(source.category())
            }
            _ => None,
        }
    }

    /// Whether this error ends the cycle.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Self::BatchOperation { .. } | Self::EnrichmentLookup { .. }
        )
    }
}
