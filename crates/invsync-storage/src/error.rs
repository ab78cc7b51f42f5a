//! Storage error types for the local inventory store abstraction.

use std::fmt;

use invsync_core::{ResourceKind, ResourceRef};

/// Errors that can occur during local store operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The requested record was not found.
    #[error("Record not found: {kind}/{id}")]
    NotFound {
        /// Kind of the missing record.
        kind: ResourceKind,
        /// Normalized id of the missing record.
        id: String,
    },

    /// Attempted to create a record that already exists.
    #[error("Record already exists: {kind}/{id}")]
    AlreadyExists {
        /// Kind of the existing record.
        kind: ResourceKind,
        /// Normalized id of the existing record.
        id: String,
    },

    /// A query asked for more ids than the store accepts in one filter.
    #[error("Query too large: {requested} ids requested, limit is {limit}")]
    QueryTooLarge {
        /// Number of ids in the rejected query.
        requested: usize,
        /// Maximum accepted by the store.
        limit: usize,
    },

    /// The continuation cursor could not be decoded.
    #[error("Invalid cursor: {message}")]
    InvalidCursor {
        /// Description of the decoding failure.
        message: String,
    },

    /// Failed to reach the storage backend.
    #[error("Connection error: {message}")]
    ConnectionError {
        /// Description of the connection error.
        message: String,
    },

    /// An internal storage error occurred.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl StorageError {
    /// Creates a new `NotFound` error.
    #[must_use]
    pub fn not_found(target: &ResourceRef) -> Self {
        Self::NotFound {
            kind: target.kind,
            id: target.id.to_string(),
        }
    }

    /// Creates a new `AlreadyExists` error.
    #[must_use]
    pub fn already_exists(target: &ResourceRef) -> Self {
        Self::AlreadyExists {
            kind: target.kind,
            id: target.id.to_string(),
        }
    }

    /// Creates a new `QueryTooLarge` error.
    #[must_use]
    pub fn query_too_large(requested: usize, limit: usize) -> Self {
        Self::QueryTooLarge { requested, limit }
    }

    /// Creates a new `InvalidCursor` error.
    #[must_use]
    pub fn invalid_cursor(message: impl Into<String>) -> Self {
        Self::InvalidCursor {
            message: message.into(),
        }
    }

    /// Creates a new `ConnectionError` error.
    #[must_use]
    pub fn connection_error(message: impl Into<String>) -> Self {
        Self::ConnectionError {
            message: message.into(),
        }
    }

    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` if this is a not found error.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns `true` if this is an already exists error.
    #[must_use]
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }

    /// Returns the error category for logging/monitoring purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::AlreadyExists { .. } => ErrorCategory::Conflict,
            Self::QueryTooLarge { .. } | Self::InvalidCursor { .. } => ErrorCategory::Validation,
            Self::ConnectionError { .. } => ErrorCategory::Infrastructure,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }
}

/// Categories of storage errors for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Record not found.
    NotFound,
    /// Record already exists.
    Conflict,
    /// Rejected input.
    Validation,
    /// Infrastructure/connection error.
    Infrastructure,
    /// Internal error.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not_found"),
            Self::Conflict => write!(f, "conflict"),
            Self::Validation => write!(f, "validation"),
            Self::Infrastructure => write!(f, "infrastructure"),
            Self::Internal => write!(f, "internal"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use invsync_core::ResourceId;

    fn disk_ref() -> ResourceRef {
        ResourceRef::new(ResourceKind::Disk, ResourceId::new("D-1").unwrap())
    }

    #[test]
    fn test_error_display() {
        let err = StorageError::not_found(&disk_ref());
        assert_eq!(err.to_string(), "Record not found: disk/d-1");

        let err = StorageError::query_too_large(120, 50);
        assert_eq!(
            err.to_string(),
            "Query too large: 120 ids requested, limit is 50"
        );
    }

    #[test]
    fn test_error_predicates() {
        let err = StorageError::not_found(&disk_ref());
        assert!(err.is_not_found());
        assert!(!err.is_already_exists());

        let err = StorageError::already_exists(&disk_ref());
        assert!(err.is_already_exists());
    }

    #[test]
    fn test_error_category() {
        assert_eq!(
            StorageError::not_found(&disk_ref()).category(),
            ErrorCategory::NotFound
        );
        assert_eq!(
            StorageError::query_too_large(2, 1).category(),
            ErrorCategory::Validation
        );
        assert_eq!(
            StorageError::connection_error("refused").category(),
            ErrorCategory::Infrastructure
        );
    }
}
