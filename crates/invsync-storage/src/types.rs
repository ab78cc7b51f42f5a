//! Query and batch types used by the local store traits.

use serde::{Deserialize, Serialize};
use std::fmt;
use time::OffsetDateTime;

use invsync_core::{ResourceKind, ResourceRef, ResourceSnapshot, ScopeRef};

use crate::error::StorageError;

/// Opaque continuation token for paginated local queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalCursor(String);

impl LocalCursor {
    /// Wraps a backend-specific token. Empty tokens mean "no more pages".
    #[must_use]
    pub fn new(token: impl Into<String>) -> Option<Self> {
        let token = token.into();
        (!token.is_empty()).then_some(Self(token))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LocalCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Parameters of one page of the staleness sweep.
///
/// Matches active (non-retired) records of `kind` within `scope` whose
/// `last_updated_at` is strictly before `before`.
#[derive(Debug, Clone)]
pub struct StaleQuery {
    pub scope: ScopeRef,
    pub kind: ResourceKind,
    pub before: OffsetDateTime,
    pub cursor: Option<LocalCursor>,
    pub page_size: usize,
}

impl StaleQuery {
    #[must_use]
    pub fn new(scope: ScopeRef, kind: ResourceKind, before: OffsetDateTime, page_size: usize) -> Self {
        Self {
            scope,
            kind,
            before,
            cursor: None,
            page_size,
        }
    }

    #[must_use]
    pub fn with_cursor(mut self, cursor: Option<LocalCursor>) -> Self {
        self.cursor = cursor;
        self
    }
}

/// One page of staleness sweep candidates.
#[derive(Debug, Clone, Default)]
pub struct StalePage {
    pub entries: Vec<ResourceSnapshot>,
    pub next_cursor: Option<LocalCursor>,
}

impl StalePage {
    #[must_use]
    pub fn has_more(&self) -> bool {
        self.next_cursor.is_some()
    }
}

/// The kind of mutation a batch member performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Create,
    Update,
    Delete,
    Retire,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => write!(f, "create"),
            Self::Update => write!(f, "update"),
            Self::Delete => write!(f, "delete"),
            Self::Retire => write!(f, "retire"),
        }
    }
}

/// A single member of a batched store call.
#[derive(Debug, Clone)]
pub enum BatchOperation {
    Create(ResourceSnapshot),
    Update(ResourceSnapshot),
    Delete(ResourceRef),
    /// Retire the target, stamping it with the given cycle timestamp.
    Retire(ResourceRef, OffsetDateTime),
}

impl BatchOperation {
    #[must_use]
    pub fn kind(&self) -> OperationKind {
        match self {
            Self::Create(_) => OperationKind::Create,
            Self::Update(_) => OperationKind::Update,
            Self::Delete(_) => OperationKind::Delete,
            Self::Retire(..) => OperationKind::Retire,
        }
    }

    #[must_use]
    pub fn target(&self) -> ResourceRef {
        match self {
            Self::Create(snapshot) | Self::Update(snapshot) => snapshot.reference(),
            Self::Delete(target) | Self::Retire(target, _) => target.clone(),
        }
    }
}

/// Result of one batch member.
#[derive(Debug)]
pub struct OperationResult {
    pub target: ResourceRef,
    pub kind: OperationKind,
    pub result: Result<(), StorageError>,
}

impl OperationResult {
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Per-operation results of a batch; failures never abort the other members.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub results: Vec<OperationResult>,
}

impl BatchOutcome {
    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Number of members that succeeded with the given operation kind.
    #[must_use]
    pub fn succeeded(&self, kind: OperationKind) -> usize {
        self.results
            .iter()
            .filter(|r| r.kind == kind && r.is_ok())
            .count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &OperationResult> {
        self.results.iter().filter(|r| !r.is_ok())
    }

    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.failures().count()
    }
}
