use std::fmt;

use invsync_core::{EnumerationKey, ScopeRef};
use serde::{Deserialize, Serialize};

/// Requested cycle action.
///
/// Unrecognized values deserialize to [`Action::Unknown`] so they can be
/// routed to the error stage instead of being rejected at the edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Action {
    Start,
    Refresh,
    Stop,
    Unknown(String),
}

impl Action {
    pub fn as_str(&self) -> &str {
        match self {
            Action::Start => "start",
            Action::Refresh => "refresh",
            Action::Stop => "stop",
            Action::Unknown(raw) => raw,
        }
    }
}

impl From<String> for Action {
    fn from(raw: String) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "start" => Action::Start,
            "refresh" => Action::Refresh,
            "stop" => Action::Stop,
            _ => Action::Unknown(raw),
        }
    }
}

impl From<&str> for Action {
    fn from(raw: &str) -> Self {
        Action::from(raw.to_string())
    }
}

impl From<Action> for String {
    fn from(action: Action) -> Self {
        action.as_str().to_string()
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happens to local records that disappeared remotely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeletionPolicy {
    /// Remove the record and its attached dependents.
    #[default]
    Delete,
    /// Keep the record, powered off and marked retired.
    Retire,
}

impl fmt::Display for DeletionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeletionPolicy::Delete => write!(f, "delete"),
            DeletionPolicy::Retire => write!(f, "retire"),
        }
    }
}

/// One call into the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumerationRequest {
    pub scope: ScopeRef,
    /// Adapter name, e.g. `virtual-machines`.
    pub adapter: String,
    pub action: Action,
    #[serde(default)]
    pub deletion_policy: DeletionPolicy,
}

impl EnumerationRequest {
    pub fn new(scope: ScopeRef, adapter: impl Into<String>, action: Action) -> Self {
        Self {
            scope,
            adapter: adapter.into(),
            action,
            deletion_policy: DeletionPolicy::default(),
        }
    }

    pub fn start(scope: ScopeRef, adapter: impl Into<String>) -> Self {
        Self::new(scope, adapter, Action::Start)
    }

    pub fn stop(scope: ScopeRef, adapter: impl Into<String>) -> Self {
        Self::new(scope, adapter, Action::Stop)
    }

    pub fn with_policy(mut self, policy: DeletionPolicy) -> Self {
        self.deletion_policy = policy;
        self
    }

    pub fn key(&self) -> EnumerationKey {
        EnumerationKey::new(self.scope.clone(), self.adapter.clone())
    }
}
