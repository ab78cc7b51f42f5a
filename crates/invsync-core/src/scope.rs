use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CoreError;

/// Reference to the owning account/host a set of resources belongs to.
///
/// `tenant` partitions the local inventory, `endpoint` names the provider
/// account (subscription, project, ...) being enumerated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScopeRef {
    pub tenant: String,
    pub endpoint: String,
}

impl ScopeRef {
    pub fn new(tenant: impl Into<String>, endpoint: impl Into<String>) -> Result<Self, CoreError> {
        let tenant = tenant.into();
        let endpoint = endpoint.into();
        if tenant.trim().is_empty() || endpoint.trim().is_empty() {
            return Err(CoreError::invalid_scope(format!("{tenant}/{endpoint}")));
        }
        Ok(Self { tenant, endpoint })
    }
}

impl fmt::Display for ScopeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.tenant, self.endpoint)
    }
}

/// Mutual-exclusion token for enumeration cycles: owning scope + adapter identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EnumerationKey {
    pub scope: ScopeRef,
    pub adapter: String,
}

impl EnumerationKey {
    pub fn new(scope: ScopeRef, adapter: impl Into<String>) -> Self {
        Self {
            scope,
            adapter: adapter.into(),
        }
    }
}

impl fmt::Display for EnumerationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.scope, self.adapter)
    }
}
