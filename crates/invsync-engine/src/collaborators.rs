//! Provider-side capabilities the engine consumes.
//!
//! Authentication, listing wire formats and lookup transports live behind
//! these traits; the engine never talks to a provider directly.

use std::fmt;

use async_trait::async_trait;
use invsync_core::{RemoteResource, ResourceId, ResourceKind, ScopeRef};
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

/// Credentials resolved once per cycle.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub principal: String,
    secret: String,
}

impl Credentials {
    pub fn new(principal: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            principal: principal.into(),
            secret: secret.into(),
        }
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("principal", &self.principal)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Opaque continuation token of a remote listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemoteCursor(String);

impl RemoteCursor {
    /// Empty tokens mean "no more pages".
    pub fn new(token: impl Into<String>) -> Option<Self> {
        let token = token.into();
        (!token.is_empty()).then_some(Self(token))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RemoteCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One page of a provider listing.
#[derive(Debug, Clone, Default)]
pub struct RemotePage {
    pub items: Vec<RemoteResource>,
    pub next_cursor: Option<RemoteCursor>,
}

impl RemotePage {
    pub fn new(items: Vec<RemoteResource>, next_cursor: Option<RemoteCursor>) -> Self {
        Self { items, next_cursor }
    }

    pub fn last(items: Vec<RemoteResource>) -> Self {
        Self::new(items, None)
    }
}

/// Second-round provider lookups used by enrichment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LookupKind {
    /// Live power/instance status of a machine.
    PowerState,
    /// Address of a public address resource.
    PublicAddress,
}

impl LookupKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LookupKind::PowerState => "power-state",
            LookupKind::PublicAddress => "public-address",
        }
    }
}

impl fmt::Display for LookupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn resolve(&self, scope: &ScopeRef) -> Result<Credentials, ProviderError>;
}

#[async_trait]
pub trait RemoteListingClient: Send + Sync {
    /// Fetches one page of `kind` resources. `cursor` is `None` for the first page.
    async fn list(
        &self,
        credentials: &Credentials,
        scope: &ScopeRef,
        kind: ResourceKind,
        cursor: Option<&RemoteCursor>,
    ) -> Result<RemotePage, ProviderError>;
}

#[async_trait]
pub trait EnrichmentClient: Send + Sync {
    /// Runs one lookup against `target` and returns its raw value.
    ///
    /// # Errors
    ///
    /// `ProviderError::NotFound` when the target does not exist remotely.
    async fn lookup(
        &self,
        credentials: &Credentials,
        scope: &ScopeRef,
        kind: LookupKind,
        target: &ResourceId,
    ) -> Result<String, ProviderError>;
}
