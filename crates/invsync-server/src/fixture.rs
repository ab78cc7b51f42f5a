//! JSON-file-backed provider for local runs.
//!
//! One file describes, per scope, the credentials, the listing pages per
//! resource kind, the enrichment answers and the records the local store
//! starts with:
//!
//! ```json
//! {
//!   "scopes": [{
//!     "scope": {"tenant": "acme", "endpoint": "sub-1"},
//!     "credentials": {"principal": "reader", "secret": "s3cret"},
//!     "listings": [{"kind": "disk", "pages": [[{"id": "d-1", "kind": "disk", "name": "d-1"}]]}],
//!     "lookups": [{"lookup": "power-state", "target": "vm-1", "value": "PowerState/running"}],
//!     "seed": []
//!   }]
//! }
//! ```

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use invsync_core::{RemoteResource, ResourceId, ResourceKind, ResourceSnapshot, ScopeRef};
use invsync_engine::{
    CredentialProvider, Credentials, EnrichmentClient, LookupKind, ProviderError, RemoteCursor,
    RemoteListingClient, RemotePage,
};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("Failed to read fixture {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid fixture: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Scope {0} is declared more than once")]
    DuplicateScope(ScopeRef),
}

#[derive(Debug, Deserialize)]
struct FixtureFile {
    #[serde(default)]
    scopes: Vec<FixtureScope>,
}

#[derive(Debug, Deserialize)]
struct FixtureScope {
    scope: ScopeRef,
    #[serde(default)]
    credentials: Option<FixtureCredentials>,
    #[serde(default)]
    listings: Vec<FixtureListing>,
    #[serde(default)]
    lookups: Vec<FixtureLookup>,
    #[serde(default)]
    seed: Vec<ResourceSnapshot>,
}

#[derive(Debug, Deserialize)]
struct FixtureCredentials {
    principal: String,
    secret: String,
}

#[derive(Debug, Deserialize)]
struct FixtureListing {
    kind: ResourceKind,
    #[serde(default)]
    pages: Vec<Vec<RemoteResource>>,
}

#[derive(Debug, Deserialize)]
struct FixtureLookup {
    lookup: LookupKind,
    target: ResourceId,
    value: String,
}

#[derive(Debug, Default)]
struct ScopeData {
    credentials: Option<Credentials>,
    pages: HashMap<ResourceKind, Vec<Vec<RemoteResource>>>,
    lookups: HashMap<(LookupKind, ResourceId), String>,
}

/// Credential, listing and enrichment collaborators answering from a fixture.
///
/// Listing cursors are page indexes. A scope without credentials fails
/// authentication; a lookup without an answer is `NotFound`.
#[derive(Debug, Default)]
pub struct FixtureProvider {
    scopes: HashMap<ScopeRef, ScopeData>,
    seed: Vec<ResourceSnapshot>,
}

impl FixtureProvider {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, FixtureError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| FixtureError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, FixtureError> {
        let file: FixtureFile = serde_json::from_str(raw)?;
        let mut provider = Self::default();

        for entry in file.scopes {
            if provider.scopes.contains_key(&entry.scope) {
                return Err(FixtureError::DuplicateScope(entry.scope));
            }
            let data = ScopeData {
                credentials: entry
                    .credentials
                    .map(|c| Credentials::new(c.principal, c.secret)),
                pages: entry
                    .listings
                    .into_iter()
                    .map(|listing| (listing.kind, listing.pages))
                    .collect(),
                lookups: entry
                    .lookups
                    .into_iter()
                    .map(|lookup| ((lookup.lookup, lookup.target), lookup.value))
                    .collect(),
            };
            provider.seed.extend(entry.seed);
            provider.scopes.insert(entry.scope, data);
        }

        Ok(provider)
    }

    /// Records the local store is populated with before the first cycle.
    pub fn seed_snapshots(&self) -> &[ResourceSnapshot] {
        &self.seed
    }

    pub fn scopes(&self) -> impl Iterator<Item = &ScopeRef> {
        self.scopes.keys()
    }

    fn scope(&self, scope: &ScopeRef) -> Result<&ScopeData, ProviderError> {
        self.scopes
            .get(scope)
            .ok_or_else(|| ProviderError::not_found(format!("scope {scope}")))
    }

    fn check_credentials(&self, data: &ScopeData, presented: &Credentials) -> Result<(), ProviderError> {
        match &data.credentials {
            Some(expected) if expected == presented => Ok(()),
            _ => Err(ProviderError::unauthorized("credentials rejected")),
        }
    }
}

#[async_trait]
impl CredentialProvider for FixtureProvider {
    async fn resolve(&self, scope: &ScopeRef) -> Result<Credentials, ProviderError> {
        self.scope(scope)
            .map_err(|_| ProviderError::unauthorized(format!("unknown scope {scope}")))?
            .credentials
            .clone()
            .ok_or_else(|| ProviderError::unauthorized(format!("no credentials for {scope}")))
    }
}

#[async_trait]
impl RemoteListingClient for FixtureProvider {
    async fn list(
        &self,
        credentials: &Credentials,
        scope: &ScopeRef,
        kind: ResourceKind,
        cursor: Option<&RemoteCursor>,
    ) -> Result<RemotePage, ProviderError> {
        let data = self.scope(scope)?;
        self.check_credentials(data, credentials)?;

        let index = match cursor {
            Some(cursor) => cursor
                .as_str()
                .parse::<usize>()
                .map_err(|_| ProviderError::invalid_response(format!("bad cursor {cursor}")))?,
            None => 0,
        };
        let Some(pages) = data.pages.get(&kind) else {
            return Ok(RemotePage::default());
        };
        let items = pages.get(index).cloned().unwrap_or_default();
        let next_cursor = if index + 1 < pages.len() {
            RemoteCursor::new((index + 1).to_string())
        } else {
            None
        };
        Ok(RemotePage::new(items, next_cursor))
    }
}

#[async_trait]
impl EnrichmentClient for FixtureProvider {
    async fn lookup(
        &self,
        credentials: &Credentials,
        scope: &ScopeRef,
        kind: LookupKind,
        target: &ResourceId,
    ) -> Result<String, ProviderError> {
        let data = self.scope(scope)?;
        self.check_credentials(data, credentials)?;
        data.lookups
            .get(&(kind, target.clone()))
            .cloned()
            .ok_or_else(|| ProviderError::not_found(format!("{kind} of {target}")))
    }
}
