use invsync_core::{RemoteResource, ResourceKind, ScopeRef};
use tracing::{debug, warn};

use crate::collaborators::{Credentials, RemoteCursor, RemoteListingClient};
use crate::error::EngineError;

/// Walks a provider listing one page at a time.
pub struct RemotePager<'a> {
    client: &'a dyn RemoteListingClient,
    credentials: &'a Credentials,
    scope: &'a ScopeRef,
    kind: ResourceKind,
}

/// A fetched page, filtered to the pager's kind.
#[derive(Debug, Default)]
pub struct FetchedPage {
    pub resources: Vec<RemoteResource>,
    pub next_cursor: Option<RemoteCursor>,
}

impl FetchedPage {
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn has_more(&self) -> bool {
        self.next_cursor.is_some()
    }
}

impl<'a> RemotePager<'a> {
    pub fn new(
        client: &'a dyn RemoteListingClient,
        credentials: &'a Credentials,
        scope: &'a ScopeRef,
        kind: ResourceKind,
    ) -> Self {
        Self {
            client,
            credentials,
            scope,
            kind,
        }
    }

    /// Fetches the page at `cursor` (`None` for the first page).
    ///
    /// # Errors
    ///
    /// Any transport failure is returned as `EngineError::ListingTransport`;
    /// an incomplete listing must never reach the deletion sweep.
    pub async fn fetch_page(
        &self,
        cursor: Option<&RemoteCursor>,
    ) -> Result<FetchedPage, EngineError> {
        let page = self
            .client
            .list(self.credentials, self.scope, self.kind, cursor)
            .await
            .map_err(|e| EngineError::listing(self.kind, e))?;

        let total = page.items.len();
        let (resources, foreign): (Vec<_>, Vec<_>) = page
            .items
            .into_iter()
            .partition(|item| item.kind == self.kind);

        for item in &foreign {
            warn!(
                kind = %self.kind,
                found = %item.kind,
                id = %item.id,
                "Dropping listing entry of another kind"
            );
        }

        debug!(
            kind = %self.kind,
            cursor = ?cursor.map(RemoteCursor::as_str),
            items = total,
            has_more = page.next_cursor.is_some(),
            "Fetched remote page"
        );

        Ok(FetchedPage {
            resources,
            next_cursor: page.next_cursor,
        })
    }
}
