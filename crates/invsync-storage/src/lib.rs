//! # invsync-storage
//!
//! Local inventory store abstraction for invsync.
//!
//! This crate defines the traits and types every local store backend must
//! implement. It contains no backend - see `invsync-db-memory` for the
//! in-memory one.
//!
//! ## Overview
//!
//! The main trait is [`LocalStore`], which defines the contract for:
//! - reads by reference and bounded match queries by id
//! - the paginated staleness query used by the deletion sweep
//! - create / update / delete / retire
//! - batched execution with per-operation results
//!
//! ## Example
//!
//! ```ignore
//! use invsync_storage::{LocalStore, StaleQuery};
//!
//! let mut query = StaleQuery::new(scope, ResourceKind::Disk, cycle_start, 50);
//! loop {
//!     let page = store.query_stale(&query).await?;
//!     // ...
//!     match page.next_cursor {
//!         Some(cursor) => query = query.with_cursor(Some(cursor)),
//!         None => break,
//!     }
//! }
//! ```

mod error;
pub mod evented;
mod traits;
mod types;

pub use error::{ErrorCategory, StorageError};
pub use evented::EventedStore;
pub use traits::LocalStore;
pub use types::{
    BatchOperation, BatchOutcome, LocalCursor, OperationKind, OperationResult, StalePage,
    StaleQuery,
};

/// Type alias for a storage result.
pub type StorageResult<T> = Result<T, StorageError>;

/// Type alias for a shared store trait object.
pub type DynStore = std::sync::Arc<dyn LocalStore>;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use invsync_storage::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{ErrorCategory, StorageError};
    pub use crate::evented::EventedStore;
    pub use crate::traits::LocalStore;
    pub use crate::types::{
        BatchOperation, BatchOutcome, LocalCursor, OperationKind, OperationResult, StalePage,
        StaleQuery,
    };
    pub use crate::{DynStore, StorageResult};
}
