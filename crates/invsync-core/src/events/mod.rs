//! Inventory event bus.
//!
//! Store wrappers publish [`InventoryEvent`]s after successful mutations and
//! the cycle controller publishes a [`CycleEvent`] whenever a cycle reaches a
//! terminal stage. Consumers subscribe through [`EventBroadcaster::subscribe`].
//!
//! ```ignore
//! use invsync_core::events::EventBroadcaster;
//!
//! let broadcaster = EventBroadcaster::new_shared();
//! let mut rx = broadcaster.subscribe();
//! tokio::spawn(async move {
//!     while let Ok(event) = rx.recv().await {
//!         tracing::debug!(?event, "inventory event");
//!     }
//! });
//! ```

pub mod broadcaster;
pub mod types;

pub use broadcaster::EventBroadcaster;
pub use types::{CycleEvent, CycleOutcomeKind, InventoryEvent, InventoryEventType, SystemEvent};
