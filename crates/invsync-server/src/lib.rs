//! # invsync-server
//!
//! Service wiring for the inventory reconciliation engine: configuration
//! loading, tracing setup, the JSON fixture provider and the scheduler loop.

pub mod app;
pub mod config;
pub mod fixture;
pub mod observability;

pub use app::InventoryApp;
pub use config::AppConfig;
pub use fixture::{FixtureError, FixtureProvider};
