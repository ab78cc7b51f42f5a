//! # invsync-engine
//!
//! Reconciles a local inventory with a cloud provider's listing.
//!
//! One [`EnumerationRequest`] names a scope, an adapter and an action. The
//! [`EnumerationEngine`] authenticates, registers the key so at most one
//! cycle per key runs, pages through the provider listing, creates or
//! updates matching local records, runs enrichment lookups and finally
//! sweeps away local records the provider no longer reports.
//!
//! ## Example
//!
//! ```ignore
//! use invsync_engine::{EngineCollaborators, EngineConfig, EnumerationEngine, EnumerationRequest};
//!
//! let engine = EnumerationEngine::new(EngineConfig::default(), collaborators);
//! let report = engine
//!     .handle(EnumerationRequest::start(scope, "virtual-machines"))
//!     .await?;
//! tracing::info!(created = report.stats.created, "cycle done");
//! ```

pub mod adapter;
pub mod adapters;
pub mod clock;
pub mod collaborators;
pub mod config;
pub mod controller;
pub mod cycle;
pub mod differ;
pub mod enrichment;
pub mod error;
pub mod pager;
pub mod reconciler;
pub mod registry;
pub mod report;
pub mod request;
pub mod scheduler;
pub mod stage;

pub use adapter::{EnrichmentStep, Mapping, MappingContext, ResourceAdapter};
pub use adapters::AdapterRegistry;
pub use clock::{Clock, ManualClock, SystemClock};
pub use collaborators::{
    CredentialProvider, Credentials, EnrichmentClient, LookupKind, RemoteCursor,
    RemoteListingClient, RemotePage,
};
pub use config::EngineConfig;
pub use controller::{EngineCollaborators, EnumerationEngine};
pub use error::{EngineError, ProviderError};
pub use registry::{CycleToken, InFlightRegistry};
pub use report::{CycleOutcome, CycleReport, CycleStats};
pub use request::{Action, DeletionPolicy, EnumerationRequest};
pub use scheduler::{EnumerationScheduler, ScheduleTarget};
pub use stage::{Stage, StageEvent, transition};
