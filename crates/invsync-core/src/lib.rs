pub mod error;
pub mod events;
pub mod id;
pub mod kind;
pub mod remote;
pub mod scope;
pub mod snapshot;

pub use error::CoreError;
pub use id::{ResourceId, generate_token, normalize_id};
pub use kind::ResourceKind;
pub use remote::RemoteResource;
pub use scope::{EnumerationKey, ScopeRef};
pub use snapshot::{LifecycleState, PowerState, ResourceRef, ResourceSnapshot};
