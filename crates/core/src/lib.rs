//! Session routing and provider dispatch for abr.
//!
//! Validated [`abr_protocol::Command`]s enter through [`Router::submit`].
//! The router queues each one on its session's actor; the actor resolves
//! element references against the session's [`ReferenceTable`], checks the
//! provider's [`CapabilitySet`], and calls into the [`Provider`].

pub mod dispatch;
pub mod error;
pub mod provider;
pub mod refs;
pub mod router;
pub mod session;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use error::CommandError;
pub use provider::{
	Capability, CapabilitySet, DeviceSelector, FailureKind, LaunchSpec, Provider, ProviderCall, ProviderError, ProviderFactory, ProviderKind,
	SnapshotRequest, Target,
};
pub use refs::{ElementHandle, Epoch, IssuedRef, RefError, ReferenceTable};
pub use router::Router;
pub use session::SessionInfo;
