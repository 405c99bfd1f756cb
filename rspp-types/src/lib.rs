//! Shared data model for the realtime speech pipeline provider core.
//!
//! This crate holds the turn-invariant value types and the policy-resolver
//! algorithm that orders candidate providers from them (§3-4.4 of the
//! provider invocation contract). It carries no networking or async
//! dependency: everything here is plain data plus pure functions.
#![warn(missing_docs)]

mod adaptive_action;
mod capture;
mod error;
mod modality;
pub mod policy;
mod snapshot;

pub use adaptive_action::{normalize_adaptive_actions, AdaptiveAction};
pub use capture::{CaptureConfig, CaptureMode, DEFAULT_CAPTURE_BYTES, MIN_CAPTURE_BYTES};
pub use error::RsppError;
pub use modality::Modality;
pub use policy::{
    Budget, ResolveInput, ResolvedTurnPlan, RoutingReason, RuleSet, SignalSource,
    DEFAULT_MAX_ATTEMPTS_PER_PROVIDER, DEFAULT_POLICY_SNAPSHOT_REF,
};
pub use snapshot::{CapabilitySnapshot, FreezeInput, ProviderSignal, DEFAULT_SNAPSHOT_REF};
