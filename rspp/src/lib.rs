//! rspp
//!
//! Facade over the provider invocation and turn-plan arbitration core: a
//! builder that registers per-modality [`Adapter`]s into a catalog, wires a
//! [`RuleSet`], and resolves [`ResolvedTurnPlan`]s for a conversational turn.
//!
//! Overview
//! - Registers adapters per modality (speech-to-text, language model,
//!   text-to-speech) into an immutable [`AdapterCatalog`].
//! - Resolves a turn's ordered candidate list from a [`RuleSet`] plus an
//!   optional [`CapabilitySnapshot`], via [`Pipeline::resolve_turn_plan`].
//! - Runs one adapter attempt at a time under a defense-in-depth deadline
//!   (`Pipeline::invoke`, `Pipeline::invoke_stream`), folding a deadline
//!   expiry into a `Timeout` outcome rather than a function-level error.
//!
//! Retry and provider-switch policy are explicitly out of scope here: this
//! crate resolves one plan and runs one adapter attempt at a time. The
//! calling orchestration decides when to re-resolve, retry, or fail a turn,
//! gated by the resolved plan's allowed actions, max attempts, and budget.
#![warn(missing_docs)]

mod core;

pub use crate::core::{invoke_with_deadline, Pipeline, PipelineBuilder, ResolveContext};

pub use rspp_core::{
    capture_payload, clamp_poll_interval_ms, fingerprint_snapshot, jitter_wait, reason,
    AdapterCatalog, CaptureResult, StreamHandle, DEFAULT_MAX_CANDIDATES,
};
pub use rspp_core::{Adapter, StreamObserver, StreamingAdapter};
pub use rspp_core::{InvocationRequest, Outcome, OutcomeClass, RequestIdentity, StreamChunk, StreamChunkKind};

pub use rspp_types::{
    normalize_adaptive_actions, AdaptiveAction, Budget, CaptureConfig, CaptureMode, CapabilitySnapshot,
    FreezeInput, Modality, ProviderSignal, ResolveInput, ResolvedTurnPlan, RoutingReason, RsppError,
    RuleSet, SignalSource, DEFAULT_CAPTURE_BYTES, DEFAULT_MAX_ATTEMPTS_PER_PROVIDER,
    DEFAULT_POLICY_SNAPSHOT_REF, DEFAULT_SNAPSHOT_REF, MIN_CAPTURE_BYTES,
};
