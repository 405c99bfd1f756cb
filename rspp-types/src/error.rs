use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Programmer/contract errors surfaced as function-level failures.
///
/// These are distinct from [`crate::Outcome`]'s `class`/`reason`, which carry
/// remote-side (transport, status, protocol) failures as data so that
/// surrounding orchestration can run its retry policy uniformly. A value of
/// this type means the caller or an adapter broke an invariant, not that a
/// provider misbehaved.
#[derive(Debug, Error, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RsppError {
    /// An `InvocationRequest` failed validation.
    #[error("invalid invocation request: {0}")]
    InvalidRequest(String),

    /// An `Outcome` failed validation.
    #[error("invalid outcome: {0}")]
    InvalidOutcome(String),

    /// A `StreamChunk` failed validation.
    #[error("invalid stream chunk: {0}")]
    InvalidStreamChunk(String),

    /// A `CapabilitySnapshot` (or its freeze input) failed validation.
    #[error("invalid capability snapshot: {0}")]
    InvalidSnapshot(String),

    /// Policy-resolver input failed validation.
    #[error("invalid resolver input: {0}")]
    InvalidResolverInput(String),

    /// A generic malformed argument: adaptive-action parsing, secret
    /// references, and similar free-standing validations.
    #[error("invalid argument: {0}")]
    InvalidArg(String),

    /// A catalog was constructed, or queried, with no adapters at all.
    #[error("adapter catalog is empty")]
    EmptyCatalog,

    /// Two adapters registered the same provider id within one modality.
    #[error("duplicate provider {provider_id:?} for modality {modality}")]
    DuplicateProvider {
        /// Modality the duplicate was registered under.
        modality: String,
        /// The provider id that collided.
        provider_id: String,
    },

    /// A candidate or preferred provider id is not registered for the modality.
    #[error("unknown provider {provider_id:?} for modality {modality}")]
    UnknownProvider {
        /// Modality that was queried.
        modality: String,
        /// The provider id that was not found.
        provider_id: String,
    },

    /// The policy resolver produced (or would produce) an empty candidate list.
    #[error("policy resolver produced no candidates")]
    NoCandidates,

    /// The stream observer rejected a chunk; the invocation aborts and this
    /// error is returned verbatim as the function-level failure.
    #[error("stream observer failed: {0}")]
    Observer(String),
}

impl RsppError {
    /// Build an [`RsppError::Observer`] from any displayable error, matching
    /// the "abort and return verbatim" propagation policy for observer
    /// callbacks.
    pub fn observer(err: impl std::fmt::Display) -> Self {
        Self::Observer(err.to_string())
    }
}
