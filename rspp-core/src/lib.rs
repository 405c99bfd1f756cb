//! rspp-core
//!
//! Provider invocation contracts, policy-resolver support, and streaming
//! primitives shared across the realtime speech pipeline provider core.
//!
//! - `contracts`: per-attempt request, outcome, and stream-chunk shapes.
//! - `adapter`: the `Adapter`/`StreamingAdapter`/`StreamObserver` traits.
//! - `catalog`: per-modality adapter registry and candidate resolution.
//! - `secret`: secret-reference resolution and redaction.
//! - `snapshot`: capability-snapshot fingerprinting.
//! - `capture`: payload capture rendering for logs and replay.
//! - `sse`: server-sent-event line framing for streaming providers.
//! - `stream`: the `StreamHandle` lifecycle used by long-lived stream tasks.
#![warn(missing_docs)]

/// Provider and observer traits presented to orchestration.
pub mod adapter;
/// Jittered backoff and poll-interval helpers.
pub mod backoff;
/// Per-modality adapter registry and candidate resolution.
pub mod catalog;
/// Payload capture rendering.
pub mod capture;
/// Per-attempt request, outcome, and stream-chunk contracts.
pub mod contracts;
/// The closed outcome/error reason-string vocabulary.
pub mod reason;
/// Secret-reference resolution and redaction.
pub mod secret;
/// Capability-snapshot fingerprinting.
pub mod snapshot;
/// Server-sent-event line framing.
pub mod sse;
/// Stream-task lifecycle handle.
pub mod stream;

pub use adapter::{Adapter, StreamObserver, StreamingAdapter};
pub use backoff::{clamp_poll_interval_ms, jitter_wait};
pub use capture::{capture as capture_payload, CaptureResult};
pub use catalog::{AdapterCatalog, DEFAULT_MAX_CANDIDATES};
pub use contracts::{
    InvocationRequest, Outcome, OutcomeClass, RequestIdentity, StreamChunk, StreamChunkKind,
};
pub use snapshot::fingerprint as fingerprint_snapshot;
pub use sse::{parse_sse, SseRecord, SseSink, MIN_MAX_LINE_BYTES};
pub use stream::{drop_impl, Abortable, Stoppable, StreamHandle};
