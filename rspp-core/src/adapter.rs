//! The adapter and observer surfaces (§3, §6).

use async_trait::async_trait;
use rspp_types::{Modality, RsppError};

use crate::contracts::{InvocationRequest, Outcome, StreamChunk};

/// The consumer capability set for a streaming invocation.
///
/// Any handler returning an error aborts the invocation: the read loop stops,
/// no further chunks are emitted, and the error is returned verbatim as the
/// function-level failure rather than folded into an [`Outcome`].
#[async_trait]
pub trait StreamObserver: Send {
    /// Called once, for the `start` chunk.
    async fn on_start(&mut self, chunk: &StreamChunk) -> Result<(), RsppError>;
    /// Called for each `delta`, `audio`, or `metadata` chunk.
    async fn on_chunk(&mut self, chunk: &StreamChunk) -> Result<(), RsppError>;
    /// Called once, for the `final` chunk.
    async fn on_complete(&mut self, chunk: &StreamChunk) -> Result<(), RsppError>;
    /// Called once, for the `error` chunk, instead of `on_complete`.
    async fn on_error(&mut self, chunk: &StreamChunk) -> Result<(), RsppError>;
}

/// A provider driver presenting the normalized invocation surface.
///
/// A provider id is unique within a modality and non-empty; the catalog
/// enforces this at construction, not the adapter itself.
#[async_trait]
pub trait Adapter: Send + Sync {
    /// Stable provider id, unique within [`Adapter::modality`].
    fn provider_id(&self) -> &str;
    /// The modality this adapter serves.
    fn modality(&self) -> Modality;
    /// Perform one provider attempt and return its normalized outcome.
    async fn invoke(&self, request: &InvocationRequest) -> Result<Outcome, RsppError>;
    /// Return this adapter as a streaming adapter, if it supports one.
    ///
    /// Mirrors the capability-accessor pattern used throughout this
    /// workspace: optional capabilities are discovered by downcast rather
    /// than by a boolean flag plus a panicking call.
    fn as_streaming(&self) -> Option<&dyn StreamingAdapter> {
        None
    }
}

/// The streaming half of the adapter surface.
#[async_trait]
pub trait StreamingAdapter: Adapter {
    /// Perform one streaming provider attempt, delivering chunks to
    /// `observer` as they arrive, and return the normalized terminal outcome.
    async fn invoke_stream(
        &self,
        request: &InvocationRequest,
        observer: &mut dyn StreamObserver,
    ) -> Result<Outcome, RsppError>;
}
