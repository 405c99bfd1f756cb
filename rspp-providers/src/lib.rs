//! rspp-providers
//!
//! The generic request/response adapter scaffold (§4.6) and the concrete
//! per-provider stream translators (§4.8) built on top of it, for the three
//! modalities this workspace fans out per conversational turn.
//!
//! - `http_adapter`: the reusable unary request/response adapter, plus the
//!   shared HTTP status-to-outcome mapping table.
//! - `sse_bridge`: adapts a streaming HTTP response body into the
//!   `AsyncRead` expected by `rspp_core::sse::parse_sse`.
//! - `delta`: text-delta extraction shared by the SSE-based LLM translators.
//! - `collect`: a buffering `StreamObserver` used to answer `Adapter::invoke`
//!   for translators whose native shape is streaming.
//! - `outcomes`: small outcome and error-chunk constructors shared across
//!   translators.
//! - `stt`, `llm`, `tts`: the concrete per-modality translators.
#![warn(missing_docs)]

/// Chunk-buffering `StreamObserver` used to answer `Adapter::invoke`.
pub mod collect;
/// Text-delta extraction shared by the SSE-based LLM translators.
pub mod delta;
/// The generic request/response adapter (§4.6).
pub mod http_adapter;
/// Concrete large-language-model stream translators.
pub mod llm;
/// Outcome and error-chunk constructors shared by the translators.
pub mod outcomes;
/// Bridges a streaming HTTP response body into an `AsyncRead`.
pub mod sse_bridge;
/// Concrete speech-to-text stream translators.
pub mod stt;
/// Concrete text-to-speech stream translators.
pub mod tts;

pub use http_adapter::{ApiKeyPlacement, BodyBuilder, HttpAdapter, HttpAdapterConfig};
pub use llm::{LlmSseAdapter, LlmSseConfig};
pub use stt::{AssemblyAiAdapter, AssemblyAiConfig, DeepgramAdapter, DeepgramConfig};
pub use tts::{ElevenLabsAdapter, ElevenLabsConfig, OpenAiTtsAdapter, OpenAiTtsConfig};
