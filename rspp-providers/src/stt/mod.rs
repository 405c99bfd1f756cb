//! Concrete speech-to-text stream translators (§4.8).

/// AssemblyAI-shaped async-poll batch translator.
pub mod assemblyai;
/// Deepgram-shaped SSE streaming translator.
pub mod deepgram;

pub use assemblyai::{AssemblyAiAdapter, AssemblyAiConfig};
pub use deepgram::{AudioBodyBuilder, DeepgramAdapter, DeepgramConfig};
