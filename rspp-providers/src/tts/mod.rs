//! Concrete text-to-speech stream translators (§4.8).

/// ElevenLabs-shaped raw-byte streaming translator.
pub mod elevenlabs;
/// openai-tts-shaped non-streaming translator, bridged via §4.6.
pub mod openai_tts;

pub use elevenlabs::{ElevenLabsAdapter, ElevenLabsConfig, AUDIO_CHUNK_BYTES};
pub use openai_tts::{OpenAiTtsAdapter, OpenAiTtsConfig};
