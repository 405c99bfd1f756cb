use core::fmt;
use serde::{Deserialize, Serialize};

/// The three provider families fanned out per conversational turn.
///
/// The set is closed: callers must not expect new variants to appear
/// without a breaking change, unlike most other enums in this workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum Modality {
    /// Speech-to-text.
    #[default]
    Stt,
    /// Language model / chat completion.
    Llm,
    /// Text-to-speech.
    Tts,
}

impl Modality {
    /// Stable, kebab-case identifier for logs, errors, and env-var lookups.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stt => "stt",
            Self::Llm => "llm",
            Self::Tts => "tts",
        }
    }

    /// Upper-case identifier used in provider credential env-var names
    /// (`RSPP_<MODALITY>_<PROVIDER>_API_KEY`).
    #[must_use]
    pub const fn env_segment(self) -> &'static str {
        match self {
            Self::Stt => "STT",
            Self::Llm => "LLM",
            Self::Tts => "TTS",
        }
    }

    /// All modalities, in a stable order, for iteration over coverage checks.
    #[must_use]
    pub const fn all() -> [Self; 3] {
        [Self::Stt, Self::Llm, Self::Tts]
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
