//! Payload-capture configuration (§4.9 of the provider invocation contract).

use serde::{Deserialize, Serialize};

/// Minimum allowed capture byte cap. Values below this floor are rejected by
/// [`CaptureConfig::from_env`] in favor of the default.
pub const MIN_CAPTURE_BYTES: usize = 256;

/// Default capture byte cap when no environment override is present or the
/// override is invalid.
pub const DEFAULT_CAPTURE_BYTES: usize = 8192;

/// Selects how request/response payloads are rendered for logging and replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CaptureMode {
    /// Payload is replaced by a constant marker plus a digest; never the bytes.
    #[default]
    Redacted,
    /// Up to `max_bytes` of the payload, verbatim (UTF-8) or base64-wrapped.
    Full,
    /// A digest and byte count only, no marker text.
    Hash,
}

impl CaptureMode {
    /// Parse the `RSPP_PROVIDER_IO_CAPTURE_MODE` value, case-sensitively.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "redacted" => Some(Self::Redacted),
            "full" => Some(Self::Full),
            "hash" => Some(Self::Hash),
            _ => None,
        }
    }
}

/// Process-wide capture configuration, resolved once at adapter construction.
///
/// Keeping environment parsing at the process boundary (here) rather than
/// scattered through call sites is the one prescribed shape in the design
/// notes; adapters receive this struct by value, they never read the
/// environment themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Capture rendering mode.
    pub mode: CaptureMode,
    /// Maximum number of payload bytes considered before truncation.
    pub max_bytes: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            mode: CaptureMode::default(),
            max_bytes: DEFAULT_CAPTURE_BYTES,
        }
    }
}

impl CaptureConfig {
    /// Resolve from `RSPP_PROVIDER_IO_CAPTURE_MODE` and
    /// `RSPP_PROVIDER_IO_CAPTURE_MAX_BYTES`. Invalid values fall back to
    /// defaults silently, per the external-interface contract.
    #[must_use]
    pub fn from_env() -> Self {
        let mode = std::env::var("RSPP_PROVIDER_IO_CAPTURE_MODE")
            .ok()
            .and_then(|v| CaptureMode::parse(v.trim()))
            .unwrap_or_default();
        let max_bytes = std::env::var("RSPP_PROVIDER_IO_CAPTURE_MAX_BYTES")
            .ok()
            .and_then(|v| v.trim().parse::<usize>().ok())
            .filter(|&n| n >= MIN_CAPTURE_BYTES)
            .unwrap_or(DEFAULT_CAPTURE_BYTES);
        Self { mode, max_bytes }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_rejects_unknown_mode() {
        assert_eq!(CaptureMode::parse("bogus"), None);
        assert_eq!(CaptureMode::parse("full"), Some(CaptureMode::Full));
    }

    #[test]
    fn default_is_redacted_with_default_cap() {
        let cfg = CaptureConfig::default();
        assert_eq!(cfg.mode, CaptureMode::Redacted);
        assert_eq!(cfg.max_bytes, DEFAULT_CAPTURE_BYTES);
    }
}
