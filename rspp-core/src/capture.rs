//! Three-mode payload capture for logging and replay (§4.9).

use base64::{engine::general_purpose::STANDARD, Engine as _};
use rspp_types::{CaptureConfig, CaptureMode};
use sha2::{Digest, Sha256};

/// Rendered payload text plus whether it was truncated relative to the
/// configured byte cap (or was already marked truncated by the caller).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureResult {
    /// The rendered payload, shaped per the configured [`CaptureMode`].
    pub text: String,
    /// Whether the rendered text omits part of the original payload.
    pub truncated: bool,
}

/// Render `payload` per `config`.
///
/// `already_truncated` lets an upstream reader (e.g. a streaming body
/// that was itself capped) mark truncation even when `payload.len()` alone
/// would not exceed the cap.
#[must_use]
pub fn capture(payload: &[u8], already_truncated: bool, config: CaptureConfig) -> CaptureResult {
    let exceeds_cap = payload.len() > config.max_bytes;
    let truncated = already_truncated || exceeds_cap;

    let text = match config.mode {
        CaptureMode::Full => {
            let end = payload.len().min(config.max_bytes);
            let slice = &payload[..end];
            match std::str::from_utf8(slice) {
                Ok(s) => s.to_string(),
                Err(_) => format!("base64:{}", STANDARD.encode(slice)),
            }
        }
        CaptureMode::Hash => {
            let digest = hex::encode(Sha256::digest(payload));
            format!("sha256={digest} bytes={}", payload.len())
        }
        CaptureMode::Redacted => {
            let digest = hex::encode(Sha256::digest(payload));
            format!("redacted sha256={digest} bytes={}", payload.len())
        }
    };

    CaptureResult { text, truncated }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(mode: CaptureMode, max_bytes: usize) -> CaptureConfig {
        CaptureConfig { mode, max_bytes }
    }

    #[test]
    fn redacted_never_echoes_payload_bytes() {
        let result = capture(b"hello world", false, cfg(CaptureMode::Redacted, 8192));
        assert!(result.text.starts_with("redacted sha256="));
        assert!(!result.text.contains("hello"));
    }

    #[test]
    fn hash_reports_full_byte_count_even_when_capped() {
        let payload = vec![b'x'; 1024];
        let result = capture(&payload, false, cfg(CaptureMode::Hash, 256));
        assert!(result.text.ends_with("bytes=1024"));
    }

    #[test]
    fn full_mode_truncates_at_cap_and_sets_flag() {
        let payload = vec![b'a'; 1024];
        let result = capture(&payload, false, cfg(CaptureMode::Full, 256));
        assert_eq!(result.text.len(), 256);
        assert!(result.truncated);
    }

    #[test]
    fn full_mode_falls_back_to_base64_for_non_utf8() {
        let payload = vec![0xFF, 0xFE, 0xFD];
        let result = capture(&payload, false, cfg(CaptureMode::Full, 8192));
        assert!(result.text.starts_with("base64:"));
    }

    #[test]
    fn already_truncated_input_is_preserved() {
        let result = capture(b"short", true, cfg(CaptureMode::Full, 8192));
        assert!(result.truncated);
    }
}
