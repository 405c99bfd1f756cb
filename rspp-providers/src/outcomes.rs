//! Outcome and error-chunk constructors shared by the per-provider stream
//! translators (§4.8), so each translator states its branching logic without
//! repeating the same struct literals.

use rspp_core::reason::{PROVIDER_CANCELLED, PROVIDER_TIMEOUT, PROVIDER_TRANSPORT_ERROR};
use rspp_core::{Outcome, OutcomeClass, RequestIdentity, StreamChunk, StreamChunkKind, StreamObserver};
use rspp_types::RsppError;

/// A `cancelled` outcome for a request with `cancel_requested == true`.
#[must_use]
pub fn cancelled() -> Outcome {
    Outcome {
        class: OutcomeClass::Cancelled,
        retryable: false,
        reason: Some(PROVIDER_CANCELLED.to_string()),
        circuit_open: false,
        backoff_ms: 0,
        captured_input: None,
        captured_output: None,
        output_status_code: 0,
        payload_truncated: false,
    }
}

/// A `timeout` outcome for a deadline-exceeded attempt.
#[must_use]
pub fn timeout() -> Outcome {
    Outcome {
        class: OutcomeClass::Timeout,
        retryable: true,
        reason: Some(PROVIDER_TIMEOUT.to_string()),
        circuit_open: false,
        backoff_ms: 0,
        captured_input: None,
        captured_output: None,
        output_status_code: 0,
        payload_truncated: false,
    }
}

/// An `infrastructure_failure` outcome for a transport-level fault.
#[must_use]
pub fn transport_error() -> Outcome {
    Outcome {
        class: OutcomeClass::InfrastructureFailure,
        retryable: true,
        reason: Some(PROVIDER_TRANSPORT_ERROR.to_string()),
        circuit_open: false,
        backoff_ms: 0,
        captured_input: None,
        captured_output: None,
        output_status_code: 0,
        payload_truncated: false,
    }
}

/// Build a sequence-`sequence` `error` chunk and deliver it through `observer`.
pub async fn emit_error_chunk(
    observer: &mut dyn StreamObserver,
    identity: RequestIdentity,
    sequence: u64,
    reason: &str,
) -> Result<(), RsppError> {
    let chunk = StreamChunk {
        identity,
        sequence,
        kind: StreamChunkKind::Error,
        text_delta: None,
        text_final: None,
        audio_bytes: None,
        mime_type: None,
        metadata: None,
        error_reason: Some(reason.to_string()),
    };
    observer.on_error(&chunk).await
}
