//! Per-attempt contracts (§3, §4.1): the identity shared by a request and its
//! stream chunks, the invocation request itself, the normalized outcome, and
//! one streamed lifecycle event.

use std::collections::HashMap;

use rspp_types::{AdaptiveAction, Modality, RsppError};
use serde::{Deserialize, Serialize};

fn require_non_empty(field: &str, value: &str) -> Result<(), RsppError> {
    if value.trim().is_empty() {
        return Err(RsppError::InvalidRequest(format!("{field} must not be empty")));
    }
    Ok(())
}

/// Identity fields shared between an [`InvocationRequest`] and every
/// [`StreamChunk`] it produces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestIdentity {
    /// Conversation session id.
    pub session_id: String,
    /// Turn id within the session.
    pub turn_id: String,
    /// Version of the orchestrating pipeline that issued this request.
    pub pipeline_version: String,
    /// Event id correlating this attempt with the event ABI (out of scope here).
    pub event_id: String,
    /// Id unique to this provider-invocation attempt.
    pub provider_invocation_id: String,
    /// The provider being invoked.
    pub provider_id: String,
    /// The modality being invoked.
    pub modality: Modality,
}

impl RequestIdentity {
    fn validate(&self) -> Result<(), RsppError> {
        require_non_empty("session_id", &self.session_id)?;
        require_non_empty("turn_id", &self.turn_id)?;
        require_non_empty("pipeline_version", &self.pipeline_version)?;
        require_non_empty("event_id", &self.event_id)?;
        require_non_empty("provider_invocation_id", &self.provider_invocation_id)?;
        require_non_empty("provider_id", &self.provider_id)?;
        Ok(())
    }
}

/// Per-attempt context built by orchestration before each attempt; immutable
/// during the attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationRequest {
    /// Identity shared with the chunks this attempt will emit, if streaming.
    pub identity: RequestIdentity,
    /// Attempt number, 1-based.
    pub attempt: u32,
    /// Transport-layer sequence number at request time.
    pub transport_sequence: u64,
    /// Orchestration runtime sequence number at request time.
    pub runtime_sequence: u64,
    /// Authority epoch guarding against stale control-plane decisions.
    pub authority_epoch: u64,
    /// Monotonic runtime clock timestamp, in milliseconds.
    pub runtime_timestamp_ms: u64,
    /// Wall-clock timestamp, in milliseconds since the epoch.
    pub wall_clock_timestamp_ms: u64,
    /// Set by orchestration to request cooperative cancellation.
    pub cancel_requested: bool,
    /// Adaptive actions permitted for this attempt; sorted and unique.
    pub allowed_adaptive_actions: Vec<AdaptiveAction>,
    /// Remaining retry budget, decremented by orchestration between attempts.
    pub retry_budget_remaining: u32,
    /// Number of candidate providers remaining in the resolved plan.
    pub candidate_provider_count: u32,
}

impl InvocationRequest {
    /// Validate every invariant from §3/§4.1, failing closed on the first violation.
    pub fn validate(&self) -> Result<(), RsppError> {
        self.identity.validate()?;
        if self.attempt < 1 {
            return Err(RsppError::InvalidRequest("attempt must be >= 1".into()));
        }
        let normalized = rspp_types::normalize_adaptive_actions(&self.allowed_adaptive_actions)
            .map_err(|e| RsppError::InvalidRequest(e.to_string()))?;
        if normalized != self.allowed_adaptive_actions {
            return Err(RsppError::InvalidRequest(
                "allowed_adaptive_actions must be sorted and unique".into(),
            ));
        }
        Ok(())
    }
}

/// Normalized result of one provider attempt (§3, §4.6's status mapping writes these).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutcomeClass {
    /// The attempt succeeded.
    Success,
    /// The attempt exceeded its deadline.
    Timeout,
    /// The provider signaled it is overloaded (e.g. HTTP 429).
    Overload,
    /// The attempt was rejected by policy or authentication (e.g. 401/403/4xx).
    Blocked,
    /// A transport or server-side fault occurred.
    InfrastructureFailure,
    /// The attempt was cancelled before or during the call.
    Cancelled,
}

impl OutcomeClass {
    /// Whether this class is mechanically safe to retry. Advisory only; the
    /// actual retry decision belongs to orchestration (§7).
    #[must_use]
    pub const fn retryable_by_default(self) -> bool {
        matches!(
            self,
            Self::Timeout | Self::Overload | Self::InfrastructureFailure
        )
    }
}

/// Normalized result of one attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    /// Which normalized class this attempt fell into.
    pub class: OutcomeClass,
    /// Whether orchestration may mechanically retry this class of failure.
    pub retryable: bool,
    /// Required when `class != Success`; drawn from the closed reason set (§7).
    pub reason: Option<String>,
    /// Advisory hint that the next attempt should avoid this provider. Must
    /// be `false` when `class == Success`.
    pub circuit_open: bool,
    /// Suggested backoff before the next attempt, in milliseconds.
    pub backoff_ms: u64,
    /// Captured input payload, rendered per §4.9.
    pub captured_input: Option<String>,
    /// Captured output payload, rendered per §4.9.
    pub captured_output: Option<String>,
    /// Output status code, domain-appropriate (HTTP status, job status, etc.).
    pub output_status_code: u32,
    /// Logical OR of input/output truncation, per §4.9.
    pub payload_truncated: bool,
}

impl Outcome {
    /// Validate per §3/§8: non-success classes require a reason; success
    /// requires `circuit_open == false`.
    pub fn validate(&self) -> Result<(), RsppError> {
        if self.class != OutcomeClass::Success {
            let reason_ok = self.reason.as_deref().is_some_and(|r| !r.trim().is_empty());
            if !reason_ok {
                return Err(RsppError::InvalidOutcome(
                    "reason is required when class != success".into(),
                ));
            }
        } else if self.circuit_open {
            return Err(RsppError::InvalidOutcome(
                "circuit_open must be false when class == success".into(),
            ));
        }
        Ok(())
    }
}

/// One lifecycle event emitted during a streaming invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StreamChunkKind {
    /// The stream has opened.
    Start,
    /// A text delta arrived.
    Delta,
    /// The stream has reached its terminal success state.
    Final,
    /// An audio chunk arrived.
    Audio,
    /// An out-of-band metadata event (e.g. async-poll status).
    Metadata,
    /// The stream reached its terminal error state.
    Error,
}

/// One element of a provider stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamChunk {
    /// Identity fields copied from the originating request.
    pub identity: RequestIdentity,
    /// Monotonically increasing sequence number, starting at 0.
    pub sequence: u64,
    /// Which lifecycle event this is.
    pub kind: StreamChunkKind,
    /// Present for `Delta` chunks.
    pub text_delta: Option<String>,
    /// Present for `Final` chunks carrying a text-modality result.
    pub text_final: Option<String>,
    /// Present for `Audio` chunks; required non-empty.
    pub audio_bytes: Option<Vec<u8>>,
    /// Present alongside `audio_bytes`.
    pub mime_type: Option<String>,
    /// Present for `Metadata` chunks and, optionally, `Final` audio chunks.
    pub metadata: Option<HashMap<String, String>>,
    /// Required when `kind == Error`.
    pub error_reason: Option<String>,
}

impl StreamChunk {
    /// Validate the per-kind required fields from §3.
    pub fn validate(&self) -> Result<(), RsppError> {
        self.identity.validate()?;
        match self.kind {
            StreamChunkKind::Start => {}
            StreamChunkKind::Delta => {
                if self.text_delta.as_deref().is_none_or(str::is_empty) {
                    return Err(RsppError::InvalidStreamChunk(
                        "text_delta is required for Delta chunks".into(),
                    ));
                }
            }
            StreamChunkKind::Final => {
                let has_text = self.text_final.as_deref().is_some_and(|s| !s.is_empty());
                let has_metadata = self.metadata.as_ref().is_some_and(|m| !m.is_empty());
                if !has_text && !has_metadata {
                    return Err(RsppError::InvalidStreamChunk(
                        "Final chunk requires text_final or metadata".into(),
                    ));
                }
            }
            StreamChunkKind::Audio => {
                if self.audio_bytes.as_deref().is_none_or(<[u8]>::is_empty) {
                    return Err(RsppError::InvalidStreamChunk(
                        "audio_bytes is required non-empty for Audio chunks".into(),
                    ));
                }
                if self.mime_type.as_deref().is_none_or(str::is_empty) {
                    return Err(RsppError::InvalidStreamChunk(
                        "mime_type is required for Audio chunks".into(),
                    ));
                }
            }
            StreamChunkKind::Metadata => {
                if self.metadata.is_none() {
                    return Err(RsppError::InvalidStreamChunk(
                        "metadata is required for Metadata chunks".into(),
                    ));
                }
            }
            StreamChunkKind::Error => {
                if self.error_reason.as_deref().is_none_or(str::is_empty) {
                    return Err(RsppError::InvalidStreamChunk(
                        "error_reason is required for Error chunks".into(),
                    ));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> RequestIdentity {
        RequestIdentity {
            session_id: "sess-1".into(),
            turn_id: "turn-1".into(),
            pipeline_version: "v1".into(),
            event_id: "evt-1".into(),
            provider_invocation_id: "inv-1".into(),
            provider_id: "stt-a".into(),
            modality: Modality::Stt,
        }
    }

    #[test]
    fn invocation_request_rejects_attempt_zero() {
        let req = InvocationRequest {
            identity: identity(),
            attempt: 0,
            transport_sequence: 0,
            runtime_sequence: 0,
            authority_epoch: 0,
            runtime_timestamp_ms: 0,
            wall_clock_timestamp_ms: 0,
            cancel_requested: false,
            allowed_adaptive_actions: vec![],
            retry_budget_remaining: 0,
            candidate_provider_count: 0,
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn outcome_requires_reason_on_non_success() {
        let outcome = Outcome {
            class: OutcomeClass::Timeout,
            retryable: true,
            reason: None,
            circuit_open: false,
            backoff_ms: 0,
            captured_input: None,
            captured_output: None,
            output_status_code: 408,
            payload_truncated: false,
        };
        assert!(outcome.validate().is_err());
    }

    #[test]
    fn outcome_success_forbids_circuit_open() {
        let outcome = Outcome {
            class: OutcomeClass::Success,
            retryable: false,
            reason: None,
            circuit_open: true,
            backoff_ms: 0,
            captured_input: None,
            captured_output: None,
            output_status_code: 200,
            payload_truncated: false,
        };
        assert!(outcome.validate().is_err());
    }

    #[test]
    fn stream_chunk_delta_requires_text() {
        let chunk = StreamChunk {
            identity: identity(),
            sequence: 1,
            kind: StreamChunkKind::Delta,
            text_delta: None,
            text_final: None,
            audio_bytes: None,
            mime_type: None,
            metadata: None,
            error_reason: None,
        };
        assert!(chunk.validate().is_err());
    }

    #[test]
    fn stream_chunk_audio_requires_bytes_and_mime() {
        let chunk = StreamChunk {
            identity: identity(),
            sequence: 1,
            kind: StreamChunkKind::Audio,
            text_delta: None,
            text_final: None,
            audio_bytes: Some(vec![]),
            mime_type: Some("audio/mpeg".into()),
            metadata: None,
            error_reason: None,
        };
        assert!(chunk.validate().is_err());
    }
}
