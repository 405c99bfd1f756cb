//! A fixed-script mock adapter for CI-safe examples: deterministic text (and,
//! for `Tts`, a handful of silent audio bytes) with no external controller.

use async_trait::async_trait;
use rspp_core::reason::PROVIDER_CLIENT_ERROR;
use rspp_core::{
    Adapter, InvocationRequest, Outcome, OutcomeClass, StreamChunk, StreamChunkKind, StreamObserver,
    StreamingAdapter,
};
use rspp_types::{Modality, RsppError};

/// Deterministic single-attempt mock: `provider_id`/`modality` identify it,
/// and every invocation returns the same scripted text (or, for `Tts`,
/// scripted audio bytes) unless the request's `event_id` is `"FAIL"`, which
/// always fails with a client-error outcome.
pub struct StaticMockAdapter {
    provider_id: String,
    modality: Modality,
    scripted_text: String,
    scripted_audio: Vec<u8>,
}

impl StaticMockAdapter {
    /// Construct a static mock for a text modality (`Stt` or `Llm`).
    #[must_use]
    pub fn text(provider_id: impl Into<String>, modality: Modality, scripted_text: impl Into<String>) -> Self {
        Self {
            provider_id: provider_id.into(),
            modality,
            scripted_text: scripted_text.into(),
            scripted_audio: Vec::new(),
        }
    }

    /// Construct a static mock for the `Tts` modality.
    #[must_use]
    pub fn audio(provider_id: impl Into<String>, scripted_audio: Vec<u8>) -> Self {
        Self {
            provider_id: provider_id.into(),
            modality: Modality::Tts,
            scripted_text: String::new(),
            scripted_audio,
        }
    }

    fn forced_failure(request: &InvocationRequest) -> bool {
        request.identity.event_id == "FAIL"
    }
}

#[async_trait]
impl Adapter for StaticMockAdapter {
    fn provider_id(&self) -> &str {
        &self.provider_id
    }

    fn modality(&self) -> Modality {
        self.modality
    }

    async fn invoke(&self, request: &InvocationRequest) -> Result<Outcome, RsppError> {
        request.validate()?;
        if Self::forced_failure(request) {
            return Ok(Outcome {
                class: OutcomeClass::Blocked,
                retryable: false,
                reason: Some(PROVIDER_CLIENT_ERROR.to_string()),
                circuit_open: false,
                backoff_ms: 0,
                captured_input: None,
                captured_output: None,
                output_status_code: 0,
                payload_truncated: false,
            });
        }

        let captured_output = if self.modality == Modality::Tts {
            format!("{} audio bytes", self.scripted_audio.len())
        } else {
            self.scripted_text.clone()
        };
        Ok(Outcome {
            class: OutcomeClass::Success,
            retryable: false,
            reason: None,
            circuit_open: false,
            backoff_ms: 0,
            captured_input: None,
            captured_output: Some(captured_output),
            output_status_code: 200,
            payload_truncated: false,
        })
    }

    fn as_streaming(&self) -> Option<&dyn StreamingAdapter> {
        Some(self)
    }
}

#[async_trait]
impl StreamingAdapter for StaticMockAdapter {
    async fn invoke_stream(
        &self,
        request: &InvocationRequest,
        observer: &mut dyn StreamObserver,
    ) -> Result<Outcome, RsppError> {
        request.validate()?;
        let identity = request.identity.clone();

        let start = StreamChunk {
            identity: identity.clone(),
            sequence: 0,
            kind: StreamChunkKind::Start,
            text_delta: None,
            text_final: None,
            audio_bytes: None,
            mime_type: None,
            metadata: None,
            error_reason: None,
        };
        observer.on_start(&start).await?;

        if Self::forced_failure(request) {
            let error_chunk = StreamChunk {
                identity,
                sequence: 1,
                kind: StreamChunkKind::Error,
                text_delta: None,
                text_final: None,
                audio_bytes: None,
                mime_type: None,
                metadata: None,
                error_reason: Some(PROVIDER_CLIENT_ERROR.to_string()),
            };
            observer.on_error(&error_chunk).await?;
            return Ok(Outcome {
                class: OutcomeClass::Blocked,
                retryable: false,
                reason: Some(PROVIDER_CLIENT_ERROR.to_string()),
                circuit_open: false,
                backoff_ms: 0,
                captured_input: None,
                captured_output: None,
                output_status_code: 0,
                payload_truncated: false,
            });
        }

        if self.modality == Modality::Tts {
            let audio_chunk = StreamChunk {
                identity: identity.clone(),
                sequence: 1,
                kind: StreamChunkKind::Audio,
                text_delta: None,
                text_final: None,
                audio_bytes: Some(self.scripted_audio.clone()),
                mime_type: Some("audio/wav".to_string()),
                metadata: None,
                error_reason: None,
            };
            observer.on_chunk(&audio_chunk).await?;
        } else {
            for word in self.scripted_text.split_whitespace() {
                let delta_chunk = StreamChunk {
                    identity: identity.clone(),
                    sequence: 1,
                    kind: StreamChunkKind::Delta,
                    text_delta: Some(format!("{word} ")),
                    text_final: None,
                    audio_bytes: None,
                    mime_type: None,
                    metadata: None,
                    error_reason: None,
                };
                observer.on_chunk(&delta_chunk).await?;
            }
        }

        let final_chunk = StreamChunk {
            identity,
            sequence: 2,
            kind: StreamChunkKind::Final,
            text_delta: None,
            text_final: if self.modality == Modality::Tts {
                None
            } else {
                Some(self.scripted_text.clone())
            },
            audio_bytes: None,
            mime_type: None,
            metadata: None,
            error_reason: None,
        };
        observer.on_complete(&final_chunk).await?;

        Ok(Outcome {
            class: OutcomeClass::Success,
            retryable: false,
            reason: None,
            circuit_open: false,
            backoff_ms: 0,
            captured_input: None,
            captured_output: Some(if self.modality == Modality::Tts {
                format!("{} audio bytes", self.scripted_audio.len())
            } else {
                self.scripted_text.clone()
            }),
            output_status_code: 200,
            payload_truncated: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rspp_core::RequestIdentity;

    fn request(event_id: &str) -> InvocationRequest {
        InvocationRequest {
            identity: RequestIdentity {
                session_id: "s1".to_string(),
                turn_id: "t1".to_string(),
                pipeline_version: "v1".to_string(),
                event_id: event_id.to_string(),
                provider_invocation_id: "i1".to_string(),
                provider_id: "mock".to_string(),
                modality: Modality::Llm,
            },
            attempt: 1,
            transport_sequence: 0,
            runtime_sequence: 0,
            authority_epoch: 0,
            runtime_timestamp_ms: 0,
            wall_clock_timestamp_ms: 0,
            cancel_requested: false,
            allowed_adaptive_actions: Vec::new(),
            retry_budget_remaining: 1,
            candidate_provider_count: 1,
        }
    }

    #[tokio::test]
    async fn invoke_returns_scripted_text() {
        let adapter = StaticMockAdapter::text("mock", Modality::Llm, "hello world");
        let outcome = adapter.invoke(&request("e1")).await.unwrap();
        assert_eq!(outcome.class, OutcomeClass::Success);
        assert_eq!(outcome.captured_output.as_deref(), Some("hello world"));
    }

    #[tokio::test]
    async fn invoke_forced_failure() {
        let adapter = StaticMockAdapter::text("mock", Modality::Llm, "hello world");
        let outcome = adapter.invoke(&request("FAIL")).await.unwrap();
        assert_eq!(outcome.class, OutcomeClass::Blocked);
    }
}
