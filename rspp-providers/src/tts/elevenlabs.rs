//! ElevenLabs-shaped raw-byte streaming TTS translator (§4.8): the response
//! body is raw audio, chunked into 4 KiB segments for observer delivery.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use futures_util::StreamExt;
use rspp_core::reason::{
    PROVIDER_AUDIO_STREAM_READ_ERROR, PROVIDER_EMPTY_AUDIO, PROVIDER_STREAM_HTTP_ERROR,
};
use rspp_core::{
    capture_payload, Adapter, InvocationRequest, Outcome, OutcomeClass, StreamChunk,
    StreamChunkKind, StreamObserver, StreamingAdapter,
};
use rspp_types::{CaptureConfig, Modality, RsppError};
use serde_json::Value;

use crate::collect::CollectingObserver;
use crate::http_adapter::{map_status, start_chunk, ApiKeyPlacement, BodyBuilder};
use crate::outcomes::{cancelled, emit_error_chunk, timeout, transport_error};

/// Audio bytes are re-chunked to this size before being handed to the observer.
pub const AUDIO_CHUNK_BYTES: usize = 4096;

/// Static configuration for an ElevenLabs-shaped adapter.
#[derive(Clone)]
pub struct ElevenLabsConfig {
    /// Stable provider id.
    pub provider_id: String,
    /// Streaming synthesis endpoint, e.g. `.../text-to-speech/{voice}/stream`.
    pub endpoint: String,
    /// Where to inject the resolved API key.
    pub api_key_placement: ApiKeyPlacement,
    /// The resolved API key value.
    pub api_key_value: String,
    /// Mime type of the synthesized audio, e.g. `audio/mpeg`.
    pub mime_type: String,
    /// Request timeout, covering the whole stream lifetime.
    pub timeout: Duration,
    /// Payload capture configuration.
    pub capture: CaptureConfig,
}

/// The ElevenLabs-shaped streaming TTS adapter.
pub struct ElevenLabsAdapter {
    config: ElevenLabsConfig,
    client: reqwest::Client,
    body_builder: BodyBuilder,
}

impl ElevenLabsAdapter {
    /// Construct an adapter from its config, HTTP client, and body builder.
    #[must_use]
    pub fn new(config: ElevenLabsConfig, client: reqwest::Client, body_builder: BodyBuilder) -> Self {
        Self {
            config,
            client,
            body_builder,
        }
    }

    async fn send(&self, body: &Value) -> reqwest::Result<reqwest::Response> {
        let mut builder = self.client.post(&self.config.endpoint).json(body);
        builder = match &self.config.api_key_placement {
            ApiKeyPlacement::Header { name, prefix } => {
                let value = match prefix {
                    Some(p) => format!("{p}{}", self.config.api_key_value),
                    None => self.config.api_key_value.clone(),
                };
                builder.header(name, value)
            }
            ApiKeyPlacement::Query { param } => {
                builder.query(&[(param.as_str(), self.config.api_key_value.as_str())])
            }
        };
        builder.send().await
    }
}

#[async_trait]
impl Adapter for ElevenLabsAdapter {
    fn provider_id(&self) -> &str {
        &self.config.provider_id
    }

    fn modality(&self) -> Modality {
        Modality::Tts
    }

    async fn invoke(&self, request: &InvocationRequest) -> Result<Outcome, RsppError> {
        let mut observer = CollectingObserver::default();
        self.invoke_stream(request, &mut observer).await
    }

    fn as_streaming(&self) -> Option<&dyn StreamingAdapter> {
        Some(self)
    }
}

#[async_trait]
impl StreamingAdapter for ElevenLabsAdapter {
    async fn invoke_stream(
        &self,
        request: &InvocationRequest,
        observer: &mut dyn StreamObserver,
    ) -> Result<Outcome, RsppError> {
        request.validate()?;
        let identity = request.identity.clone();

        if request.cancel_requested {
            let outcome = cancelled();
            emit_error_chunk(observer, identity, 0, outcome.reason.as_deref().unwrap_or_default())
                .await?;
            return Ok(outcome);
        }

        observer.on_start(&start_chunk(identity.clone())).await?;

        let body = (self.body_builder)(request)?;
        let body_bytes =
            serde_json::to_vec(&body).map_err(|e| RsppError::InvalidRequest(e.to_string()))?;
        let input_capture = capture_payload(&body_bytes, false, self.config.capture);

        let response = match tokio::time::timeout(self.config.timeout, self.send(&body)).await {
            Err(_) => {
                let outcome = timeout();
                emit_error_chunk(observer, identity, 1, PROVIDER_STREAM_HTTP_ERROR).await?;
                return Ok(outcome);
            }
            Ok(Err(_)) => {
                let outcome = transport_error();
                emit_error_chunk(observer, identity, 1, PROVIDER_STREAM_HTTP_ERROR).await?;
                return Ok(outcome);
            }
            Ok(Ok(r)) => r,
        };

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let body_text = response.text().await.unwrap_or_default();
            let output_capture = capture_payload(body_text.as_bytes(), false, self.config.capture);
            let (class, retryable, reason, circuit_open, backoff_ms) =
                map_status(status, retry_after.as_deref());
            let outcome = Outcome {
                class,
                retryable,
                reason: Some(reason.unwrap_or(PROVIDER_STREAM_HTTP_ERROR).to_string()),
                circuit_open,
                backoff_ms,
                captured_input: Some(input_capture.text),
                captured_output: Some(output_capture.text),
                output_status_code: u32::from(status.as_u16()),
                payload_truncated: input_capture.truncated || output_capture.truncated,
            };
            emit_error_chunk(
                observer,
                identity,
                1,
                outcome.reason.as_deref().unwrap_or(PROVIDER_STREAM_HTTP_ERROR),
            )
            .await?;
            return Ok(outcome);
        }

        let mut byte_stream = Box::pin(response.bytes_stream());
        let mut pending = Vec::<u8>::new();
        let mut accumulated = Vec::<u8>::new();
        let mut sequence: u64 = 0;

        loop {
            match byte_stream.next().await {
                Some(Ok(bytes)) => {
                    pending.extend_from_slice(&bytes);
                    accumulated.extend_from_slice(&bytes);
                    while pending.len() >= AUDIO_CHUNK_BYTES {
                        let segment: Vec<u8> = pending.drain(..AUDIO_CHUNK_BYTES).collect();
                        sequence += 1;
                        let chunk = StreamChunk {
                            identity: identity.clone(),
                            sequence,
                            kind: StreamChunkKind::Audio,
                            text_delta: None,
                            text_final: None,
                            audio_bytes: Some(segment),
                            mime_type: Some(self.config.mime_type.clone()),
                            metadata: None,
                            error_reason: None,
                        };
                        observer.on_chunk(&chunk).await?;
                    }
                }
                Some(Err(_)) => {
                    let outcome = Outcome {
                        class: OutcomeClass::InfrastructureFailure,
                        retryable: true,
                        reason: Some(PROVIDER_AUDIO_STREAM_READ_ERROR.to_string()),
                        circuit_open: false,
                        backoff_ms: 0,
                        captured_input: Some(input_capture.text),
                        captured_output: None,
                        output_status_code: u32::from(status.as_u16()),
                        payload_truncated: input_capture.truncated,
                    };
                    emit_error_chunk(observer, identity, sequence + 1, PROVIDER_AUDIO_STREAM_READ_ERROR)
                        .await?;
                    return Ok(outcome);
                }
                None => break,
            }
        }

        if !pending.is_empty() {
            sequence += 1;
            let chunk = StreamChunk {
                identity: identity.clone(),
                sequence,
                kind: StreamChunkKind::Audio,
                text_delta: None,
                text_final: None,
                audio_bytes: Some(pending),
                mime_type: Some(self.config.mime_type.clone()),
                metadata: None,
                error_reason: None,
            };
            observer.on_chunk(&chunk).await?;
        }

        if accumulated.is_empty() {
            let outcome = Outcome {
                class: OutcomeClass::InfrastructureFailure,
                retryable: true,
                reason: Some(PROVIDER_EMPTY_AUDIO.to_string()),
                circuit_open: false,
                backoff_ms: 0,
                captured_input: Some(input_capture.text),
                captured_output: None,
                output_status_code: u32::from(status.as_u16()),
                payload_truncated: input_capture.truncated,
            };
            emit_error_chunk(observer, identity, sequence + 1, PROVIDER_EMPTY_AUDIO).await?;
            return Ok(outcome);
        }

        let output_capture = capture_payload(&accumulated, false, self.config.capture);
        let mut metadata = HashMap::new();
        metadata.insert("mime_type".to_string(), self.config.mime_type.clone());
        metadata.insert("audio_bytes".to_string(), STANDARD.encode(&accumulated));
        let final_chunk = StreamChunk {
            identity,
            sequence: sequence + 1,
            kind: StreamChunkKind::Final,
            text_delta: None,
            text_final: None,
            audio_bytes: None,
            mime_type: None,
            metadata: Some(metadata),
            error_reason: None,
        };
        observer.on_complete(&final_chunk).await?;

        Ok(Outcome {
            class: OutcomeClass::Success,
            retryable: false,
            reason: None,
            circuit_open: false,
            backoff_ms: 0,
            captured_input: Some(input_capture.text),
            captured_output: Some(output_capture.text),
            output_status_code: u32::from(status.as_u16()),
            payload_truncated: input_capture.truncated || output_capture.truncated,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::Method::POST;
    use httpmock::MockServer;
    use rspp_core::RequestIdentity;
    use serde_json::json;

    fn request() -> InvocationRequest {
        InvocationRequest {
            identity: RequestIdentity {
                session_id: "s1".into(),
                turn_id: "t1".into(),
                pipeline_version: "v1".into(),
                event_id: "e1".into(),
                provider_invocation_id: "i1".into(),
                provider_id: "elevenlabs".into(),
                modality: Modality::Tts,
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

    fn config(endpoint: String) -> ElevenLabsConfig {
        ElevenLabsConfig {
            provider_id: "elevenlabs".to_string(),
            endpoint,
            api_key_placement: ApiKeyPlacement::Header {
                name: "xi-api-key".to_string(),
                prefix: None,
            },
            api_key_value: "test-key".to_string(),
            mime_type: "audio/mpeg".to_string(),
            timeout: Duration::from_secs(5),
            capture: CaptureConfig::default(),
        }
    }

    #[tokio::test]
    async fn streams_raw_audio_bytes_into_success_outcome() {
        let server = MockServer::start_async().await;
        let audio = vec![7_u8; AUDIO_CHUNK_BYTES + 100];
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/stream");
                then.status(200).body(audio.clone());
            })
            .await;

        let adapter = ElevenLabsAdapter::new(
            config(server.url("/stream")),
            reqwest::Client::new(),
            std::sync::Arc::new(|_req| Ok(json!({"text": "hello"}))),
        );
        let mut observer = CollectingObserver::default();
        let outcome = adapter.invoke_stream(&request(), &mut observer).await.unwrap();

        mock.assert_async().await;
        assert_eq!(outcome.class, OutcomeClass::Success);
        assert_eq!(observer.audio.len(), AUDIO_CHUNK_BYTES + 100);
        assert_eq!(observer.mime_type.as_deref(), Some("audio/mpeg"));
    }

    #[tokio::test]
    async fn empty_body_is_an_infrastructure_failure() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/stream");
                then.status(200).body("");
            })
            .await;

        let adapter = ElevenLabsAdapter::new(
            config(server.url("/stream")),
            reqwest::Client::new(),
            std::sync::Arc::new(|_req| Ok(json!({}))),
        );
        let mut observer = CollectingObserver::default();
        let outcome = adapter.invoke_stream(&request(), &mut observer).await.unwrap();

        mock.assert_async().await;
        assert_eq!(outcome.class, OutcomeClass::InfrastructureFailure);
    }
}
