//! Deepgram-shaped SSE streaming STT translator (§4.8).
//!
//! The request body is the raw audio bytes themselves (not JSON); the
//! response is an SSE stream of JSON events carrying incremental text.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rspp_core::reason::{PROVIDER_STREAM_HTTP_ERROR, PROVIDER_STREAM_PARSE_ERROR};
use rspp_core::{
    capture_payload, parse_sse, Adapter, InvocationRequest, Outcome, OutcomeClass, RequestIdentity,
    SseRecord, SseSink, StreamChunk, StreamChunkKind, StreamObserver, StreamingAdapter,
    MIN_MAX_LINE_BYTES,
};
use rspp_types::{CaptureConfig, Modality, RsppError};
use serde_json::Value;

use crate::collect::CollectingObserver;
use crate::delta::{extract_text_delta, DONE_MARKER};
use crate::http_adapter::{map_status, start_chunk, ApiKeyPlacement};
use crate::outcomes::{cancelled, emit_error_chunk, timeout, transport_error};
use crate::sse_bridge::response_as_async_read;

/// Builds the raw audio bytes sent as the request body for one attempt.
pub type AudioBodyBuilder =
    Arc<dyn Fn(&InvocationRequest) -> Result<Vec<u8>, RsppError> + Send + Sync>;

/// Static configuration for a Deepgram-shaped adapter.
#[derive(Clone)]
pub struct DeepgramConfig {
    /// Stable provider id.
    pub provider_id: String,
    /// Streaming transcription endpoint, e.g. `.../v1/listen?...`.
    pub endpoint: String,
    /// Where to inject the resolved API key.
    pub api_key_placement: ApiKeyPlacement,
    /// The resolved API key value.
    pub api_key_value: String,
    /// `Content-Type` sent with the audio body, e.g. `audio/wav`.
    pub content_type: String,
    /// Request timeout.
    pub timeout: Duration,
    /// Payload capture configuration.
    pub capture: CaptureConfig,
}

/// The Deepgram-shaped streaming STT adapter.
pub struct DeepgramAdapter {
    config: DeepgramConfig,
    client: reqwest::Client,
    body_builder: AudioBodyBuilder,
}

impl DeepgramAdapter {
    /// Construct an adapter from its config, HTTP client, and audio-body builder.
    #[must_use]
    pub fn new(config: DeepgramConfig, client: reqwest::Client, body_builder: AudioBodyBuilder) -> Self {
        Self {
            config,
            client,
            body_builder,
        }
    }

    async fn send(&self, body: Vec<u8>) -> reqwest::Result<reqwest::Response> {
        let mut builder = self
            .client
            .post(&self.config.endpoint)
            .header(reqwest::header::CONTENT_TYPE, &self.config.content_type)
            .body(body);
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
impl Adapter for DeepgramAdapter {
    fn provider_id(&self) -> &str {
        &self.config.provider_id
    }

    fn modality(&self) -> Modality {
        Modality::Stt
    }

    async fn invoke(&self, request: &InvocationRequest) -> Result<Outcome, RsppError> {
        let mut observer = CollectingObserver::default();
        self.invoke_stream(request, &mut observer).await
    }

    fn as_streaming(&self) -> Option<&dyn StreamingAdapter> {
        Some(self)
    }
}

struct DeltaSink<'a> {
    observer: &'a mut dyn StreamObserver,
    identity: RequestIdentity,
    sequence: u64,
    text: String,
}

#[async_trait]
impl SseSink for DeltaSink<'_> {
    async fn accept(&mut self, record: SseRecord) -> Result<(), RsppError> {
        let data = record.data.trim();
        if data.is_empty() || data == DONE_MARKER {
            return Ok(());
        }
        let payload: Value = serde_json::from_str(data)
            .map_err(|_| RsppError::InvalidStreamChunk(PROVIDER_STREAM_PARSE_ERROR.to_string()))?;
        let Some(delta) = extract_text_delta(&payload) else {
            return Ok(());
        };
        self.text.push_str(delta);
        self.sequence += 1;
        let chunk = StreamChunk {
            identity: self.identity.clone(),
            sequence: self.sequence,
            kind: StreamChunkKind::Delta,
            text_delta: Some(delta.to_string()),
            text_final: None,
            audio_bytes: None,
            mime_type: None,
            metadata: None,
            error_reason: None,
        };
        self.observer.on_chunk(&chunk).await
    }
}

#[async_trait]
impl StreamingAdapter for DeepgramAdapter {
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
        let input_capture = capture_payload(&body, false, self.config.capture);

        let response = match tokio::time::timeout(self.config.timeout, self.send(body)).await {
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

        let reader = response_as_async_read(response);
        let mut sink = DeltaSink {
            observer,
            identity: identity.clone(),
            sequence: 0,
            text: String::new(),
        };
        if parse_sse(reader, MIN_MAX_LINE_BYTES, &mut sink).await.is_err() {
            let outcome = Outcome {
                class: OutcomeClass::InfrastructureFailure,
                retryable: true,
                reason: Some(PROVIDER_STREAM_PARSE_ERROR.to_string()),
                circuit_open: false,
                backoff_ms: 0,
                captured_input: Some(input_capture.text.clone()),
                captured_output: None,
                output_status_code: u32::from(status.as_u16()),
                payload_truncated: input_capture.truncated,
            };
            emit_error_chunk(
                sink.observer,
                identity,
                sink.sequence + 1,
                PROVIDER_STREAM_PARSE_ERROR,
            )
            .await?;
            return Ok(outcome);
        }

        let next_sequence = sink.sequence + 1;
        let text = sink.text;
        let output_capture = capture_payload(text.as_bytes(), false, self.config.capture);
        let final_chunk = StreamChunk {
            identity,
            sequence: next_sequence,
            kind: StreamChunkKind::Final,
            text_delta: None,
            text_final: Some(text),
            audio_bytes: None,
            mime_type: None,
            metadata: None,
            error_reason: None,
        };
        sink.observer.on_complete(&final_chunk).await?;

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

    fn request() -> InvocationRequest {
        InvocationRequest {
            identity: RequestIdentity {
                session_id: "s1".into(),
                turn_id: "t1".into(),
                pipeline_version: "v1".into(),
                event_id: "e1".into(),
                provider_invocation_id: "i1".into(),
                provider_id: "deepgram".into(),
                modality: Modality::Stt,
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

    fn config(endpoint: String) -> DeepgramConfig {
        DeepgramConfig {
            provider_id: "deepgram".to_string(),
            endpoint,
            api_key_placement: ApiKeyPlacement::Header {
                name: "Authorization".to_string(),
                prefix: Some("Token ".to_string()),
            },
            api_key_value: "test-key".to_string(),
            content_type: "audio/wav".to_string(),
            timeout: Duration::from_secs(5),
            capture: CaptureConfig::default(),
        }
    }

    #[tokio::test]
    async fn streams_transcript_deltas_into_success_outcome() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/listen");
                then.status(200).body(concat!(
                    "data: {\"choices\":[{\"delta\":{\"content\":\"good \"}}]}\n\n",
                    "data: {\"choices\":[{\"delta\":{\"content\":\"morning\"}}]}\n\n",
                ));
            })
            .await;

        let adapter = DeepgramAdapter::new(
            config(server.url("/listen")),
            reqwest::Client::new(),
            Arc::new(|_req| Ok(b"raw-audio".to_vec())),
        );
        let mut observer = CollectingObserver::default();
        let outcome = adapter.invoke_stream(&request(), &mut observer).await.unwrap();

        mock.assert_async().await;
        assert_eq!(outcome.class, OutcomeClass::Success);
        assert_eq!(observer.text, "good morning");
    }

    #[tokio::test]
    async fn server_error_maps_to_retryable_infrastructure_failure() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/listen");
                then.status(503).body("unavailable");
            })
            .await;

        let adapter = DeepgramAdapter::new(
            config(server.url("/listen")),
            reqwest::Client::new(),
            Arc::new(|_req| Ok(b"raw-audio".to_vec())),
        );
        let mut observer = CollectingObserver::default();
        let outcome = adapter.invoke_stream(&request(), &mut observer).await.unwrap();

        mock.assert_async().await;
        assert_eq!(outcome.class, OutcomeClass::InfrastructureFailure);
        assert!(outcome.retryable);
    }
}
