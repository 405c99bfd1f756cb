//! openai-tts-shaped non-streaming TTS adapter, bridged through the §4.6
//! unary-to-stream mechanics. Unlike [`crate::http_adapter::HttpAdapter`], the
//! response body is raw audio rather than text, so the final chunk carries
//! it via `metadata` rather than a captured text string.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use rspp_core::reason::{PROVIDER_EMPTY_AUDIO, PROVIDER_STREAM_HTTP_ERROR};
use rspp_core::{
    capture_payload, Adapter, InvocationRequest, Outcome, OutcomeClass, StreamChunk,
    StreamChunkKind, StreamObserver, StreamingAdapter,
};
use rspp_types::{CaptureConfig, Modality, RsppError};
use serde_json::Value;

use crate::collect::CollectingObserver;
use crate::http_adapter::{map_status, start_chunk, ApiKeyPlacement, BodyBuilder};
use crate::outcomes::{cancelled, emit_error_chunk, timeout, transport_error};

/// Static configuration for an openai-tts-shaped adapter.
#[derive(Clone)]
pub struct OpenAiTtsConfig {
    /// Stable provider id.
    pub provider_id: String,
    /// Synthesis endpoint, e.g. `.../v1/audio/speech`.
    pub endpoint: String,
    /// Where to inject the resolved API key.
    pub api_key_placement: ApiKeyPlacement,
    /// The resolved API key value.
    pub api_key_value: String,
    /// Mime type of the synthesized audio, e.g. `audio/mpeg`.
    pub mime_type: String,
    /// Request timeout.
    pub timeout: Duration,
    /// Payload capture configuration.
    pub capture: CaptureConfig,
}

/// The openai-tts-shaped non-streaming TTS adapter.
pub struct OpenAiTtsAdapter {
    config: OpenAiTtsConfig,
    client: reqwest::Client,
    body_builder: BodyBuilder,
}

impl OpenAiTtsAdapter {
    /// Construct an adapter from its config, HTTP client, and body builder.
    #[must_use]
    pub fn new(config: OpenAiTtsConfig, client: reqwest::Client, body_builder: BodyBuilder) -> Self {
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
impl Adapter for OpenAiTtsAdapter {
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
impl StreamingAdapter for OpenAiTtsAdapter {
    /// The unary-to-stream bridge (§4.6): emit `start`, call the underlying
    /// synthesis request once, then emit `final` or `error`.
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
        if self.config.endpoint.trim().is_empty() {
            let outcome = Outcome {
                class: OutcomeClass::Blocked,
                retryable: false,
                reason: Some(rspp_core::reason::PROVIDER_ENDPOINT_MISSING.to_string()),
                circuit_open: false,
                backoff_ms: 0,
                captured_input: None,
                captured_output: None,
                output_status_code: 0,
                payload_truncated: false,
            };
            emit_error_chunk(
                observer,
                identity,
                0,
                rspp_core::reason::PROVIDER_ENDPOINT_MISSING,
            )
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

        let audio = match response.bytes().await {
            Ok(bytes) => bytes.to_vec(),
            Err(_) => {
                let outcome = transport_error();
                emit_error_chunk(observer, identity, 1, PROVIDER_STREAM_HTTP_ERROR).await?;
                return Ok(outcome);
            }
        };

        if audio.is_empty() {
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
            emit_error_chunk(observer, identity, 1, PROVIDER_EMPTY_AUDIO).await?;
            return Ok(outcome);
        }

        let output_capture = capture_payload(&audio, false, self.config.capture);
        let mut metadata = HashMap::new();
        metadata.insert("mime_type".to_string(), self.config.mime_type.clone());
        metadata.insert("audio_bytes".to_string(), STANDARD.encode(&audio));
        let final_chunk = StreamChunk {
            identity,
            sequence: 1,
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
                provider_id: "openai-tts".into(),
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

    fn config(endpoint: String) -> OpenAiTtsConfig {
        OpenAiTtsConfig {
            provider_id: "openai-tts".to_string(),
            endpoint,
            api_key_placement: ApiKeyPlacement::Header {
                name: "authorization".to_string(),
                prefix: Some("Bearer ".to_string()),
            },
            api_key_value: "test-key".to_string(),
            mime_type: "audio/mpeg".to_string(),
            timeout: Duration::from_secs(5),
            capture: CaptureConfig::default(),
        }
    }

    #[tokio::test]
    async fn synthesizes_audio_into_success_outcome() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/speech");
                then.status(200).body(vec![1_u8, 2, 3, 4]);
            })
            .await;

        let adapter = OpenAiTtsAdapter::new(
            config(server.url("/speech")),
            reqwest::Client::new(),
            std::sync::Arc::new(|_req| Ok(json!({"input": "hi"}))),
        );
        let mut observer = CollectingObserver::default();
        let outcome = adapter.invoke_stream(&request(), &mut observer).await.unwrap();

        mock.assert_async().await;
        assert_eq!(outcome.class, OutcomeClass::Success);
    }

    #[tokio::test]
    async fn blank_endpoint_is_blocked_without_a_call() {
        let adapter = OpenAiTtsAdapter::new(
            config(String::new()),
            reqwest::Client::new(),
            std::sync::Arc::new(|_req| Ok(json!({}))),
        );
        let mut observer = CollectingObserver::default();
        let outcome = adapter.invoke_stream(&request(), &mut observer).await.unwrap();
        assert_eq!(outcome.class, OutcomeClass::Blocked);
        assert!(!outcome.retryable);
    }

    #[tokio::test]
    async fn empty_audio_body_is_an_infrastructure_failure() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/speech");
                then.status(200).body("");
            })
            .await;

        let adapter = OpenAiTtsAdapter::new(
            config(server.url("/speech")),
            reqwest::Client::new(),
            std::sync::Arc::new(|_req| Ok(json!({}))),
        );
        let mut observer = CollectingObserver::default();
        let outcome = adapter.invoke_stream(&request(), &mut observer).await.unwrap();

        mock.assert_async().await;
        assert_eq!(outcome.class, OutcomeClass::InfrastructureFailure);
    }
}
