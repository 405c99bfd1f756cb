//! AssemblyAI-shaped async-poll STT translator (§4.8): submit a transcription
//! job with `POST`, then poll a `GET` endpoint until a terminal status.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use rspp_core::reason::{
    PROVIDER_STREAM_HTTP_ERROR, PROVIDER_TRANSCRIPTION_FAILED, PROVIDER_TRANSCRIPT_ID_MISSING,
};
use rspp_core::{
    capture_payload, clamp_poll_interval_ms, jitter_wait, Adapter, InvocationRequest, Outcome,
    OutcomeClass, StreamChunk, StreamChunkKind, StreamObserver, StreamingAdapter,
};
use rspp_types::{CaptureConfig, Modality, RsppError};
use serde_json::Value;
use tokio::time::Instant;

use crate::http_adapter::{map_status, start_chunk, ApiKeyPlacement, BodyBuilder};
use crate::outcomes::{cancelled, emit_error_chunk, timeout, transport_error};

/// Minimum poll interval, per §4.8.
pub const MIN_POLL_INTERVAL_MS: u64 = 200;
/// Maximum poll interval, per §4.8.
pub const MAX_POLL_INTERVAL_MS: u64 = 5000;
/// Default poll interval, per §4.8.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1200;

/// Static configuration for an AssemblyAI-shaped async-poll adapter.
#[derive(Clone)]
pub struct AssemblyAiConfig {
    /// Stable provider id.
    pub provider_id: String,
    /// Job submission endpoint (`POST`).
    pub submit_endpoint: String,
    /// Poll endpoint, with `{id}` replaced by the submitted job id (`GET`).
    pub poll_endpoint_template: String,
    /// Where to inject the resolved API key.
    pub api_key_placement: ApiKeyPlacement,
    /// The resolved API key value.
    pub api_key_value: String,
    /// Requested poll interval; clamped into `[200ms, 5000ms]`.
    pub poll_interval_ms: u64,
    /// Overall deadline across submission and every poll.
    pub timeout: Duration,
    /// Payload capture configuration.
    pub capture: CaptureConfig,
}

impl AssemblyAiConfig {
    fn clamped_poll_interval_ms(&self) -> u64 {
        clamp_poll_interval_ms(self.poll_interval_ms, MIN_POLL_INTERVAL_MS, MAX_POLL_INTERVAL_MS)
    }
}

/// The AssemblyAI-shaped async-poll STT adapter.
pub struct AssemblyAiAdapter {
    config: AssemblyAiConfig,
    client: reqwest::Client,
    body_builder: BodyBuilder,
}

impl AssemblyAiAdapter {
    /// Construct an adapter from its config, HTTP client, and body builder.
    #[must_use]
    pub fn new(config: AssemblyAiConfig, client: reqwest::Client, body_builder: BodyBuilder) -> Self {
        Self {
            config,
            client,
            body_builder,
        }
    }

    fn apply_key(&self, mut builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
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
        builder
    }

    fn poll_url(&self, job_id: &str) -> String {
        self.config.poll_endpoint_template.replace("{id}", job_id)
    }
}

#[async_trait]
impl Adapter for AssemblyAiAdapter {
    fn provider_id(&self) -> &str {
        &self.config.provider_id
    }

    fn modality(&self) -> Modality {
        Modality::Stt
    }

    async fn invoke(&self, request: &InvocationRequest) -> Result<Outcome, RsppError> {
        let mut observer = crate::collect::CollectingObserver::default();
        self.invoke_stream(request, &mut observer).await
    }

    fn as_streaming(&self) -> Option<&dyn StreamingAdapter> {
        Some(self)
    }
}

#[async_trait]
impl StreamingAdapter for AssemblyAiAdapter {
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

        let deadline = Instant::now() + self.config.timeout;

        let body = (self.body_builder)(request)?;
        let body_bytes =
            serde_json::to_vec(&body).map_err(|e| RsppError::InvalidRequest(e.to_string()))?;
        let input_capture = capture_payload(&body_bytes, false, self.config.capture);

        let submit = self.apply_key(self.client.post(&self.config.submit_endpoint).json(&body));
        let response = match tokio::time::timeout_at(deadline, submit.send()).await {
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

        let submit_body: Value = match response.json().await {
            Ok(v) => v,
            Err(_) => {
                let outcome = transport_error();
                emit_error_chunk(observer, identity, 1, PROVIDER_STREAM_HTTP_ERROR).await?;
                return Ok(outcome);
            }
        };
        let job_id = submit_body
            .get("id")
            .or_else(|| submit_body.get("transcript_id"))
            .and_then(Value::as_str)
            .map(str::to_string);
        let Some(job_id) = job_id else {
            let outcome = Outcome {
                class: OutcomeClass::InfrastructureFailure,
                retryable: true,
                reason: Some(PROVIDER_TRANSCRIPT_ID_MISSING.to_string()),
                circuit_open: false,
                backoff_ms: 0,
                captured_input: Some(input_capture.text),
                captured_output: Some(submit_body.to_string()),
                output_status_code: u32::from(status.as_u16()),
                payload_truncated: input_capture.truncated,
            };
            emit_error_chunk(observer, identity, 1, PROVIDER_TRANSCRIPT_ID_MISSING).await?;
            return Ok(outcome);
        };

        let poll_interval =
            Duration::from_millis(jitter_wait(self.config.clamped_poll_interval_ms(), 10));
        let mut sequence: u64 = 1;

        loop {
            if Instant::now() >= deadline {
                let outcome = timeout();
                emit_error_chunk(observer, identity, sequence + 1, PROVIDER_STREAM_HTTP_ERROR)
                    .await?;
                return Ok(outcome);
            }
            tokio::time::sleep(poll_interval).await;

            let poll_response =
                match tokio::time::timeout_at(deadline, self.apply_key(self.client.get(self.poll_url(&job_id))).send()).await {
                    Err(_) | Ok(Err(_)) => {
                        let outcome = timeout();
                        emit_error_chunk(observer, identity, sequence + 1, PROVIDER_STREAM_HTTP_ERROR)
                            .await?;
                        return Ok(outcome);
                    }
                    Ok(Ok(r)) => r,
                };
            let poll_json: Value = match poll_response.json().await {
                Ok(v) => v,
                Err(_) => {
                    let outcome = transport_error();
                    emit_error_chunk(observer, identity, sequence + 1, PROVIDER_STREAM_HTTP_ERROR)
                        .await?;
                    return Ok(outcome);
                }
            };
            let job_status = poll_json
                .get("status")
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_string();

            sequence += 1;
            let mut metadata = HashMap::new();
            metadata.insert("status".to_string(), job_status.clone());
            let metadata_chunk = StreamChunk {
                identity: identity.clone(),
                sequence,
                kind: StreamChunkKind::Metadata,
                text_delta: None,
                text_final: None,
                audio_bytes: None,
                mime_type: None,
                metadata: Some(metadata),
                error_reason: None,
            };
            observer.on_chunk(&metadata_chunk).await?;

            match job_status.as_str() {
                "completed" => {
                    let text = poll_json
                        .get("text")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string();
                    let output_capture = capture_payload(text.as_bytes(), false, self.config.capture);
                    let final_chunk = StreamChunk {
                        identity: identity.clone(),
                        sequence: sequence + 1,
                        kind: StreamChunkKind::Final,
                        text_delta: None,
                        text_final: Some(text),
                        audio_bytes: None,
                        mime_type: None,
                        metadata: None,
                        error_reason: None,
                    };
                    observer.on_complete(&final_chunk).await?;
                    return Ok(Outcome {
                        class: OutcomeClass::Success,
                        retryable: false,
                        reason: None,
                        circuit_open: false,
                        backoff_ms: 0,
                        captured_input: Some(input_capture.text),
                        captured_output: Some(output_capture.text),
                        output_status_code: u32::from(status.as_u16()),
                        payload_truncated: input_capture.truncated || output_capture.truncated,
                    });
                }
                "error" | "failed" => {
                    let provider_reason = poll_json
                        .get("error")
                        .and_then(Value::as_str)
                        .unwrap_or(PROVIDER_TRANSCRIPTION_FAILED)
                        .to_string();
                    emit_error_chunk(observer, identity, sequence + 1, PROVIDER_TRANSCRIPTION_FAILED)
                        .await?;
                    return Ok(Outcome {
                        class: OutcomeClass::Blocked,
                        retryable: false,
                        reason: Some(PROVIDER_TRANSCRIPTION_FAILED.to_string()),
                        circuit_open: false,
                        backoff_ms: 0,
                        captured_input: Some(input_capture.text),
                        captured_output: Some(provider_reason),
                        output_status_code: u32::from(status.as_u16()),
                        payload_truncated: input_capture.truncated,
                    });
                }
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::Method::{GET, POST};
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
                provider_id: "assemblyai".into(),
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

    fn config(submit_endpoint: String, poll_endpoint_template: String) -> AssemblyAiConfig {
        AssemblyAiConfig {
            provider_id: "assemblyai".to_string(),
            submit_endpoint,
            poll_endpoint_template,
            api_key_placement: ApiKeyPlacement::Header {
                name: "authorization".to_string(),
                prefix: None,
            },
            api_key_value: "test-key".to_string(),
            poll_interval_ms: MIN_POLL_INTERVAL_MS,
            timeout: Duration::from_secs(5),
            capture: CaptureConfig::default(),
        }
    }

    #[tokio::test]
    async fn polls_until_completed_and_returns_transcript() {
        let server = MockServer::start_async().await;
        let submit_mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/transcript");
                then.status(200).json_body(json!({"id": "job-1"}));
            })
            .await;
        let poll_mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/transcript/job-1");
                then.status(200)
                    .json_body(json!({"status": "completed", "text": "the weather is nice"}));
            })
            .await;

        let adapter = AssemblyAiAdapter::new(
            config(server.url("/transcript"), server.url("/transcript/{id}")),
            reqwest::Client::new(),
            std::sync::Arc::new(|_req| Ok(json!({"audio_url": "https://example.invalid/a.wav"}))),
        );
        let mut observer = crate::collect::CollectingObserver::default();
        let outcome = adapter.invoke_stream(&request(), &mut observer).await.unwrap();

        submit_mock.assert_async().await;
        poll_mock.assert_async().await;
        assert_eq!(outcome.class, OutcomeClass::Success);
        assert_eq!(observer.text, "the weather is nice");
    }

    #[tokio::test]
    async fn missing_transcript_id_is_an_infrastructure_failure() {
        let server = MockServer::start_async().await;
        let submit_mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/transcript");
                then.status(200).json_body(json!({"no_id_here": true}));
            })
            .await;

        let adapter = AssemblyAiAdapter::new(
            config(server.url("/transcript"), server.url("/transcript/{id}")),
            reqwest::Client::new(),
            std::sync::Arc::new(|_req| Ok(json!({}))),
        );
        let mut observer = crate::collect::CollectingObserver::default();
        let outcome = adapter.invoke_stream(&request(), &mut observer).await.unwrap();

        submit_mock.assert_async().await;
        assert_eq!(outcome.class, OutcomeClass::InfrastructureFailure);
        assert!(outcome.retryable);
    }

    #[tokio::test]
    async fn failed_job_status_yields_blocked_outcome() {
        let server = MockServer::start_async().await;
        let submit_mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/transcript");
                then.status(200).json_body(json!({"id": "job-2"}));
            })
            .await;
        let poll_mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/transcript/job-2");
                then.status(200)
                    .json_body(json!({"status": "error", "error": "bad audio"}));
            })
            .await;

        let adapter = AssemblyAiAdapter::new(
            config(server.url("/transcript"), server.url("/transcript/{id}")),
            reqwest::Client::new(),
            std::sync::Arc::new(|_req| Ok(json!({}))),
        );
        let mut observer = crate::collect::CollectingObserver::default();
        let outcome = adapter.invoke_stream(&request(), &mut observer).await.unwrap();

        submit_mock.assert_async().await;
        poll_mock.assert_async().await;
        assert_eq!(outcome.class, OutcomeClass::Blocked);
        assert!(!outcome.retryable);
    }
}
