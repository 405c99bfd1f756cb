//! Generic request/response adapter template (§4.6): build/send/normalize one
//! provider attempt for any JSON-request provider, with a default
//! unary-to-stream bridge for providers that don't stream natively.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use rspp_core::reason::{
    PROVIDER_AUTH_OR_POLICY_BLOCK, PROVIDER_CANCELLED, PROVIDER_CLIENT_ERROR,
    PROVIDER_ENDPOINT_MISSING, PROVIDER_OVERLOAD, PROVIDER_SERVER_ERROR, PROVIDER_TIMEOUT,
    PROVIDER_TRANSPORT_ERROR,
};
use rspp_core::{
    capture_payload, Adapter, InvocationRequest, Outcome, OutcomeClass, RequestIdentity,
    StreamChunk, StreamChunkKind, StreamObserver, StreamingAdapter,
};
use rspp_types::{CaptureConfig, Modality, RsppError};
use serde_json::Value;

/// Default request timeout when a config doesn't override it.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
/// Default overload backoff when the provider supplies no usable `Retry-After`.
pub const DEFAULT_OVERLOAD_BACKOFF_MS: u64 = 500;

/// Where the provider API key is injected into the outgoing request.
#[derive(Debug, Clone)]
pub enum ApiKeyPlacement {
    /// Set a header, optionally prefixed (e.g. `"Bearer "`).
    Header {
        /// Header name, e.g. `"authorization"`.
        name: String,
        /// Value prefix, prepended to the key before the header is set.
        prefix: Option<String>,
    },
    /// Append the key as a query parameter.
    Query {
        /// Query parameter name, e.g. `"api_key"`.
        param: String,
    },
}

/// Builds the JSON request body for one attempt from its [`InvocationRequest`].
///
/// Captures whatever provider-specific payload (text to transcribe, messages,
/// audio reference, etc.) the caller's adapter wiring holds; `InvocationRequest`
/// itself only carries identity and control-plane fields.
pub type BodyBuilder = Arc<dyn Fn(&InvocationRequest) -> Result<Value, RsppError> + Send + Sync>;

/// Static, per-adapter configuration.
#[derive(Clone)]
pub struct HttpAdapterConfig {
    /// Stable provider id, unique within its modality.
    pub provider_id: String,
    /// The modality this adapter serves.
    pub modality: Modality,
    /// Full request URL. Empty disables the adapter (§4.6).
    pub endpoint: String,
    /// HTTP method; most providers use `POST`.
    pub method: Method,
    /// Where to inject the resolved API key.
    pub api_key_placement: ApiKeyPlacement,
    /// The resolved (already-looked-up) API key value.
    pub api_key_value: String,
    /// Additional static headers sent with every request.
    pub extra_headers: Vec<(String, String)>,
    /// Request timeout.
    pub timeout: Duration,
    /// Payload capture configuration.
    pub capture: CaptureConfig,
}

impl HttpAdapterConfig {
    /// Construct a config with the library defaults (`POST`, 10s timeout, no
    /// extra headers) for the common case.
    #[must_use]
    pub fn new(
        provider_id: impl Into<String>,
        modality: Modality,
        endpoint: impl Into<String>,
        api_key_placement: ApiKeyPlacement,
        api_key_value: impl Into<String>,
    ) -> Self {
        Self {
            provider_id: provider_id.into(),
            modality,
            endpoint: endpoint.into(),
            method: Method::POST,
            api_key_placement,
            api_key_value: api_key_value.into(),
            extra_headers: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
            capture: CaptureConfig::default(),
        }
    }
}

/// The reusable request/response adapter (§4.6).
///
/// Implements [`StreamingAdapter`] unconditionally via the unary-to-stream
/// bridge, so any provider wired through this adapter satisfies the
/// streaming surface even without native stream support.
pub struct HttpAdapter {
    config: HttpAdapterConfig,
    client: reqwest::Client,
    body_builder: BodyBuilder,
}

impl HttpAdapter {
    /// Construct an adapter from its static config, HTTP client, and body builder.
    #[must_use]
    pub fn new(config: HttpAdapterConfig, client: reqwest::Client, body_builder: BodyBuilder) -> Self {
        Self {
            config,
            client,
            body_builder,
        }
    }

    fn cancelled_outcome() -> Outcome {
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

    fn blocked_outcome(reason: &str) -> Outcome {
        Outcome {
            class: OutcomeClass::Blocked,
            retryable: false,
            reason: Some(reason.to_string()),
            circuit_open: false,
            backoff_ms: 0,
            captured_input: None,
            captured_output: None,
            output_status_code: 0,
            payload_truncated: false,
        }
    }

    fn timeout_outcome() -> Outcome {
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

    fn transport_error_outcome() -> Outcome {
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

    async fn send(&self, body: &Value) -> reqwest::Result<reqwest::Response> {
        let mut builder = self
            .client
            .request(self.config.method.clone(), &self.config.endpoint)
            .json(body);
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
        for (name, value) in &self.config.extra_headers {
            builder = builder.header(name, value);
        }
        builder.send().await
    }
}

/// Map an HTTP status and its headers to the normalized outcome shape,
/// per the §4.6 status table. Returns `(class, retryable, reason, circuit_open, backoff_ms)`.
#[must_use]
pub fn map_status(
    status: StatusCode,
    retry_after: Option<&str>,
) -> (OutcomeClass, bool, Option<&'static str>, bool, u64) {
    if status.is_success() {
        return (OutcomeClass::Success, false, None, false, 0);
    }
    match status.as_u16() {
        408 | 504 => (OutcomeClass::Timeout, true, Some(PROVIDER_TIMEOUT), false, 0),
        429 => {
            let backoff_ms = parse_retry_after_ms(retry_after);
            (OutcomeClass::Overload, true, Some(PROVIDER_OVERLOAD), true, backoff_ms)
        }
        401 | 403 => (
            OutcomeClass::Blocked,
            false,
            Some(PROVIDER_AUTH_OR_POLICY_BLOCK),
            false,
            0,
        ),
        400..=499 => (OutcomeClass::Blocked, false, Some(PROVIDER_CLIENT_ERROR), false, 0),
        _ => (
            OutcomeClass::InfrastructureFailure,
            true,
            Some(PROVIDER_SERVER_ERROR),
            true,
            0,
        ),
    }
}

/// Parse a `Retry-After` header value per §4.6: trimmed, integer seconds `>= 1`,
/// converted to milliseconds; anything else falls back to the default backoff.
#[must_use]
pub fn parse_retry_after_ms(retry_after: Option<&str>) -> u64 {
    retry_after
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|secs| *secs >= 1)
        .map_or(DEFAULT_OVERLOAD_BACKOFF_MS, |secs| secs * 1000)
}

#[async_trait]
impl Adapter for HttpAdapter {
    fn provider_id(&self) -> &str {
        &self.config.provider_id
    }

    fn modality(&self) -> Modality {
        self.config.modality
    }

    async fn invoke(&self, request: &InvocationRequest) -> Result<Outcome, RsppError> {
        request.validate()?;
        if request.cancel_requested {
            return Ok(Self::cancelled_outcome());
        }
        if self.config.endpoint.trim().is_empty() {
            return Ok(Self::blocked_outcome(PROVIDER_ENDPOINT_MISSING));
        }

        let body = (self.body_builder)(request)?;
        let body_bytes =
            serde_json::to_vec(&body).map_err(|e| RsppError::InvalidRequest(e.to_string()))?;
        let input_capture = capture_payload(&body_bytes, false, self.config.capture);

        let response = match tokio::time::timeout(self.config.timeout, self.send(&body)).await {
            Err(_) => return Ok(Self::timeout_outcome()),
            Ok(Err(e)) => {
                if e.is_timeout() {
                    return Ok(Self::timeout_outcome());
                }
                return Ok(Self::transport_error_outcome());
            }
            Ok(Ok(response)) => response,
        };

        let status = response.status();
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body_text = response.text().await.unwrap_or_default();
        let output_capture = capture_payload(body_text.as_bytes(), false, self.config.capture);

        let (class, retryable, reason, circuit_open, backoff_ms) =
            map_status(status, retry_after.as_deref());

        Ok(Outcome {
            class,
            retryable,
            reason: reason.map(str::to_string),
            circuit_open,
            backoff_ms,
            captured_input: Some(input_capture.text),
            captured_output: Some(output_capture.text),
            output_status_code: u32::from(status.as_u16()),
            payload_truncated: input_capture.truncated || output_capture.truncated,
        })
    }

    fn as_streaming(&self) -> Option<&dyn StreamingAdapter> {
        Some(self)
    }
}

#[async_trait]
impl StreamingAdapter for HttpAdapter {
    async fn invoke_stream(
        &self,
        request: &InvocationRequest,
        observer: &mut dyn StreamObserver,
    ) -> Result<Outcome, RsppError> {
        let identity = request.identity.clone();
        let start = start_chunk(identity.clone());
        observer.on_start(&start).await?;

        let outcome = self.invoke(request).await?;
        if outcome.class == OutcomeClass::Success {
            let chunk = StreamChunk {
                identity,
                sequence: 1,
                kind: StreamChunkKind::Final,
                text_delta: None,
                text_final: outcome.captured_output.clone(),
                audio_bytes: None,
                mime_type: None,
                metadata: None,
                error_reason: None,
            };
            observer.on_complete(&chunk).await?;
        } else {
            let chunk = StreamChunk {
                identity,
                sequence: 1,
                kind: StreamChunkKind::Error,
                text_delta: None,
                text_final: None,
                audio_bytes: None,
                mime_type: None,
                metadata: None,
                error_reason: outcome.reason.clone(),
            };
            observer.on_error(&chunk).await?;
        }
        Ok(outcome)
    }
}

/// Build the sequence-0 `start` chunk shared by every streaming translator.
#[must_use]
pub fn start_chunk(identity: RequestIdentity) -> StreamChunk {
    StreamChunk {
        identity,
        sequence: 0,
        kind: StreamChunkKind::Start,
        text_delta: None,
        text_final: None,
        audio_bytes: None,
        mime_type: None,
        metadata: None,
        error_reason: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_after_parses_positive_integer_seconds() {
        assert_eq!(parse_retry_after_ms(Some("3")), 3000);
    }

    #[test]
    fn retry_after_falls_back_on_garbage() {
        assert_eq!(parse_retry_after_ms(Some("not-a-number")), DEFAULT_OVERLOAD_BACKOFF_MS);
        assert_eq!(parse_retry_after_ms(Some("0")), DEFAULT_OVERLOAD_BACKOFF_MS);
        assert_eq!(parse_retry_after_ms(None), DEFAULT_OVERLOAD_BACKOFF_MS);
    }

    #[test]
    fn status_mapping_matches_table() {
        assert_eq!(map_status(StatusCode::OK, None).0, OutcomeClass::Success);
        assert_eq!(map_status(StatusCode::REQUEST_TIMEOUT, None).0, OutcomeClass::Timeout);
        let (class, retryable, _, circuit_open, backoff) =
            map_status(StatusCode::TOO_MANY_REQUESTS, Some("3"));
        assert_eq!(class, OutcomeClass::Overload);
        assert!(retryable);
        assert!(circuit_open);
        assert_eq!(backoff, 3000);
        assert_eq!(map_status(StatusCode::UNAUTHORIZED, None).0, OutcomeClass::Blocked);
        assert_eq!(map_status(StatusCode::BAD_GATEWAY, None).0, OutcomeClass::InfrastructureFailure);
    }
}
