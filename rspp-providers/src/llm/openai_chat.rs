//! Constructor for an openai-chat-shaped SSE streaming LLM adapter: deltas
//! arrive at `choices[0].delta.content` (§4.8).

use std::time::Duration;

use reqwest::Method;
use rspp_types::CaptureConfig;

use crate::http_adapter::{ApiKeyPlacement, BodyBuilder};
use crate::llm::sse_adapter::{LlmSseAdapter, LlmSseConfig};

/// Default chat-completions endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";

/// Build an openai-chat-shaped [`LlmSseAdapter`].
///
/// `api_key_value` is injected as `authorization: Bearer <key>`, matching the
/// provider's documented auth scheme; `body_builder` supplies the JSON body
/// (model, messages, and `"stream": true`).
#[must_use]
pub fn adapter(
    provider_id: impl Into<String>,
    endpoint: impl Into<String>,
    api_key_value: impl Into<String>,
    client: reqwest::Client,
    body_builder: BodyBuilder,
) -> LlmSseAdapter {
    let config = LlmSseConfig {
        provider_id: provider_id.into(),
        endpoint: endpoint.into(),
        method: Method::POST,
        api_key_placement: ApiKeyPlacement::Header {
            name: "authorization".to_string(),
            prefix: Some("Bearer ".to_string()),
        },
        api_key_value: api_key_value.into(),
        extra_headers: Vec::new(),
        timeout: Duration::from_secs(10),
        capture: CaptureConfig::default(),
    };
    LlmSseAdapter::new(config, client, body_builder)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rspp_core::Adapter;
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn wires_bearer_auth_and_provider_id() {
        let adapter = adapter(
            "openai-chat",
            DEFAULT_ENDPOINT,
            "sk-test",
            reqwest::Client::new(),
            Arc::new(|_req| Ok(json!({"stream": true}))) as BodyBuilder,
        );
        assert_eq!(adapter.provider_id(), "openai-chat");
        assert_eq!(adapter.modality(), rspp_types::Modality::Llm);
    }
}
