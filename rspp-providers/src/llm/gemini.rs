//! Constructor for a gemini-shaped SSE streaming LLM adapter: deltas arrive
//! at `candidates[0].content.parts[0].text` (§4.8).
//!
//! The streaming variant swaps the base `:generateContent` endpoint for
//! `:streamGenerateContent` with `alt=sse` appended as a query parameter.

use std::time::Duration;

use reqwest::Method;
use rspp_types::CaptureConfig;

use crate::http_adapter::{ApiKeyPlacement, BodyBuilder};
use crate::llm::sse_adapter::{LlmSseAdapter, LlmSseConfig};

/// Append `:streamGenerateContent?alt=sse` in place of a `:generateContent` suffix.
///
/// Falls back to appending the suffix directly if the base endpoint doesn't
/// carry the expected `:generateContent` marker.
#[must_use]
pub fn streaming_endpoint(base_endpoint: &str) -> String {
    if let Some(prefix) = base_endpoint.strip_suffix(":generateContent") {
        format!("{prefix}:streamGenerateContent?alt=sse")
    } else {
        format!("{base_endpoint}:streamGenerateContent?alt=sse")
    }
}

/// Build a gemini-shaped [`LlmSseAdapter`].
///
/// `api_key_value` is injected as the `key` query parameter, matching the
/// provider's documented auth scheme; `body_builder` supplies the JSON body
/// (`contents`, generation config, etc).
#[must_use]
pub fn adapter(
    provider_id: impl Into<String>,
    base_endpoint: &str,
    api_key_value: impl Into<String>,
    client: reqwest::Client,
    body_builder: BodyBuilder,
) -> LlmSseAdapter {
    let config = LlmSseConfig {
        provider_id: provider_id.into(),
        endpoint: streaming_endpoint(base_endpoint),
        method: Method::POST,
        api_key_placement: ApiKeyPlacement::Query {
            param: "key".to_string(),
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

    #[test]
    fn swaps_generate_content_suffix() {
        let url = "https://generativelanguage.googleapis.com/v1/models/gemini-pro:generateContent";
        assert_eq!(
            streaming_endpoint(url),
            "https://generativelanguage.googleapis.com/v1/models/gemini-pro:streamGenerateContent?alt=sse"
        );
    }
}
