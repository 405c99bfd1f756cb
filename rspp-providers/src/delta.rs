//! Text-delta extraction shared by the SSE-based LLM translators (§4.8).
//!
//! Different providers nest the delta text at different paths in their JSON
//! payload; this tries each path in a fixed order and takes the first
//! non-empty match.

use serde_json::Value;

/// Data line value that signals the end of an SSE text stream.
pub const DONE_MARKER: &str = "[DONE]";

fn non_empty_str(v: &Value) -> Option<&str> {
    v.as_str().filter(|s| !s.is_empty())
}

/// Extract the next text delta from one SSE event's JSON payload, trying
/// each known provider shape in turn.
#[must_use]
pub fn extract_text_delta(payload: &Value) -> Option<&str> {
    if let Some(s) = payload
        .pointer("/candidates/0/content/parts/0/text")
        .and_then(non_empty_str)
    {
        return Some(s);
    }
    if let Some(s) = payload
        .pointer("/choices/0/delta/content")
        .and_then(non_empty_str)
    {
        return Some(s);
    }
    if let Some(s) = payload
        .pointer("/choices/0/message/content")
        .and_then(non_empty_str)
    {
        return Some(s);
    }
    if let Some(s) = payload.pointer("/choices/0/text").and_then(non_empty_str) {
        return Some(s);
    }
    if let Some(s) = payload.pointer("/delta/text").and_then(non_empty_str) {
        return Some(s);
    }
    if let Some(s) = payload
        .pointer("/delta/message/content/text")
        .and_then(non_empty_str)
    {
        return Some(s);
    }
    if payload.get("type").and_then(Value::as_str) == Some("content_block_delta") {
        if let Some(s) = payload.pointer("/delta/text").and_then(non_empty_str) {
            return Some(s);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn prefers_gemini_shape_first() {
        let payload = json!({
            "candidates": [{"content": {"parts": [{"text": "hello"}]}}]
        });
        assert_eq!(extract_text_delta(&payload), Some("hello"));
    }

    #[test]
    fn falls_back_to_openai_chat_delta() {
        let payload = json!({"choices": [{"delta": {"content": "hi"}}]});
        assert_eq!(extract_text_delta(&payload), Some("hi"));
    }

    #[test]
    fn falls_back_to_anthropic_content_block_delta() {
        let payload = json!({"type": "content_block_delta", "delta": {"text": "world"}});
        assert_eq!(extract_text_delta(&payload), Some("world"));
    }

    #[test]
    fn empty_strings_are_not_matches() {
        let payload = json!({"choices": [{"delta": {"content": ""}}]});
        assert_eq!(extract_text_delta(&payload), None);
    }

    #[test]
    fn unmatched_shape_returns_none() {
        let payload = json!({"unrelated": true});
        assert_eq!(extract_text_delta(&payload), None);
    }
}
