//! Concrete large-language-model stream translators (§4.8).

/// Gemini-shaped constructor (`candidates[0].content.parts[0].text`).
pub mod gemini;
/// OpenAI-chat-shaped constructor (`choices[0].delta.content`).
pub mod openai_chat;
/// The generic JSON-body SSE text-streaming adapter both constructors build.
pub mod sse_adapter;

pub use sse_adapter::{LlmSseAdapter, LlmSseConfig};
