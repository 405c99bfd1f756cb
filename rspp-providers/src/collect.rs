//! A [`StreamObserver`] that buffers chunks, used to answer [`Adapter::invoke`]
//! for translators whose native shape is streaming (§4.8: "wraps §4.6").

use async_trait::async_trait;
use rspp_core::{StreamChunk, StreamChunkKind, StreamObserver};
use rspp_types::RsppError;

/// Accumulates text deltas and audio bytes from a streaming invocation.
#[derive(Debug, Default)]
pub struct CollectingObserver {
    /// Concatenation of every `Delta` chunk's text, in arrival order.
    pub text: String,
    /// Concatenation of every `Audio` chunk's bytes, in arrival order.
    pub audio: Vec<u8>,
    /// Mime type carried by the first `Audio` chunk seen, if any.
    pub mime_type: Option<String>,
}

#[async_trait]
impl StreamObserver for CollectingObserver {
    async fn on_start(&mut self, _chunk: &StreamChunk) -> Result<(), RsppError> {
        Ok(())
    }

    async fn on_chunk(&mut self, chunk: &StreamChunk) -> Result<(), RsppError> {
        match chunk.kind {
            StreamChunkKind::Delta => {
                if let Some(delta) = &chunk.text_delta {
                    self.text.push_str(delta);
                }
            }
            StreamChunkKind::Audio => {
                if let Some(bytes) = &chunk.audio_bytes {
                    self.audio.extend_from_slice(bytes);
                }
                if self.mime_type.is_none() {
                    self.mime_type = chunk.mime_type.clone();
                }
            }
            StreamChunkKind::Start
            | StreamChunkKind::Final
            | StreamChunkKind::Metadata
            | StreamChunkKind::Error => {}
        }
        Ok(())
    }

    async fn on_complete(&mut self, _chunk: &StreamChunk) -> Result<(), RsppError> {
        Ok(())
    }

    async fn on_error(&mut self, _chunk: &StreamChunk) -> Result<(), RsppError> {
        Ok(())
    }
}
