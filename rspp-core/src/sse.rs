//! Server-sent-event line framing (§4.7).
//!
//! A minimal, from-scratch line reader: no dependency on any SSE crate,
//! since the parsing rules here (blank-line boundaries, `:`-comments,
//! `event:`/`data:` fields only, a hard per-line byte cap) are narrower than
//! the general spec and easier to drive directly than to adapt a general one.

use async_trait::async_trait;
use rspp_types::RsppError;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Default per-line byte cap; callers may raise it but never below 512 KiB.
pub const MIN_MAX_LINE_BYTES: usize = 512 * 1024;

/// One complete `{event, data}` record assembled at a blank-line boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseRecord {
    /// The most recent `event:` field seen before this record, if any.
    pub event: Option<String>,
    /// Accumulated `data:` lines, joined by `\n`.
    pub data: String,
}

/// Sink invoked once per complete SSE record. Any error aborts the read loop
/// and is propagated to the caller of [`parse_sse`].
#[async_trait]
pub trait SseSink {
    /// Handle one assembled record.
    async fn accept(&mut self, record: SseRecord) -> Result<(), RsppError>;
}

#[async_trait]
impl<F> SseSink for F
where
    F: FnMut(SseRecord) -> Result<(), RsppError> + Send,
{
    async fn accept(&mut self, record: SseRecord) -> Result<(), RsppError> {
        (self)(record)
    }
}

/// Incremental, allocation-light record assembler driven one line at a time.
#[derive(Debug, Default)]
struct SseAssembler {
    event: Option<String>,
    data_lines: Vec<String>,
}

impl SseAssembler {
    fn feed_line(&mut self, line: &str) -> Option<SseRecord> {
        if line.is_empty() {
            if self.event.is_none() && self.data_lines.is_empty() {
                return None;
            }
            let record = SseRecord {
                event: self.event.take(),
                data: self.data_lines.join("\n"),
            };
            self.data_lines.clear();
            return Some(record);
        }
        if line.starts_with(':') {
            return None;
        }
        if let Some(rest) = line.strip_prefix("event:") {
            self.event = Some(rest.trim_start().to_string());
            return None;
        }
        if let Some(rest) = line.strip_prefix("data:") {
            self.data_lines.push(rest.trim_start().to_string());
        }
        // Other fields are ignored.
        None
    }
}

/// Read `reader` to completion, assembling SSE records and handing each one
/// to `sink` as soon as a blank-line boundary closes it.
///
/// Enforces `max_line_bytes` (floored at [`MIN_MAX_LINE_BYTES`]) against the
/// accumulated bytes of a single line, independent of how the underlying
/// transport chunks the stream: a line is never buffered past the cap.
pub async fn parse_sse<R, S>(
    mut reader: R,
    max_line_bytes: usize,
    sink: &mut S,
) -> Result<(), RsppError>
where
    R: AsyncRead + Unpin,
    S: SseSink,
{
    let max_line_bytes = max_line_bytes.max(MIN_MAX_LINE_BYTES);
    let mut assembler = SseAssembler::default();
    let mut line_buf: Vec<u8> = Vec::new();
    let mut chunk = [0_u8; 8192];

    loop {
        let n = reader
            .read(&mut chunk)
            .await
            .map_err(|e| RsppError::InvalidStreamChunk(format!("SSE read error: {e}")))?;
        if n == 0 {
            break;
        }
        for &byte in &chunk[..n] {
            if byte == b'\n' {
                if line_buf.last() == Some(&b'\r') {
                    line_buf.pop();
                }
                let line = String::from_utf8_lossy(&line_buf).into_owned();
                line_buf.clear();
                if let Some(record) = assembler.feed_line(&line) {
                    sink.accept(record).await?;
                }
            } else {
                line_buf.push(byte);
                if line_buf.len() > max_line_bytes {
                    return Err(RsppError::InvalidStreamChunk(format!(
                        "SSE line exceeds {max_line_bytes}-byte cap"
                    )));
                }
            }
        }
    }

    if !line_buf.is_empty() {
        let line = String::from_utf8_lossy(&line_buf).into_owned();
        if let Some(record) = assembler.feed_line(&line) {
            sink.accept(record).await?;
        }
    }
    Ok(())
}
