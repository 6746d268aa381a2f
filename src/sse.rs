//! Server-Sent Events (SSE) line assembly and frame decoding.
//!
//! The upstream summary service streams records of the form:
//! ```text
//! data: {"chunk": "Hello "}
//!
//! data: {"chunk": "world"}
//!
//! event: error
//! data: {"error": "rate_limited"}
//!
//! data: [DONE]
//! ```
//!
//! Network reads carry no line-boundary guarantee, so bytes are first collected
//! in a [`LineBuffer`] and only complete lines are handed to [`decode_frame`].

use bytes::BytesMut;
use serde_json::Value;
use thiserror::Error;

/// One decoded record from the upstream stream.
#[derive(Debug, Clone, PartialEq)]
pub enum UpstreamFrame {
    /// Text to forward verbatim. Never empty.
    Chunk(String),
    /// Terminal error object, forwarded as JSON text.
    Error(Value),
    /// The `[DONE]` marker.
    End,
}

/// A `data:` record whose payload is not valid JSON.
#[derive(Error, Debug)]
#[error("malformed frame payload {payload:?}: {source}")]
pub struct FrameError {
    pub payload: String,
    #[source]
    pub source: serde_json::Error,
}

/// Line-assembly buffer.
///
/// Holds exactly the trailing bytes seen so far that have not yet formed a
/// complete `\n`-terminated line. Splitting happens on raw bytes: `\n` never
/// occurs inside a multi-byte UTF-8 sequence, so a character split across two
/// reads is whole again by the time its line is decoded, and each byte is
/// decoded once.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buf: BytesMut,
    /// Prefix of `buf` already known to contain no newline.
    scanned: usize,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append freshly received bytes.
    pub fn push(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Remove and return the next complete line, without its terminator.
    ///
    /// A trailing `\r` is left in place; callers trim.
    pub fn next_line(&mut self) -> Option<String> {
        match self.buf[self.scanned..].iter().position(|&b| b == b'\n') {
            Some(offset) => {
                let end = self.scanned + offset;
                let line = self.buf.split_to(end + 1);
                self.scanned = 0;
                Some(String::from_utf8_lossy(&line[..end]).into_owned())
            }
            None => {
                self.scanned = self.buf.len();
                None
            }
        }
    }

    /// Bytes waiting for a newline.
    pub fn pending(&self) -> &[u8] {
        &self.buf
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Drop the unterminated remainder, returning how many bytes were dropped.
    pub fn discard(&mut self) -> usize {
        let dropped = self.buf.len();
        self.buf.clear();
        self.scanned = 0;
        dropped
    }
}

/// Parse an SSE line to extract the data portion.
///
/// SSE lines are in the format: `data: <content>`
///
/// # Example
/// ```
/// use smart_summary::sse::parse_sse_line;
///
/// let line = "data: {\"chunk\": \"value\"}";
/// assert_eq!(parse_sse_line(line), Some("{\"chunk\": \"value\"}"));
///
/// let line = "event: error";
/// assert_eq!(parse_sse_line(line), None);
/// ```
pub fn parse_sse_line(line: &str) -> Option<&str> {
    line.strip_prefix("data: ").map(|s| s.trim())
}

/// Check if an SSE data line indicates the stream is done.
///
/// # Example
/// ```
/// use smart_summary::sse::is_done_marker;
///
/// assert!(is_done_marker("[DONE]"));
/// assert!(!is_done_marker(""));
/// assert!(!is_done_marker("{\"chunk\": \"value\"}"));
/// ```
pub fn is_done_marker(data: &str) -> bool {
    data == "[DONE]"
}

/// Decode one complete line into a frame.
///
/// Returns `Ok(None)` for lines that carry nothing to act on: blank lines,
/// non-`data:` lines, JSON that is not an object, objects with neither field,
/// and empty chunks. An `error` field wins over a `chunk` field.
pub fn decode_frame(line: &str) -> Result<Option<UpstreamFrame>, FrameError> {
    let Some(payload) = parse_sse_line(line.trim()) else {
        return Ok(None);
    };

    if is_done_marker(payload) {
        return Ok(Some(UpstreamFrame::End));
    }

    let value: Value = serde_json::from_str(payload).map_err(|source| FrameError {
        payload: payload.to_string(),
        source,
    })?;

    let Value::Object(mut fields) = value else {
        return Ok(None);
    };

    if fields.get("error").is_some_and(|e| !e.is_null()) {
        return Ok(Some(UpstreamFrame::Error(Value::Object(fields))));
    }

    match fields.remove("chunk") {
        Some(Value::String(text)) if !text.is_empty() => Ok(Some(UpstreamFrame::Chunk(text))),
        _ => Ok(None),
    }
}
