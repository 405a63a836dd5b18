//! SSE Frame Reader
//!
//! Decodes a provider's byte stream into discrete server-sent-event records.
//! This is the single source of truth for SSE parsing: both adapters drive
//! their event machines off the frames produced here.
//!
//! The reader owns the underlying body stream, so dropping it (normal
//! completion, error, or the consumer ceasing iteration) releases the
//! connection on every exit path.

use std::collections::VecDeque;
use std::fmt::Display;

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use serde_json::Value;

use crate::types::{LlmError, LlmResult};

/// One decoded SSE record.
///
/// `event_type` is the parsed object's `"type"` string field, `"unknown"`
/// when absent (OpenAI-style chunks carry no type discriminator).
#[derive(Debug, Clone, PartialEq)]
pub struct SseFrame {
    pub event_type: String,
    pub data: Value,
}

/// Buffering reader over a byte stream of `data: ` lines.
///
/// - A trailing partial line carries over into the next read.
/// - A literal `[DONE]` payload ends the stream; it is consumed, not emitted.
/// - A line that fails to parse as JSON is dropped silently, the stream
///   continues (tolerates transient corrupt frames from flaky transports).
pub struct SseFrameReader<S> {
    stream: S,
    buffer: String,
    pending: VecDeque<SseFrame>,
    finished: bool,
}

impl<S, E> SseFrameReader<S>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    E: Display,
{
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            buffer: String::new(),
            pending: VecDeque::new(),
            finished: false,
        }
    }

    /// Next complete frame, `Ok(None)` at stream end or after `[DONE]`.
    pub async fn next_frame(&mut self) -> LlmResult<Option<SseFrame>> {
        loop {
            if let Some(frame) = self.pending.pop_front() {
                return Ok(Some(frame));
            }
            if self.finished {
                return Ok(None);
            }

            match self.stream.next().await {
                Some(Ok(chunk)) => {
                    self.buffer.push_str(&String::from_utf8_lossy(&chunk));
                    self.drain_complete_lines();
                }
                Some(Err(e)) => {
                    return Err(LlmError::NetworkError {
                        message: e.to_string(),
                    });
                }
                None => {
                    // A trailing partial line with no newline is discarded;
                    // providers terminate every event with a newline.
                    self.finished = true;
                }
            }
        }
    }

    fn drain_complete_lines(&mut self) {
        while let Some(newline) = self.buffer.find('\n') {
            let line: String = self.buffer.drain(..=newline).collect();
            let line = line.trim_end_matches(['\n', '\r']);

            let Some(data) = line.strip_prefix("data: ") else {
                // event:, id:, retry:, comments, empty keep-alive lines
                continue;
            };

            if data == "[DONE]" {
                self.finished = true;
                continue;
            }

            if let Ok(parsed) = serde_json::from_str::<Value>(data) {
                let event_type = parsed
                    .get("type")
                    .and_then(|t| t.as_str())
                    .unwrap_or("unknown")
                    .to_string();
                self.pending.push_back(SseFrame {
                    event_type,
                    data: parsed,
                });
            }
        }
    }
}
