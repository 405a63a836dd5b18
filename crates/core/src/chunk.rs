//! Canonical Stream Chunk Types
//!
//! Provider-agnostic chunk types that all provider adapters convert to.
//! This is the single output contract of the streaming layer: whatever wire
//! protocol a provider speaks, the caller only ever sees this variant set.
//!
//! Builders are pure functions over a [`ChunkContext`] so no adapter assembles
//! chunks (or token totals) by hand.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Per-response context shared by every chunk of one streamed response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChunkContext {
    /// Provider-issued response/message id (empty until the provider sends one).
    pub id: String,
    pub model: String,
    /// Milliseconds since the Unix epoch, captured once per response.
    pub timestamp: u64,
}

impl ChunkContext {
    /// Create a context stamped with the current wall-clock time.
    pub fn new(id: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            model: model.into(),
            timestamp: now_millis(),
        }
    }
}

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Why a response finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    ToolCalls,
}

/// Token usage for a completed response.
///
/// `total_tokens` is computed exclusively by [`build_done_chunk`] so adapters
/// cannot disagree on the sum.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Function portion of a completed tool call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolCallFunction {
    pub name: String,
    /// Complete JSON string of tool arguments.
    pub arguments: String,
}

/// Completed tool call payload carried by a `tool_call` chunk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolCallPayload {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub function: ToolCallFunction,
}

/// Error payload carried by a terminal `error` chunk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorPayload {
    pub message: String,
}

/// One discrete unit of the canonical normalized output stream.
///
/// Invariants:
/// - `content`/`thinking` deltas concatenate to the final cumulative value in
///   emission order for a given response id.
/// - Tool-call argument deltas concatenate per index.
/// - Exactly one terminal chunk (`done` or `error`) per response; never both.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamChunk {
    /// Text content delta plus running total.
    Content {
        id: String,
        model: String,
        timestamp: u64,
        delta: String,
        content: String,
        role: String,
    },

    /// Thinking/reasoning delta or completion.
    ///
    /// Optional fields are omitted from serialization entirely when absent so
    /// consumers can test for field presence as the completion signal.
    Thinking {
        id: String,
        model: String,
        timestamp: u64,
        #[serde(skip_serializing_if = "Option::is_none")]
        delta: Option<String>,
        content: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        signature: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        is_complete: Option<bool>,
    },

    /// A tool call whose arguments have fully accumulated.
    ToolCall {
        id: String,
        model: String,
        timestamp: u64,
        index: usize,
        tool_call: ToolCallPayload,
    },

    /// Terminal success chunk.
    Done {
        id: String,
        model: String,
        timestamp: u64,
        usage: TokenUsage,
        finish_reason: FinishReason,
    },

    /// Terminal failure chunk.
    Error {
        id: String,
        model: String,
        timestamp: u64,
        error: ErrorPayload,
    },
}

/// Build a content chunk.
pub fn build_content_chunk(
    ctx: &ChunkContext,
    delta: impl Into<String>,
    content: impl Into<String>,
) -> StreamChunk {
    StreamChunk::Content {
        id: ctx.id.clone(),
        model: ctx.model.clone(),
        timestamp: ctx.timestamp,
        delta: delta.into(),
        content: content.into(),
        role: "assistant".to_string(),
    }
}

/// Build a thinking chunk.
///
/// Empty `delta`/`signature` values are treated as absent. `is_complete` is
/// only serialized when true.
pub fn build_thinking_chunk(
    ctx: &ChunkContext,
    content: impl Into<String>,
    delta: Option<String>,
    signature: Option<String>,
    is_complete: bool,
) -> StreamChunk {
    StreamChunk::Thinking {
        id: ctx.id.clone(),
        model: ctx.model.clone(),
        timestamp: ctx.timestamp,
        delta: delta.filter(|d| !d.is_empty()),
        content: content.into(),
        signature: signature.filter(|s| !s.is_empty()),
        is_complete: is_complete.then_some(true),
    }
}

/// Build a tool call chunk for a fully accumulated call.
pub fn build_tool_call_chunk(
    ctx: &ChunkContext,
    index: usize,
    call_id: impl Into<String>,
    name: impl Into<String>,
    arguments: impl Into<String>,
) -> StreamChunk {
    StreamChunk::ToolCall {
        id: ctx.id.clone(),
        model: ctx.model.clone(),
        timestamp: ctx.timestamp,
        index,
        tool_call: ToolCallPayload {
            id: call_id.into(),
            kind: "function".to_string(),
            function: ToolCallFunction {
                name: name.into(),
                arguments: arguments.into(),
            },
        },
    }
}

/// Build the terminal done chunk. Owns the `total_tokens` sum.
pub fn build_done_chunk(
    ctx: &ChunkContext,
    prompt_tokens: u32,
    completion_tokens: u32,
    finish_reason: FinishReason,
) -> StreamChunk {
    StreamChunk::Done {
        id: ctx.id.clone(),
        model: ctx.model.clone(),
        timestamp: ctx.timestamp,
        usage: TokenUsage {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        },
        finish_reason,
    }
}

/// Build the terminal error chunk.
pub fn build_error_chunk(ctx: &ChunkContext, message: impl Into<String>) -> StreamChunk {
    StreamChunk::Error {
        id: ctx.id.clone(),
        model: ctx.model.clone(),
        timestamp: ctx.timestamp,
        error: ErrorPayload {
            message: message.into(),
        },
    }
}
