//! Ponder LLM
//!
//! Provider-normalization streaming layer: adapters that translate divergent
//! vendor wire protocols (OpenAI-style Chat Completions SSE, Anthropic-style
//! Messages SSE) into the unified chunk stream defined in `ponder-core`,
//! reconstructing multi-part assistant turns (text, signed thinking segments,
//! incrementally-streamed tool-call arguments) from token-level deltas.
//!
//! ## Module Organization
//!
//! - `types` - Conversation messages, request options, error taxonomy
//! - `provider` - The `ChatAdapter` trait, adapter selection, shared error mapping
//! - `sse` - SSE frame reader (byte stream → discrete event records)
//! - `accumulators` - Content/thinking/tool-call delta reducers
//! - `adapters` - OpenAI-compatible and Anthropic-compatible adapters
//! - `http_client` - Shared reqwest client factory

pub mod accumulators;
pub mod adapters;
pub mod http_client;
pub mod provider;
pub mod sse;
pub mod types;

// ── Adapter Contract ───────────────────────────────────────────────────
pub use provider::{
    adapter_for, is_user_cancellation, missing_api_key_error, parse_http_error, ChatAdapter,
};
pub use types::{AdapterConfig, ChatRequest, LlmError, LlmResult, Message, MessageRole, ToolCallRequest};

// ── Adapters ───────────────────────────────────────────────────────────
pub use adapters::{AnthropicCompatAdapter, OpenAiCompatAdapter};

// ── Streaming Building Blocks ──────────────────────────────────────────
pub use accumulators::{ContentAccumulator, ToolCallAccumulator, ToolCallDelta, ToolCallState};
pub use sse::{SseFrame, SseFrameReader};
