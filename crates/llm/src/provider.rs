//! Chat Adapter Trait
//!
//! Defines the common interface for all provider adapters, the shared HTTP
//! error mapping, and cancellation classification.

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use ponder_core::StreamChunk;

use crate::adapters::{AnthropicCompatAdapter, OpenAiCompatAdapter};
use crate::types::{AdapterConfig, ChatRequest, LlmError, LlmResult};

/// Trait that all provider adapters implement.
///
/// Provides a unified interface for:
/// - Streaming completions emitting canonical chunks (stream_chat)
/// - Non-streaming structured output (structured_output)
#[async_trait]
pub trait ChatAdapter: Send + Sync {
    /// Returns the adapter name for identification.
    fn name(&self) -> &'static str;

    /// Returns the current model being used.
    fn model(&self) -> &str;

    /// Returns whether the configured model supports extended thinking.
    fn supports_thinking(&self) -> bool;

    /// Stream one model turn as canonical chunks.
    ///
    /// Exactly one terminal chunk is sent per turn: `done` on success,
    /// `error` on failure. A user cancellation terminates the stream without
    /// any terminal chunk — the consumer observes an abrupt end-of-stream.
    ///
    /// The returned result is `Ok` even when an `error` chunk was emitted;
    /// `Err` is reserved for failures before any chunk could be produced.
    async fn stream_chat(
        &self,
        request: ChatRequest,
        tx: mpsc::Sender<StreamChunk>,
        cancel: CancellationToken,
    ) -> LlmResult<()>;

    /// Non-streaming structured-output mode: one request, one parsed JSON
    /// value conforming to `output_schema`.
    async fn structured_output(&self, request: ChatRequest, output_schema: Value)
        -> LlmResult<Value>;
}

/// Select an adapter for a model identifier.
///
/// Claude-family models speak the Anthropic Messages protocol; everything
/// else goes through the OpenAI-compatible Chat Completions protocol.
pub fn adapter_for(config: AdapterConfig) -> Box<dyn ChatAdapter> {
    if config.model.to_lowercase().contains("claude") {
        Box::new(AnthropicCompatAdapter::new(config))
    } else {
        Box::new(OpenAiCompatAdapter::new(config))
    }
}

/// Helper function to create an error for a missing API key
pub fn missing_api_key_error(provider: &str) -> LlmError {
    LlmError::AuthenticationFailed {
        message: format!("API key not configured for {}", provider),
    }
}

/// Map a non-success HTTP status plus body text to an error.
///
/// The full body text travels with the error so the caller's terminal
/// `error` chunk carries the provider's own message.
pub fn parse_http_error(status: u16, body: &str, provider: &str) -> LlmError {
    match status {
        401 => LlmError::AuthenticationFailed {
            message: format!("{}: invalid API key", provider),
        },
        403 => LlmError::AuthenticationFailed {
            message: format!("{}: access denied", provider),
        },
        404 => LlmError::ModelNotFound {
            model: body.to_string(),
        },
        429 => LlmError::RateLimited {
            message: body.to_string(),
        },
        400 => LlmError::InvalidRequest {
            message: body.to_string(),
        },
        500..=599 => LlmError::ServerError {
            message: body.to_string(),
            status,
        },
        _ => LlmError::Other {
            message: format!("HTTP {}: {}", status, body),
        },
    }
}

/// Whether an error is a user cancellation.
///
/// Cancellations are expected, not exceptional: they are never logged as
/// errors and never produce an `error` chunk.
pub fn is_user_cancellation(err: &LlmError) -> bool {
    if matches!(err, LlmError::Cancelled) {
        return true;
    }
    let message = err.to_string();
    message.contains("aborted") || message.contains("operation was canceled")
}
