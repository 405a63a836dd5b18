//! Shared LLM Types
//!
//! Conversation messages, request options, and the error taxonomy shared by
//! all provider adapters.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use ponder_core::{ThinkingHistoryItem, ToolDefinition};

/// Role of a conversation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    Tool,
}

/// A tool call recorded on a prior assistant turn.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCallRequest {
    pub id: String,
    pub name: String,
    /// Parsed argument object. Adapters re-serialize this into whatever shape
    /// the provider wants (a JSON string for OpenAI, an object for Anthropic).
    pub arguments: Value,
}

/// One message of the inbound conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub role: MessageRole,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCallRequest>,
    /// For `tool` role messages: the id of the originating call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: Some(text.into()),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: Some(text.into()),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn tool(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Tool,
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: Some(tool_call_id.into()),
        }
    }

    /// Text content, empty when absent.
    pub fn text(&self) -> &str {
        self.content.as_deref().unwrap_or("")
    }
}

/// Everything an adapter needs to issue one model call.
#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    pub messages: Vec<Message>,
    pub system_prompts: Vec<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub top_p: Option<f32>,
    pub tools: Vec<ToolDefinition>,
    /// Signed thinking segments from prior turns, in order of appearance.
    /// Matched to assistant messages positionally during replay.
    pub thinking_history: Vec<ThinkingHistoryItem>,
}

/// Connection settings for one adapter instance.
#[derive(Debug, Clone)]
pub struct AdapterConfig {
    pub api_key: String,
    /// Provider base URL; adapter-specific default when `None`.
    pub base_url: Option<String>,
    pub model: String,
}

/// Errors produced by the provider layer.
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Model not found: {model}")]
    ModelNotFound { model: String },

    #[error("Rate limited: {message}")]
    RateLimited { message: String },

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Server error (HTTP {status}): {message}")]
    ServerError { message: String, status: u16 },

    #[error("Network error: {message}")]
    NetworkError { message: String },

    #[error("Parse error: {message}")]
    ParseError { message: String },

    #[error("Request cancelled")]
    Cancelled,

    #[error("Unsupported: {message}")]
    Unsupported { message: String },

    #[error("{message}")]
    Other { message: String },
}

/// Result type alias for LLM errors
pub type LlmResult<T> = Result<T, LlmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_wire_format() {
        let json = r#"{"role":"assistant","content":"ok","toolCalls":[{"id":"call_1","name":"web_search","arguments":{"query":"rust"}}]}"#;
        let msg: Message = serde_json::from_str(json).unwrap();
        assert_eq!(msg.role, MessageRole::Assistant);
        assert_eq!(msg.tool_calls.len(), 1);
        assert_eq!(msg.tool_calls[0].name, "web_search");
    }

    #[test]
    fn test_tool_message_roundtrip() {
        let msg = Message::tool("call_9", "{\"results\":[]}");
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"toolCallId\":\"call_9\""));

        let parsed: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, msg);
    }

    #[test]
    fn test_message_without_content() {
        let msg: Message = serde_json::from_str(r#"{"role":"user"}"#).unwrap();
        assert_eq!(msg.text(), "");
    }

    #[test]
    fn test_error_display() {
        let err = LlmError::ServerError {
            message: "upstream exploded".to_string(),
            status: 502,
        };
        assert_eq!(err.to_string(), "Server error (HTTP 502): upstream exploded");
    }
}
