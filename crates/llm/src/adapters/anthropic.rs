//! Anthropic-Compatible Adapter
//!
//! Speaks the Messages streaming protocol: an event-driven state machine
//! keyed on content-block index. Works with the Anthropic API and compatible
//! providers.
//!
//! Thinking blocks stream as unsigned incremental chunks; the signature
//! arrives silently via `signature_delta` and the fully-signed chunk is
//! emitted once at `content_block_stop`. Blocks that never received a
//! signature (aborted or signature-less provider responses) emit no final
//! chunk — an unsigned segment cannot be replayed.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use ponder_core::{
    build_content_chunk, build_done_chunk, build_error_chunk, build_thinking_chunk,
    build_tool_call_chunk, ChunkContext, FinishReason, StreamChunk,
};

use crate::accumulators::{ContentAccumulator, ToolCallAccumulator, ToolCallDelta};
use crate::http_client::build_http_client;
use crate::provider::{is_user_cancellation, parse_http_error, ChatAdapter};
use crate::sse::SseFrameReader;
use crate::types::{AdapterConfig, ChatRequest, LlmError, LlmResult, MessageRole};

const ANTHROPIC_API_BASE: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Fixed extended-thinking token budget.
pub const THINKING_BUDGET_TOKENS: u32 = 10_000;
/// `max_tokens` must exceed the thinking budget or the provider rejects the
/// call; this margin is the minimum headroom forced above it.
const THINKING_MAX_TOKENS_MARGIN: u32 = 1_000;
const DEFAULT_MAX_TOKENS: u32 = 8_192;
const DEFAULT_THINKING_MAX_TOKENS: u32 = 16_000;

/// Anthropic-compatible provider adapter.
pub struct AnthropicCompatAdapter {
    config: AdapterConfig,
    client: reqwest::Client,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockKind {
    Text,
    Thinking,
    ToolUse,
}

impl AnthropicCompatAdapter {
    pub fn new(config: AdapterConfig) -> Self {
        Self {
            config,
            client: build_http_client(),
        }
    }

    fn messages_url(&self) -> String {
        let base = self
            .config
            .base_url
            .as_deref()
            .unwrap_or(ANTHROPIC_API_BASE)
            .trim_end_matches('/');
        format!("{}/v1/messages", base)
    }

    /// A model is a thinking model purely by identifier substring.
    fn is_thinking_model(&self) -> bool {
        self.config.model.to_lowercase().contains("think")
    }

    fn build_request_body(&self, request: &ChatRequest) -> Value {
        let thinking = self.is_thinking_model();

        let max_tokens = if thinking {
            request
                .max_tokens
                .unwrap_or(DEFAULT_THINKING_MAX_TOKENS)
                .max(THINKING_BUDGET_TOKENS + THINKING_MAX_TOKENS_MARGIN)
        } else {
            request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS)
        };

        let mut body = json!({
            "model": self.config.model,
            "messages": self.convert_messages(request),
            "max_tokens": max_tokens,
            "stream": true,
        });

        if !request.system_prompts.is_empty() {
            body["system"] = json!(request.system_prompts.join("\n"));
        }

        if thinking {
            body["thinking"] = json!({
                "type": "enabled",
                "budget_tokens": THINKING_BUDGET_TOKENS,
            });
        } else if let Some(temperature) = request.temperature {
            // Temperature is not accepted while thinking is active.
            body["temperature"] = json!(temperature);
        }

        if !request.tools.is_empty() {
            let tools: Vec<Value> = request
                .tools
                .iter()
                .map(|t| {
                    json!({
                        "name": t.name,
                        "description": t.description,
                        "input_schema": t.input_schema,
                    })
                })
                .collect();
            body["tools"] = json!(tools);
        }

        body
    }

    /// Convert the conversation to Anthropic wire messages.
    ///
    /// Stored thinking segments are matched to assistant messages
    /// positionally, in order of appearance: conversation arrays are replayed
    /// wholesale and array order is stable. The provider requires the exact
    /// signed thinking block to precede any tool-use content in a replayed
    /// assistant turn.
    fn convert_messages(&self, request: &ChatRequest) -> Vec<Value> {
        let thinking_model = self.is_thinking_model();
        let items = &request.thinking_history;

        let assistant_turns = request
            .messages
            .iter()
            .filter(|m| m.role == MessageRole::Assistant)
            .count();
        if items.len() > assistant_turns {
            tracing::warn!(
                stored_items = items.len(),
                assistant_turns,
                "thinking history outnumbers assistant turns; positional replay \
                 will misattribute signatures if messages were filtered or reordered"
            );
        }

        let mut messages: Vec<Value> = Vec::new();
        let mut thinking_index = 0;

        for msg in &request.messages {
            match msg.role {
                MessageRole::User => {
                    messages.push(json!({
                        "role": "user",
                        "content": msg.text(),
                    }));
                }
                MessageRole::Assistant => {
                    let item = items.get(thinking_index);
                    thinking_index += 1;

                    if !msg.tool_calls.is_empty() {
                        let mut blocks: Vec<Value> = Vec::new();
                        if thinking_model {
                            if let Some(item) = item {
                                blocks.push(json!({
                                    "type": "thinking",
                                    "thinking": item.thinking,
                                    "signature": item.signature,
                                }));
                            }
                        }
                        if let Some(text) = msg.content.as_deref().filter(|t| !t.is_empty()) {
                            blocks.push(json!({"type": "text", "text": text}));
                        }
                        for tc in &msg.tool_calls {
                            blocks.push(json!({
                                "type": "tool_use",
                                "id": tc.id,
                                "name": tc.name,
                                "input": tc.arguments,
                            }));
                        }
                        messages.push(json!({"role": "assistant", "content": blocks}));
                    } else {
                        match item.filter(|_| thinking_model) {
                            Some(item) => messages.push(json!({
                                "role": "assistant",
                                "content": [
                                    {
                                        "type": "thinking",
                                        "thinking": item.thinking,
                                        "signature": item.signature,
                                    },
                                    {"type": "text", "text": msg.text()},
                                ],
                            })),
                            None => messages.push(json!({
                                "role": "assistant",
                                "content": msg.text(),
                            })),
                        }
                    }
                }
                MessageRole::Tool => {
                    // Tool results travel inside user turns on this protocol.
                    let result = json!({
                        "type": "tool_result",
                        "tool_use_id": msg.tool_call_id.as_deref().unwrap_or_default(),
                        "content": msg.text(),
                    });

                    let open_user_blocks = messages.last_mut().and_then(|last| {
                        if last["role"] == "user" {
                            last["content"].as_array_mut()
                        } else {
                            None
                        }
                    });
                    match open_user_blocks {
                        Some(blocks) => blocks.push(result),
                        None => {
                            messages.push(json!({"role": "user", "content": [result]}));
                        }
                    }
                }
            }
        }

        messages
    }

    async fn open_stream(&self, request: &ChatRequest) -> LlmResult<reqwest::Response> {
        let body = self.build_request_body(request);

        let response = self
            .client
            .post(self.messages_url())
            .header("Content-Type", "application/json")
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::NetworkError {
                message: e.to_string(),
            })?;

        let status = response.status().as_u16();
        if status != 200 {
            let body_text = response.text().await.map_err(|e| LlmError::NetworkError {
                message: e.to_string(),
            })?;
            return Err(parse_http_error(status, &body_text, "anthropic-compat"));
        }

        Ok(response)
    }

    async fn run_stream(
        &self,
        request: &ChatRequest,
        tx: &mpsc::Sender<StreamChunk>,
        cancel: &CancellationToken,
    ) -> LlmResult<()> {
        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(LlmError::Cancelled),
            response = self.open_stream(request) => response?,
        };

        let mut reader = SseFrameReader::new(response.bytes_stream());
        let mut content = ContentAccumulator::new();
        let mut tool_calls = ToolCallAccumulator::new();
        let mut ctx = ChunkContext::new("", &self.config.model);
        let mut current_block: Option<(usize, BlockKind)> = None;
        let mut prompt_tokens = 0u32;
        let mut completion_tokens = 0u32;

        loop {
            let frame = tokio::select! {
                _ = cancel.cancelled() => return Err(LlmError::Cancelled),
                frame = reader.next_frame() => frame?,
            };
            let Some(frame) = frame else {
                break;
            };

            let Ok(event) = serde_json::from_value::<MessagesEvent>(frame.data) else {
                continue;
            };

            match event {
                MessagesEvent::MessageStart { message } => {
                    ctx.id = message.id;
                    if let Some(usage) = message.usage {
                        prompt_tokens = usage.input_tokens;
                    }
                }
                MessagesEvent::ContentBlockStart {
                    index,
                    content_block,
                } => match content_block {
                    ContentBlockInfo::Thinking => {
                        // Segments do not span blocks
                        content.reset_thinking();
                        current_block = Some((index, BlockKind::Thinking));
                    }
                    ContentBlockInfo::ToolUse { id, name } => {
                        tool_calls.update(
                            index,
                            ToolCallDelta {
                                id: Some(id),
                                name: Some(name),
                                arguments: None,
                            },
                        );
                        current_block = Some((index, BlockKind::ToolUse));
                    }
                    ContentBlockInfo::Text => {
                        current_block = Some((index, BlockKind::Text));
                    }
                    ContentBlockInfo::Other => {
                        current_block = None;
                    }
                },
                MessagesEvent::ContentBlockDelta { index, delta } => match delta {
                    BlockDelta::ThinkingDelta { thinking } => {
                        let cumulative = content.append_thinking(&thinking).to_string();
                        let chunk =
                            build_thinking_chunk(&ctx, cumulative, Some(thinking), None, false);
                        if tx.send(chunk).await.is_err() {
                            return Ok(());
                        }
                    }
                    BlockDelta::SignatureDelta { signature } => {
                        // Only meaningful at block close; no emission here
                        content.set_signature(signature);
                    }
                    BlockDelta::TextDelta { text } => {
                        let cumulative = content.append_content(&text).to_string();
                        let chunk = build_content_chunk(&ctx, text, cumulative);
                        if tx.send(chunk).await.is_err() {
                            return Ok(());
                        }
                    }
                    BlockDelta::InputJsonDelta { partial_json } => {
                        tool_calls.update(
                            index,
                            ToolCallDelta {
                                arguments: Some(partial_json),
                                ..Default::default()
                            },
                        );
                    }
                    BlockDelta::Other => {}
                },
                MessagesEvent::ContentBlockStop { index } => {
                    match current_block.take() {
                        Some((_, BlockKind::Thinking)) if !content.signature().is_empty() => {
                            let chunk = build_thinking_chunk(
                                &ctx,
                                content.thinking().to_string(),
                                None,
                                Some(content.signature().to_string()),
                                true,
                            );
                            if tx.send(chunk).await.is_err() {
                                return Ok(());
                            }
                        }
                        Some((_, BlockKind::ToolUse)) => {
                            if let Some(call) = tool_calls.get(index) {
                                let chunk = build_tool_call_chunk(
                                    &ctx,
                                    index,
                                    call.id.clone(),
                                    call.name.clone(),
                                    call.arguments.clone(),
                                );
                                if tx.send(chunk).await.is_err() {
                                    return Ok(());
                                }
                            }
                        }
                        _ => {}
                    }
                }
                MessagesEvent::MessageDelta { usage } => {
                    if let Some(usage) = usage {
                        completion_tokens = usage.output_tokens;
                    }
                }
                MessagesEvent::MessageStop => {
                    let finish_reason = if tool_calls.has_tool_calls() {
                        FinishReason::ToolCalls
                    } else {
                        FinishReason::Stop
                    };
                    let done =
                        build_done_chunk(&ctx, prompt_tokens, completion_tokens, finish_reason);
                    let _ = tx.send(done).await;
                    break;
                }
                MessagesEvent::Error { error } => {
                    return Err(LlmError::Other {
                        message: error.message,
                    });
                }
                MessagesEvent::Ping | MessagesEvent::Unknown => {}
            }
        }

        Ok(())
    }
}

#[async_trait]
impl ChatAdapter for AnthropicCompatAdapter {
    fn name(&self) -> &'static str {
        "anthropic-compat"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    fn supports_thinking(&self) -> bool {
        self.is_thinking_model()
    }

    async fn stream_chat(
        &self,
        request: ChatRequest,
        tx: mpsc::Sender<StreamChunk>,
        cancel: CancellationToken,
    ) -> LlmResult<()> {
        match self.run_stream(&request, &tx, &cancel).await {
            Ok(()) => Ok(()),
            Err(err) => {
                if cancel.is_cancelled() || is_user_cancellation(&err) {
                    return Ok(());
                }
                tracing::error!(adapter = self.name(), error = %err, "stream failed");
                let ctx = ChunkContext::new(
                    uuid::Uuid::new_v4().to_string(),
                    &self.config.model,
                );
                let _ = tx.send(build_error_chunk(&ctx, err.to_string())).await;
                Ok(())
            }
        }
    }

    async fn structured_output(
        &self,
        _request: ChatRequest,
        _output_schema: Value,
    ) -> LlmResult<Value> {
        Err(LlmError::Unsupported {
            message: "structured output is not implemented for the Anthropic-compatible adapter"
                .to_string(),
        })
    }
}

/// Typed Messages streaming events.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum MessagesEvent {
    MessageStart {
        message: MessageStartInfo,
    },
    ContentBlockStart {
        index: usize,
        content_block: ContentBlockInfo,
    },
    ContentBlockDelta {
        index: usize,
        delta: BlockDelta,
    },
    ContentBlockStop {
        index: usize,
    },
    MessageDelta {
        #[serde(default)]
        usage: Option<DeltaUsage>,
    },
    MessageStop,
    Ping,
    Error {
        error: WireError,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
struct MessageStartInfo {
    #[serde(default)]
    id: String,
    #[serde(default)]
    usage: Option<StartUsage>,
}

#[derive(Debug, Deserialize)]
struct StartUsage {
    #[serde(default)]
    input_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct DeltaUsage {
    #[serde(default)]
    output_tokens: u32,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlockInfo {
    Text,
    Thinking,
    ToolUse { id: String, name: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum BlockDelta {
    TextDelta { text: String },
    ThinkingDelta { thinking: String },
    SignatureDelta { signature: String },
    InputJsonDelta { partial_json: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct WireError {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Message;
    use ponder_core::ThinkingHistoryItem;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn adapter(base_url: Option<&str>, model: &str) -> AnthropicCompatAdapter {
        AnthropicCompatAdapter::new(AdapterConfig {
            api_key: "sk-ant-test".to_string(),
            base_url: base_url.map(|s| s.to_string()),
            model: model.to_string(),
        })
    }

    fn item(thinking: &str, signature: &str) -> ThinkingHistoryItem {
        ThinkingHistoryItem {
            thinking: thinking.to_string(),
            signature: signature.to_string(),
        }
    }

    async fn collect_chunks(
        adapter: &AnthropicCompatAdapter,
        request: ChatRequest,
    ) -> Vec<StreamChunk> {
        let (tx, mut rx) = mpsc::channel(32);
        adapter
            .stream_chat(request, tx, CancellationToken::new())
            .await
            .unwrap();

        let mut chunks = Vec::new();
        while let Some(chunk) = rx.recv().await {
            chunks.push(chunk);
        }
        chunks
    }

    #[test]
    fn test_thinking_model_by_substring() {
        assert!(adapter(None, "claude-sonnet-4-5-think").is_thinking_model());
        assert!(adapter(None, "Claude-THINK-v2").is_thinking_model());
        assert!(!adapter(None, "claude-haiku-4-5").is_thinking_model());
    }

    #[test]
    fn test_thinking_model_forces_max_tokens_above_budget() {
        let adapter = adapter(None, "claude-sonnet-think");
        let request = ChatRequest {
            messages: vec![Message::user("hi")],
            max_tokens: Some(4_000),
            temperature: Some(0.5),
            ..Default::default()
        };

        let body = adapter.build_request_body(&request);
        assert_eq!(body["max_tokens"], THINKING_BUDGET_TOKENS + 1_000);
        assert_eq!(body["thinking"]["budget_tokens"], THINKING_BUDGET_TOKENS);
        // Not accepted while thinking is active
        assert!(body.get("temperature").is_none());
    }

    #[test]
    fn test_plain_model_request_body() {
        let adapter = adapter(None, "claude-haiku-4-5");
        let request = ChatRequest {
            messages: vec![Message::user("hi")],
            system_prompts: vec!["base".to_string()],
            temperature: Some(0.5),
            ..Default::default()
        };

        let body = adapter.build_request_body(&request);
        assert_eq!(body["max_tokens"], DEFAULT_MAX_TOKENS);
        assert_eq!(body["system"], "base");
        assert_eq!(body["temperature"], 0.5);
        assert!(body.get("thinking").is_none());
    }

    #[test]
    fn test_replay_matches_assistant_turns_positionally() {
        let adapter = adapter(None, "claude-sonnet-think");
        let request = ChatRequest {
            messages: vec![
                Message::user("first question"),
                Message::assistant("first answer"),
                Message::user("second question"),
                Message::assistant("second answer"),
            ],
            thinking_history: vec![item("reasoning one", "sig_1"), item("reasoning two", "sig_2")],
            ..Default::default()
        };

        let messages = adapter.convert_messages(&request);
        assert_eq!(messages[1]["content"][0]["type"], "thinking");
        assert_eq!(messages[1]["content"][0]["signature"], "sig_1");
        assert_eq!(messages[1]["content"][1]["text"], "first answer");
        assert_eq!(messages[3]["content"][0]["signature"], "sig_2");
    }

    #[test]
    fn test_replayed_thinking_precedes_tool_use() {
        let adapter = adapter(None, "claude-sonnet-think");
        let request = ChatRequest {
            messages: vec![
                Message::user("search something"),
                Message {
                    role: MessageRole::Assistant,
                    content: None,
                    tool_calls: vec![crate::types::ToolCallRequest {
                        id: "toolu_1".to_string(),
                        name: "web_search".to_string(),
                        arguments: json!({"query": "rust"}),
                    }],
                    tool_call_id: None,
                },
            ],
            thinking_history: vec![item("I should search", "sig_1")],
            ..Default::default()
        };

        let messages = adapter.convert_messages(&request);
        let blocks = messages[1]["content"].as_array().unwrap();
        assert_eq!(blocks[0]["type"], "thinking");
        assert_eq!(blocks[1]["type"], "tool_use");
        assert_eq!(blocks[1]["input"]["query"], "rust");
    }

    #[test]
    fn test_plain_model_ignores_thinking_history() {
        let adapter = adapter(None, "claude-haiku-4-5");
        let request = ChatRequest {
            messages: vec![Message::user("q"), Message::assistant("a")],
            thinking_history: vec![item("reasoning", "sig")],
            ..Default::default()
        };

        let messages = adapter.convert_messages(&request);
        assert_eq!(messages[1]["content"], "a");
    }

    #[test]
    fn test_tool_result_appends_to_open_user_turn() {
        let adapter = adapter(None, "claude-haiku-4-5");
        let request = ChatRequest {
            messages: vec![
                Message::user("search twice"),
                Message::tool("toolu_1", "{\"results\":[]}"),
                Message::tool("toolu_2", "{\"results\":[]}"),
            ],
            ..Default::default()
        };

        let messages = adapter.convert_messages(&request);
        // The plain-string user turn stays; tool results open a new user turn
        // with a block list and the second result joins it.
        assert_eq!(messages.len(), 2);
        let blocks = messages[1]["content"].as_array().unwrap();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0]["tool_use_id"], "toolu_1");
        assert_eq!(blocks[1]["tool_use_id"], "toolu_2");
    }

    #[tokio::test]
    async fn test_full_thinking_stream() {
        let server = MockServer::start().await;
        let sse_body = concat!(
            "data: {\"type\":\"message_start\",\"message\":{\"id\":\"msg_1\",\"usage\":{\"input_tokens\":25}}}\n\n",
            "data: {\"type\":\"content_block_start\",\"index\":0,\"content_block\":{\"type\":\"thinking\"}}\n\n",
            "data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"thinking_delta\",\"thinking\":\"hmm\"}}\n\n",
            "data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"signature_delta\",\"signature\":\"sig_abc\"}}\n\n",
            "data: {\"type\":\"content_block_stop\",\"index\":0}\n\n",
            "data: {\"type\":\"content_block_start\",\"index\":1,\"content_block\":{\"type\":\"text\",\"text\":\"\"}}\n\n",
            "data: {\"type\":\"content_block_delta\",\"index\":1,\"delta\":{\"type\":\"text_delta\",\"text\":\"Hi\"}}\n\n",
            "data: {\"type\":\"content_block_stop\",\"index\":1}\n\n",
            "data: {\"type\":\"message_delta\",\"delta\":{\"stop_reason\":\"end_turn\"},\"usage\":{\"output_tokens\":17}}\n\n",
            "data: {\"type\":\"message_stop\"}\n\n",
        );
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(sse_body, "text/event-stream"))
            .mount(&server)
            .await;

        let adapter = adapter(Some(&server.uri()), "claude-sonnet-think");
        let request = ChatRequest {
            messages: vec![Message::user("hi")],
            ..Default::default()
        };
        let chunks = collect_chunks(&adapter, request).await;

        assert_eq!(chunks.len(), 4);
        match &chunks[0] {
            StreamChunk::Thinking {
                id,
                delta,
                is_complete,
                ..
            } => {
                assert_eq!(id, "msg_1");
                assert_eq!(delta.as_deref(), Some("hmm"));
                assert!(is_complete.is_none());
            }
            other => panic!("Expected incremental Thinking, got {:?}", other),
        }
        match &chunks[1] {
            StreamChunk::Thinking {
                content,
                signature,
                is_complete,
                delta,
                ..
            } => {
                assert_eq!(content, "hmm");
                assert_eq!(signature.as_deref(), Some("sig_abc"));
                assert_eq!(*is_complete, Some(true));
                assert!(delta.is_none());
            }
            other => panic!("Expected signed Thinking, got {:?}", other),
        }
        match &chunks[2] {
            StreamChunk::Content { content, .. } => assert_eq!(content, "Hi"),
            other => panic!("Expected Content, got {:?}", other),
        }
        match &chunks[3] {
            StreamChunk::Done {
                usage,
                finish_reason,
                ..
            } => {
                assert_eq!(usage.prompt_tokens, 25);
                assert_eq!(usage.completion_tokens, 17);
                assert_eq!(usage.total_tokens, 42);
                assert_eq!(*finish_reason, FinishReason::Stop);
            }
            other => panic!("Expected Done, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unsigned_thinking_block_never_emits_final_chunk() {
        let server = MockServer::start().await;
        let sse_body = concat!(
            "data: {\"type\":\"message_start\",\"message\":{\"id\":\"msg_2\"}}\n\n",
            "data: {\"type\":\"content_block_start\",\"index\":0,\"content_block\":{\"type\":\"thinking\"}}\n\n",
            "data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"thinking_delta\",\"thinking\":\"scratch\"}}\n\n",
            "data: {\"type\":\"content_block_stop\",\"index\":0}\n\n",
            "data: {\"type\":\"message_stop\"}\n\n",
        );
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(sse_body, "text/event-stream"))
            .mount(&server)
            .await;

        let adapter = adapter(Some(&server.uri()), "claude-sonnet-think");
        let request = ChatRequest {
            messages: vec![Message::user("hi")],
            ..Default::default()
        };
        let chunks = collect_chunks(&adapter, request).await;

        assert_eq!(chunks.len(), 2);
        assert!(matches!(&chunks[0], StreamChunk::Thinking { is_complete, .. } if is_complete.is_none()));
        assert!(matches!(&chunks[1], StreamChunk::Done { .. }));
    }

    #[tokio::test]
    async fn test_tool_use_stream() {
        let server = MockServer::start().await;
        let sse_body = concat!(
            "data: {\"type\":\"message_start\",\"message\":{\"id\":\"msg_3\",\"usage\":{\"input_tokens\":5}}}\n\n",
            "data: {\"type\":\"content_block_start\",\"index\":0,\"content_block\":{\"type\":\"tool_use\",\"id\":\"toolu_1\",\"name\":\"interview\"}}\n\n",
            "data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"input_json_delta\",\"partial_json\":\"{\\\"quest\"}}\n\n",
            "data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"input_json_delta\",\"partial_json\":\"ions\\\":[]}\"}}\n\n",
            "data: {\"type\":\"content_block_stop\",\"index\":0}\n\n",
            "data: {\"type\":\"message_delta\",\"delta\":{\"stop_reason\":\"tool_use\"},\"usage\":{\"output_tokens\":9}}\n\n",
            "data: {\"type\":\"message_stop\"}\n\n",
        );
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(sse_body, "text/event-stream"))
            .mount(&server)
            .await;

        let adapter = adapter(Some(&server.uri()), "claude-haiku-4-5");
        let request = ChatRequest {
            messages: vec![Message::user("hi")],
            ..Default::default()
        };
        let chunks = collect_chunks(&adapter, request).await;

        assert_eq!(chunks.len(), 2);
        match &chunks[0] {
            StreamChunk::ToolCall {
                index, tool_call, ..
            } => {
                assert_eq!(*index, 0);
                assert_eq!(tool_call.id, "toolu_1");
                assert_eq!(tool_call.function.name, "interview");
                assert_eq!(tool_call.function.arguments, "{\"questions\":[]}");
            }
            other => panic!("Expected ToolCall, got {:?}", other),
        }
        assert!(matches!(
            &chunks[1],
            StreamChunk::Done {
                finish_reason: FinishReason::ToolCalls,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_provider_error_event_becomes_error_chunk() {
        let server = MockServer::start().await;
        let sse_body = concat!(
            "data: {\"type\":\"message_start\",\"message\":{\"id\":\"msg_4\"}}\n\n",
            "data: {\"type\":\"error\",\"error\":{\"type\":\"overloaded_error\",\"message\":\"Overloaded\"}}\n\n",
        );
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(sse_body, "text/event-stream"))
            .mount(&server)
            .await;

        let adapter = adapter(Some(&server.uri()), "claude-haiku-4-5");
        let request = ChatRequest {
            messages: vec![Message::user("hi")],
            ..Default::default()
        };
        let chunks = collect_chunks(&adapter, request).await;

        assert_eq!(chunks.len(), 1);
        match &chunks[0] {
            StreamChunk::Error { error, .. } => assert!(error.message.contains("Overloaded")),
            other => panic!("Expected Error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_http_error_carries_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
            .mount(&server)
            .await;

        let adapter = adapter(Some(&server.uri()), "claude-haiku-4-5");
        let request = ChatRequest {
            messages: vec![Message::user("hi")],
            ..Default::default()
        };
        let chunks = collect_chunks(&adapter, request).await;

        assert_eq!(chunks.len(), 1);
        match &chunks[0] {
            StreamChunk::Error { error, .. } => {
                assert!(error.message.contains("500"));
                assert!(error.message.contains("upstream exploded"));
            }
            other => panic!("Expected Error, got {:?}", other),
        }
    }
}
