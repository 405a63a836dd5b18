//! OpenAI-Compatible Adapter
//!
//! Speaks the Chat Completions streaming protocol. Works with OpenAI,
//! DeepSeek, Qwen, OpenRouter, and other compatible providers.
//!
//! The stream is a per-choice delta machine: reasoning text and content text
//! accumulate independently, indexed partial tool calls merge through the
//! [`ToolCallAccumulator`], and a non-null `finish_reason` triggers the flush
//! (index-ordered tool-call chunks, then exactly one `done`).

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
use crate::types::{AdapterConfig, ChatRequest, LlmError, LlmResult, Message, MessageRole};

const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

/// Reasoning-field name per provider family, keyed by model-identifier
/// substring. No single field name is standardized across compatible
/// providers; adding a family here is a data change, not a code change.
const REASONING_FIELD_TABLE: &[(&str, &str)] = &[
    ("deepseek", "reasoning_content"),
    ("qwen", "reasoning_content"),
    ("glm", "reasoning_content"),
    ("minimax", "thinking"),
    ("kimi", "thinking_content"),
    ("moonshot", "thinking_content"),
];

const DEFAULT_REASONING_FIELD: &str = "reasoning_content";

fn reasoning_field_for(model: &str) -> &'static str {
    let model = model.to_lowercase();
    REASONING_FIELD_TABLE
        .iter()
        .find(|(family, _)| model.contains(family))
        .map(|(_, field)| *field)
        .unwrap_or(DEFAULT_REASONING_FIELD)
}

/// OpenAI-compatible provider adapter.
pub struct OpenAiCompatAdapter {
    config: AdapterConfig,
    client: reqwest::Client,
    reasoning_field: &'static str,
}

impl OpenAiCompatAdapter {
    pub fn new(config: AdapterConfig) -> Self {
        let reasoning_field = reasoning_field_for(&config.model);
        Self {
            config,
            client: build_http_client(),
            reasoning_field,
        }
    }

    fn completions_url(&self) -> String {
        let base = self
            .config
            .base_url
            .as_deref()
            .unwrap_or(OPENAI_API_BASE)
            .trim_end_matches('/');
        format!("{}/chat/completions", base)
    }

    fn build_request_body(&self, request: &ChatRequest, stream: bool) -> Value {
        let mut body = json!({
            "model": self.config.model,
            "messages": convert_messages(request),
            "stream": stream,
        });

        if let Some(temperature) = request.temperature {
            body["temperature"] = json!(temperature);
        }
        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = json!(max_tokens);
        }
        if let Some(top_p) = request.top_p {
            body["top_p"] = json!(top_p);
        }

        if !request.tools.is_empty() {
            let tools: Vec<Value> = request
                .tools
                .iter()
                .map(|t| {
                    json!({
                        "type": "function",
                        "function": {
                            "name": t.name,
                            "description": t.description,
                            "parameters": t.input_schema,
                        }
                    })
                })
                .collect();
            body["tools"] = json!(tools);
        }

        body
    }

    fn reasoning_delta<'a>(&self, delta: &'a ChoiceDelta) -> Option<&'a str> {
        let value = match self.reasoning_field {
            "thinking" => delta.thinking.as_deref(),
            "thinking_content" => delta.thinking_content.as_deref(),
            _ => delta.reasoning_content.as_deref(),
        };
        value.filter(|s| !s.is_empty())
    }

    async fn open_stream(&self, request: &ChatRequest) -> LlmResult<reqwest::Response> {
        let body = self.build_request_body(request, true);

        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(&self.config.api_key)
            .header("Content-Type", "application/json")
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
            return Err(parse_http_error(status, &body_text, "openai-compat"));
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

            let Ok(chunk) = serde_json::from_value::<CompletionChunk>(frame.data) else {
                continue;
            };

            if !chunk.id.is_empty() {
                ctx.id = chunk.id;
            }
            if let Some(usage) = &chunk.usage {
                prompt_tokens = usage.prompt_tokens;
                completion_tokens = usage.completion_tokens;
            }

            let Some(choice) = chunk.choices.into_iter().next() else {
                continue;
            };

            if let Some(reasoning) = self.reasoning_delta(&choice.delta) {
                let cumulative = content.append_thinking(reasoning).to_string();
                let chunk = build_thinking_chunk(
                    &ctx,
                    cumulative,
                    Some(reasoning.to_string()),
                    None,
                    false,
                );
                if tx.send(chunk).await.is_err() {
                    return Ok(());
                }
            }

            if let Some(delta) = choice.delta.content.as_deref().filter(|s| !s.is_empty()) {
                let cumulative = content.append_content(delta).to_string();
                let chunk = build_content_chunk(&ctx, delta, cumulative);
                if tx.send(chunk).await.is_err() {
                    return Ok(());
                }
            }

            for tool_delta in choice.delta.tool_calls.unwrap_or_default() {
                let function = tool_delta.function.unwrap_or_default();
                tool_calls.update(
                    tool_delta.index,
                    ToolCallDelta {
                        id: tool_delta.id,
                        name: function.name,
                        arguments: function.arguments,
                    },
                );
            }

            if choice.finish_reason.is_some() {
                let had_tool_calls = tool_calls.has_tool_calls();
                for (index, call) in tool_calls.entries() {
                    let chunk =
                        build_tool_call_chunk(&ctx, index, call.id, call.name, call.arguments);
                    if tx.send(chunk).await.is_err() {
                        return Ok(());
                    }
                }

                let finish_reason = if had_tool_calls {
                    FinishReason::ToolCalls
                } else {
                    FinishReason::Stop
                };
                let done = build_done_chunk(&ctx, prompt_tokens, completion_tokens, finish_reason);
                let _ = tx.send(done).await;
                break;
            }
        }

        Ok(())
    }
}

#[async_trait]
impl ChatAdapter for OpenAiCompatAdapter {
    fn name(&self) -> &'static str {
        "openai-compat"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    fn supports_thinking(&self) -> bool {
        // Reasoning arrives as plain deltas when the model produces it; there
        // is no request-side gate on this protocol.
        false
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
        request: ChatRequest,
        output_schema: Value,
    ) -> LlmResult<Value> {
        let mut body = self.build_request_body(&request, false);
        body["response_format"] = json!({
            "type": "json_schema",
            "json_schema": {
                "name": "structured_output",
                "schema": output_schema,
                "strict": true,
            }
        });

        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(&self.config.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::NetworkError {
                message: e.to_string(),
            })?;

        let status = response.status().as_u16();
        let body_text = response.text().await.map_err(|e| LlmError::NetworkError {
            message: e.to_string(),
        })?;
        if status != 200 {
            return Err(parse_http_error(status, &body_text, "openai-compat"));
        }

        let parsed: CompletionResponse =
            serde_json::from_str(&body_text).map_err(|e| LlmError::ParseError {
                message: format!("failed to parse response: {}", e),
            })?;

        let raw_text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .unwrap_or_default();

        serde_json::from_str(&raw_text).map_err(|e| LlmError::ParseError {
            message: format!("structured output is not valid JSON: {}", e),
        })
    }
}

/// System prompts are newline-joined into one system message; assistant
/// tool-call turns carry `tool_calls` with `content: null` when the turn has
/// no text (some providers treat null and empty string differently).
fn convert_messages(request: &ChatRequest) -> Vec<Value> {
    let mut messages = Vec::new();

    if !request.system_prompts.is_empty() {
        messages.push(json!({
            "role": "system",
            "content": request.system_prompts.join("\n"),
        }));
    }

    for msg in &request.messages {
        messages.push(convert_message(msg));
    }

    messages
}

fn convert_message(msg: &Message) -> Value {
    match msg.role {
        MessageRole::User => json!({
            "role": "user",
            "content": msg.text(),
        }),
        MessageRole::Assistant => {
            if msg.tool_calls.is_empty() {
                return json!({
                    "role": "assistant",
                    "content": msg.text(),
                });
            }

            let tool_calls: Vec<Value> = msg
                .tool_calls
                .iter()
                .map(|tc| {
                    json!({
                        "id": tc.id,
                        "type": "function",
                        "function": {
                            "name": tc.name,
                            "arguments": tc.arguments.to_string(),
                        }
                    })
                })
                .collect();

            let content = match msg.content.as_deref().filter(|c| !c.is_empty()) {
                Some(text) => json!(text),
                None => Value::Null,
            };

            json!({
                "role": "assistant",
                "content": content,
                "tool_calls": tool_calls,
            })
        }
        MessageRole::Tool => json!({
            "role": "tool",
            "tool_call_id": msg.tool_call_id.as_deref().unwrap_or_default(),
            "content": msg.text(),
        }),
    }
}

/// One streamed Chat Completions chunk.
#[derive(Debug, Deserialize)]
struct CompletionChunk {
    #[serde(default)]
    id: String,
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: ChoiceDelta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ChoiceDelta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    reasoning_content: Option<String>,
    #[serde(default)]
    thinking: Option<String>,
    #[serde(default)]
    thinking_content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ToolCallDeltaWire>>,
}

#[derive(Debug, Deserialize)]
struct ToolCallDeltaWire {
    index: usize,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    function: Option<FunctionDeltaWire>,
}

#[derive(Debug, Default, Deserialize)]
struct FunctionDeltaWire {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

/// Non-streaming Chat Completions response.
#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<ResponseChoice>,
}

#[derive(Debug, Deserialize)]
struct ResponseChoice {
    #[serde(default)]
    message: Option<ResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}
