//! Chat Route
//!
//! POST /api/chat: accepts a conversation plus optional per-request settings
//! and prior thinking history, optionally augments the system prompt through
//! the context patch engine, then drives the selected provider adapter and
//! re-serializes the canonical chunk stream as an outbound SSE response.
//!
//! Server-side `web_search` calls are executed in a bounded loop: the
//! assistant turn and its tool results are appended to the conversation and
//! the adapter is re-invoked, at most [`MAX_TOOL_ITERATIONS`] times. Turns
//! ending in client tools (interview) or a plain stop terminate the loop.

use std::convert::Infallible;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{self, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use bytes::Bytes;
use futures::Stream;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::{CancellationToken, DropGuard};

use ponder_core::{
    interview_tool, FinishReason, StreamChunk, ThinkingHistoryItem, ThinkingHistoryStore,
    ToolCallPayload,
};
use ponder_llm::{
    adapter_for, AdapterConfig, ChatAdapter, ChatRequest, Message, MessageRole, ToolCallRequest,
};
use ponder_patches::{
    build_detection_prompt, build_injection_content, detect_patches, load_patches,
    parse_detection_response,
};

use crate::state::AppState;
use crate::tools::web_search::{run_web_search, web_search_tool, WEB_SEARCH_TOOL_NAME};

/// Compact facilitator prompt. The full staged dialogue strategy is authored
/// outside this crate; this stands in for it.
const SYSTEM_PROMPT: &str = "\
You are a thinking facilitator. Guide the user through a five-stage process \
(define, diverge, structure, converge, stress-test) to think one problem \
through. Do not decide for the user; help them see clearly, and advance one \
way only. Interact exclusively through the interview tool: every reply must \
call it with 1-4 questions, each offering 2-4 options, except the final \
written summary. Never generate an \"other\" option; the frontend adds one. \
Prefer multiSelect while exploring and single-select while converging. After \
the stress-test stage, output a Markdown document summarizing the problem, \
the possibilities explored, the chosen direction with its costs, and \
stop-loss conditions.";

const MAX_TOOL_ITERATIONS: usize = 20;

/// Non-standard status for a request the client abandoned.
const CLIENT_CLOSED_REQUEST: u16 = 499;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatApiRequest {
    pub messages: Vec<Message>,
    #[serde(default)]
    pub settings: Option<RequestSettings>,
    /// Signed thinking segments from prior turns, in order of appearance.
    #[serde(default)]
    pub thinking_history: Vec<ThinkingHistoryEntry>,
}

/// Per-request overrides of the server's environment defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestSettings {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ThinkingHistoryEntry {
    pub id: String,
    pub thinking: String,
    pub signature: String,
}

/// SSE response body over the chat loop's output channel.
///
/// Holds a [`DropGuard`]: when the client disconnects and axum drops the
/// body, the guard cancels the in-flight provider work.
pub struct SseResponse {
    rx: ReceiverStream<String>,
    _cancel_guard: DropGuard,
}

impl SseResponse {
    fn new(rx: ReceiverStream<String>, cancel_guard: DropGuard) -> Self {
        Self {
            rx,
            _cancel_guard: cancel_guard,
        }
    }
}

impl Stream for SseResponse {
    type Item = Result<Bytes, Infallible>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.get_mut().rx)
            .poll_next(cx)
            .map(|opt| opt.map(|s| Ok(Bytes::from(s))))
    }
}

impl IntoResponse for SseResponse {
    fn into_response(self) -> Response {
        let body = axum::body::Body::from_stream(self);

        http::Response::builder()
            .header("Content-Type", "text/event-stream")
            .header("Cache-Control", "no-cache")
            .header("Connection", "keep-alive")
            .body(body)
            .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
    }
}

pub async fn chat_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ChatApiRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(json) => json,
        Err(rejection) => {
            // A client that aborts mid-request surfaces as a failed body read.
            let status = match &rejection {
                JsonRejection::BytesRejection(_) => StatusCode::from_u16(CLIENT_CLOSED_REQUEST)
                    .unwrap_or(StatusCode::BAD_REQUEST),
                _ => StatusCode::BAD_REQUEST,
            };
            return (status, Json(json!({"error": rejection.body_text()}))).into_response();
        }
    };

    let settings = request.settings.unwrap_or_default();
    let model = settings.model.unwrap_or_else(|| state.config.model.clone());
    let api_key = settings
        .api_key
        .or_else(|| state.config.api_key.clone())
        .unwrap_or_default();
    let base_url = settings.base_url.or_else(|| state.config.base_url.clone());

    if api_key.is_empty() {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": "Missing OPENAI_API_KEY"})),
        )
            .into_response();
    }

    tracing::info!(model = %model, "chat request");

    let system_prompt =
        resolve_system_prompt(&state, &request.messages, &api_key, base_url.as_deref(), &model)
            .await;

    let mut history = ThinkingHistoryStore::new();
    for entry in &request.thinking_history {
        history.save(
            &entry.id,
            ThinkingHistoryItem {
                thinking: entry.thinking.clone(),
                signature: entry.signature.clone(),
            },
        );
    }

    let chat_request = ChatRequest {
        messages: request.messages,
        system_prompts: vec![system_prompt],
        tools: vec![interview_tool(), web_search_tool()],
        ..Default::default()
    };

    let adapter = adapter_for(AdapterConfig {
        api_key,
        base_url,
        model,
    });

    let cancel = CancellationToken::new();
    let cancel_guard = cancel.clone().drop_guard();
    let (tx, rx) = mpsc::channel::<String>(64);

    tokio::spawn(run_chat_loop(
        adapter,
        chat_request,
        history,
        state.clone(),
        tx,
        cancel,
    ));

    SseResponse::new(ReceiverStream::new(rx), cancel_guard).into_response()
}

/// Run the context patch pipeline over the last user message.
///
/// Classification runs serially before the main call since its result must
/// be part of that call's input. Every failure on this path degrades to
/// "no injection" with a warning; it never blocks the main response.
async fn resolve_system_prompt(
    state: &AppState,
    messages: &[Message],
    api_key: &str,
    base_url: Option<&str>,
    model: &str,
) -> String {
    let patches = load_patches(&state.config.patches_dir);
    if patches.is_empty() {
        return SYSTEM_PROMPT.to_string();
    }

    let Some(user_content) = messages
        .iter()
        .rev()
        .find(|m| m.role == MessageRole::User)
        .map(|m| m.text())
        .filter(|t| !t.is_empty())
    else {
        return SYSTEM_PROMPT.to_string();
    };

    let detection_prompt = build_detection_prompt(&patches, user_content);
    let base_url = base_url.unwrap_or("https://api.openai.com/v1");

    let verdict =
        match detect_patches(&state.client, &detection_prompt, api_key, base_url, model).await {
            Ok(verdict) => verdict,
            Err(e) => {
                tracing::warn!(error = %e, "patch detection failed");
                return SYSTEM_PROMPT.to_string();
            }
        };

    let matches = parse_detection_response(&verdict);
    if !matches.is_empty() {
        let ids: Vec<&str> = matches.iter().map(|m| m.patch_id.as_str()).collect();
        tracing::info!(patches = %ids.join(", "), "context patches matched");
    }

    let injection = build_injection_content(&patches, &matches);
    if injection.is_empty() {
        SYSTEM_PROMPT.to_string()
    } else {
        format!("{}{}", SYSTEM_PROMPT, injection)
    }
}

#[derive(Default)]
struct TurnOutcome {
    text: String,
    tool_calls: Vec<ToolCallPayload>,
    finish: Option<FinishReason>,
    errored: bool,
    client_gone: bool,
}

/// Drive the adapter until the conversation settles, forwarding every chunk
/// as an SSE line. New signed thinking segments captured mid-loop replay
/// into the following iteration through the session store.
async fn run_chat_loop(
    adapter: Box<dyn ChatAdapter>,
    mut request: ChatRequest,
    mut history: ThinkingHistoryStore,
    state: Arc<AppState>,
    tx: mpsc::Sender<String>,
    cancel: CancellationToken,
) {
    for _ in 0..MAX_TOOL_ITERATIONS {
        request.thinking_history = history.replay_items();

        let (chunk_tx, mut chunk_rx) = mpsc::channel::<StreamChunk>(64);
        let stream = adapter.stream_chat(request.clone(), chunk_tx, cancel.clone());

        let forward = async {
            let mut turn = TurnOutcome::default();
            while let Some(chunk) = chunk_rx.recv().await {
                history.process_chunk(&chunk);
                match &chunk {
                    StreamChunk::Content { content, .. } => turn.text = content.clone(),
                    StreamChunk::ToolCall { tool_call, .. } => {
                        turn.tool_calls.push(tool_call.clone())
                    }
                    StreamChunk::Done { finish_reason, .. } => turn.finish = Some(*finish_reason),
                    StreamChunk::Error { .. } => turn.errored = true,
                    StreamChunk::Thinking { .. } => {}
                }

                let Ok(line) = serde_json::to_string(&chunk) else {
                    continue;
                };
                if tx.send(format!("data: {}\n\n", line)).await.is_err() {
                    turn.client_gone = true;
                    break;
                }
            }
            turn
        };

        let (stream_result, turn) = tokio::join!(stream, forward);
        history.clear_current();

        if let Err(e) = stream_result {
            tracing::error!(error = %e, "adapter failed before streaming");
            break;
        }
        if turn.client_gone
            || turn.errored
            || turn.finish != Some(FinishReason::ToolCalls)
            || turn.tool_calls.is_empty()
        {
            break;
        }

        // Only web_search runs server-side; anything else is answered by the
        // client, so the loop ends here.
        if turn
            .tool_calls
            .iter()
            .any(|tc| tc.function.name != WEB_SEARCH_TOOL_NAME)
        {
            break;
        }
        let Some(tavily_key) = state.config.tavily_api_key.clone() else {
            tracing::warn!("web_search requested but TAVILY_API_KEY is not set");
            break;
        };

        let tool_calls: Vec<ToolCallRequest> = turn
            .tool_calls
            .iter()
            .map(|tc| ToolCallRequest {
                id: tc.id.clone(),
                name: tc.function.name.clone(),
                arguments: serde_json::from_str(&tc.function.arguments).unwrap_or(Value::Null),
            })
            .collect();

        request.messages.push(Message {
            role: MessageRole::Assistant,
            content: (!turn.text.is_empty()).then(|| turn.text.clone()),
            tool_calls: tool_calls.clone(),
            tool_call_id: None,
        });

        for call in &tool_calls {
            let query = call
                .arguments
                .get("query")
                .and_then(|q| q.as_str())
                .unwrap_or_default();
            tracing::info!(query, "executing web search");
            let results = run_web_search(&state.client, &tavily_key, query).await;
            let content =
                serde_json::to_string(&results).unwrap_or_else(|_| r#"{"results":[]}"#.to_string());
            request.messages.push(Message::tool(call.id.clone(), content));
        }
    }

    let _ = tx.send("data: [DONE]\n\n".to_string()).await;
}
