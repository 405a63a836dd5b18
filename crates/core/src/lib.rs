//! Ponder Core
//!
//! Canonical chunk model, thinking history, and tool contracts for the Ponder
//! workspace. This crate has zero dependencies on application-level code
//! (HTTP server, LLM providers, patch loading, etc.).
//!
//! ## Module Organization
//!
//! - `error` - Core error types (`CoreError`, `CoreResult`)
//! - `chunk` - Canonical stream chunk variants and pure chunk builders
//! - `history` - Session-scoped thinking history store
//! - `tools` - Tool definition contract surfaced to models
//! - `interview` - Interview tool schema and bound validation
//!
//! ## Design Principles
//!
//! 1. **Zero external dependencies beyond serde/thiserror** - keeps build times minimal
//! 2. **Pure builders** - chunk assembly and token totals live in one place
//! 3. **Unidirectional dependency** - this crate depends on nothing else in the workspace

pub mod chunk;
pub mod error;
pub mod history;
pub mod interview;
pub mod tools;

// ── Error Types ────────────────────────────────────────────────────────
pub use error::{CoreError, CoreResult};

// ── Canonical Chunks ───────────────────────────────────────────────────
pub use chunk::{
    build_content_chunk, build_done_chunk, build_error_chunk, build_thinking_chunk,
    build_tool_call_chunk, now_millis, ChunkContext, ErrorPayload, FinishReason, StreamChunk,
    TokenUsage, ToolCallFunction, ToolCallPayload,
};

// ── Thinking History ───────────────────────────────────────────────────
pub use history::{CurrentThinking, ThinkingHistoryItem, ThinkingHistoryStore};

// ── Tool Contracts ─────────────────────────────────────────────────────
pub use tools::ToolDefinition;
pub use interview::{
    interview_tool, validate_interview_input, InterviewAnswer, InterviewInput, InterviewOption,
    InterviewOutput, InterviewQuestion, INTERVIEW_TOOL_NAME,
};
