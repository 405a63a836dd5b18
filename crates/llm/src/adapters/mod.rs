//! Provider Adapters
//!
//! One adapter per wire protocol family. Both drive the SSE frame reader and
//! the stream accumulators to emit the canonical chunk stream; the only
//! cross-adapter contract is the [`crate::provider::ChatAdapter`] trait and
//! the chunk variant set in `ponder-core`.

mod anthropic;
mod openai;

pub use anthropic::{AnthropicCompatAdapter, THINKING_BUDGET_TOKENS};
pub use openai::OpenAiCompatAdapter;
