//! Stream Accumulators
//!
//! Stateful reducers that fold provider deltas into running totals. One
//! accumulator instance is scoped to a single response/turn; adapters create
//! fresh ones per request.

use std::collections::BTreeMap;

/// Accumulates content and thinking text for one streamed response.
#[derive(Debug, Default)]
pub struct ContentAccumulator {
    content: String,
    thinking: String,
    signature: String,
}

impl ContentAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a content delta; returns the new cumulative content.
    pub fn append_content(&mut self, delta: &str) -> &str {
        self.content.push_str(delta);
        &self.content
    }

    /// Append a thinking delta; returns the new cumulative thinking text.
    pub fn append_thinking(&mut self, delta: &str) -> &str {
        self.thinking.push_str(delta);
        &self.thinking
    }

    pub fn set_signature(&mut self, signature: impl Into<String>) {
        self.signature = signature.into();
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn thinking(&self) -> &str {
        &self.thinking
    }

    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// Clear thinking text and signature. Called when a new thinking block
    /// begins; segments do not span multiple content blocks.
    pub fn reset_thinking(&mut self) {
        self.thinking.clear();
        self.signature.clear();
    }

    /// Clear all channels.
    pub fn reset(&mut self) {
        self.content.clear();
        self.reset_thinking();
    }
}

/// One in-progress tool call.
///
/// `arguments` is built by append-only concatenation of partial JSON
/// fragments and is not guaranteed parseable until the terminal event for
/// this index arrives.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolCallState {
    pub id: String,
    pub name: String,
    pub arguments: String,
}

/// Partial tool-call data from one stream delta.
#[derive(Debug, Clone, Default)]
pub struct ToolCallDelta {
    pub id: Option<String>,
    pub name: Option<String>,
    pub arguments: Option<String>,
}

/// Accumulates tool calls keyed by zero-based stream index.
///
/// A `BTreeMap` keeps the index-ordered iteration the finish-time flush
/// requires.
#[derive(Debug, Default)]
pub struct ToolCallAccumulator {
    calls: BTreeMap<usize, ToolCallState>,
}

impl ToolCallAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or update the entry at `index`.
    ///
    /// `id` and `name` are overwritten when supplied (they typically arrive
    /// once, at block start); `arguments` is appended, never overwritten.
    pub fn update(&mut self, index: usize, partial: ToolCallDelta) {
        let call = self.calls.entry(index).or_default();
        if let Some(id) = partial.id.filter(|s| !s.is_empty()) {
            call.id = id;
        }
        if let Some(name) = partial.name.filter(|s| !s.is_empty()) {
            call.name = name;
        }
        if let Some(arguments) = partial.arguments {
            call.arguments.push_str(&arguments);
        }
    }

    pub fn get(&self, index: usize) -> Option<&ToolCallState> {
        self.calls.get(&index)
    }

    /// Index-ordered snapshot of all accumulated calls.
    pub fn entries(&self) -> Vec<(usize, ToolCallState)> {
        self.calls.iter().map(|(i, c)| (*i, c.clone())).collect()
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.calls.is_empty()
    }

    pub fn clear(&mut self) {
        self.calls.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_concatenates_in_order() {
        let mut acc = ContentAccumulator::new();
        assert_eq!(acc.append_content("Hel"), "Hel");
        assert_eq!(acc.append_content("lo "), "Hello ");
        assert_eq!(acc.append_content("world"), "Hello world");
        assert_eq!(acc.content(), "Hello world");
    }

    #[test]
    fn test_thinking_channel_independent_of_content() {
        let mut acc = ContentAccumulator::new();
        acc.append_content("answer");
        assert_eq!(acc.append_thinking("step 1. "), "step 1. ");
        assert_eq!(acc.append_thinking("step 2."), "step 1. step 2.");
        assert_eq!(acc.content(), "answer");
    }

    #[test]
    fn test_reset_thinking_clears_signature_keeps_content() {
        let mut acc = ContentAccumulator::new();
        acc.append_content("kept");
        acc.append_thinking("scratch");
        acc.set_signature("sig_1");

        acc.reset_thinking();
        assert_eq!(acc.thinking(), "");
        assert_eq!(acc.signature(), "");
        assert_eq!(acc.content(), "kept");
    }

    #[test]
    fn test_reset_clears_all_channels() {
        let mut acc = ContentAccumulator::new();
        acc.append_content("c");
        acc.append_thinking("t");
        acc.set_signature("s");

        acc.reset();
        assert_eq!(acc.content(), "");
        assert_eq!(acc.thinking(), "");
        assert_eq!(acc.signature(), "");
    }

    #[test]
    fn test_tool_call_arguments_append() {
        let mut acc = ToolCallAccumulator::new();
        acc.update(
            0,
            ToolCallDelta {
                arguments: Some("a".to_string()),
                ..Default::default()
            },
        );
        acc.update(
            0,
            ToolCallDelta {
                arguments: Some("b".to_string()),
                ..Default::default()
            },
        );

        assert_eq!(acc.get(0).unwrap().arguments, "ab");
    }

    #[test]
    fn test_tool_call_id_overwritten_keeps_latest() {
        let mut acc = ToolCallAccumulator::new();
        acc.update(
            0,
            ToolCallDelta {
                id: Some("call_old".to_string()),
                ..Default::default()
            },
        );
        acc.update(
            0,
            ToolCallDelta {
                id: Some("call_new".to_string()),
                ..Default::default()
            },
        );

        assert_eq!(acc.get(0).unwrap().id, "call_new");
    }

    #[test]
    fn test_empty_id_does_not_clobber() {
        let mut acc = ToolCallAccumulator::new();
        acc.update(
            0,
            ToolCallDelta {
                id: Some("call_1".to_string()),
                name: Some("web_search".to_string()),
                ..Default::default()
            },
        );
        acc.update(
            0,
            ToolCallDelta {
                id: Some(String::new()),
                arguments: Some("{}".to_string()),
                ..Default::default()
            },
        );

        let call = acc.get(0).unwrap();
        assert_eq!(call.id, "call_1");
        assert_eq!(call.name, "web_search");
    }

    #[test]
    fn test_entries_index_ordered() {
        let mut acc = ToolCallAccumulator::new();
        for index in [2, 0, 1] {
            acc.update(
                index,
                ToolCallDelta {
                    id: Some(format!("call_{}", index)),
                    ..Default::default()
                },
            );
        }

        let indices: Vec<usize> = acc.entries().iter().map(|(i, _)| *i).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn test_has_and_clear() {
        let mut acc = ToolCallAccumulator::new();
        assert!(!acc.has_tool_calls());

        acc.update(0, ToolCallDelta::default());
        assert!(acc.has_tool_calls());

        acc.clear();
        assert!(!acc.has_tool_calls());
        assert!(acc.get(0).is_none());
    }
}
