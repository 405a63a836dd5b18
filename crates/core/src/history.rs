//! Thinking History Store
//!
//! Keyed store correlating a completed thinking segment (content + opaque
//! provider signature) with the assistant turn that produced it, so adapters
//! can replay the exact signed block on the next request.
//!
//! The store is an explicitly constructed, caller-owned object with
//! session-scoped lifetime: create one per conversation, tear it down on
//! reset. It keeps insertion order alongside the keyed map so replay is
//! deterministic even though lookups stay O(1).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::chunk::StreamChunk;

/// A completed, signed thinking segment keyed by provider message id.
///
/// Only persisted once the segment is marked complete and carries a non-empty
/// signature; an unsigned segment is provider-internal scratch data that
/// cannot be replayed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ThinkingHistoryItem {
    pub thinking: String,
    pub signature: String,
}

/// The latest in-progress thinking text, before any signature has arrived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentThinking {
    pub id: String,
    pub content: String,
}

/// Session-scoped store of signed thinking segments.
///
/// No eviction policy: entries accumulate for the lifetime of the session,
/// bounded only by conversation length.
#[derive(Debug, Default)]
pub struct ThinkingHistoryStore {
    items: HashMap<String, ThinkingHistoryItem>,
    /// Insertion order for deterministic replay.
    order: Vec<String>,
    current: Option<CurrentThinking>,
}

impl ThinkingHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Save a completed thinking item with its signature.
    pub fn save(&mut self, message_id: impl Into<String>, item: ThinkingHistoryItem) {
        let message_id = message_id.into();
        if !self.items.contains_key(&message_id) {
            self.order.push(message_id.clone());
        }
        self.items.insert(message_id, item);
    }

    /// Get a specific thinking item by message id.
    pub fn get(&self, message_id: &str) -> Option<&ThinkingHistoryItem> {
        self.items.get(message_id)
    }

    /// Snapshot of all items keyed by message id.
    pub fn all(&self) -> HashMap<String, ThinkingHistoryItem> {
        self.items.clone()
    }

    /// Items in insertion order, for positional replay against assistant turns.
    pub fn replay_items(&self) -> Vec<ThinkingHistoryItem> {
        self.order
            .iter()
            .filter_map(|id| self.items.get(id).cloned())
            .collect()
    }

    pub fn has_history(&self) -> bool {
        !self.items.is_empty()
    }

    /// Track current in-progress thinking (before a signature is received).
    pub fn set_current(&mut self, id: impl Into<String>, content: impl Into<String>) {
        self.current = Some(CurrentThinking {
            id: id.into(),
            content: content.into(),
        });
    }

    pub fn current(&self) -> Option<&CurrentThinking> {
        self.current.as_ref()
    }

    /// Clear in-progress thinking (call when streaming finishes).
    pub fn clear_current(&mut self) {
        self.current = None;
    }

    /// Clear everything (conversation reset).
    pub fn clear(&mut self) {
        self.items.clear();
        self.order.clear();
        self.current = None;
    }

    /// Process a thinking chunk from the stream.
    ///
    /// Every thinking chunk updates the in-progress pointer; the durable map
    /// is only written when the chunk reports completion with a signature.
    /// Non-thinking chunks are ignored.
    pub fn process_chunk(&mut self, chunk: &StreamChunk) {
        let StreamChunk::Thinking {
            id,
            content,
            signature,
            is_complete,
            ..
        } = chunk
        else {
            return;
        };

        self.set_current(id.clone(), content.clone());

        if *is_complete == Some(true) {
            if let Some(signature) = signature.as_deref().filter(|s| !s.is_empty()) {
                self.save(
                    id.clone(),
                    ThinkingHistoryItem {
                        thinking: content.clone(),
                        signature: signature.to_string(),
                    },
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::{build_thinking_chunk, ChunkContext};

    fn ctx(id: &str) -> ChunkContext {
        ChunkContext {
            id: id.to_string(),
            model: "claude-think".to_string(),
            timestamp: 0,
        }
    }

    #[test]
    fn test_save_and_get() {
        let mut store = ThinkingHistoryStore::new();
        store.save(
            "msg_1",
            ThinkingHistoryItem {
                thinking: "reasoning".to_string(),
                signature: "sig".to_string(),
            },
        );

        assert!(store.has_history());
        assert_eq!(store.get("msg_1").unwrap().thinking, "reasoning");
        assert!(store.get("msg_2").is_none());
    }

    #[test]
    fn test_process_chunk_persists_complete_signed_segment() {
        let mut store = ThinkingHistoryStore::new();

        let partial = build_thinking_chunk(&ctx("msg_1"), "partial", Some("partial".into()), None, false);
        store.process_chunk(&partial);
        assert!(!store.has_history());
        assert_eq!(store.current().unwrap().content, "partial");

        let complete =
            build_thinking_chunk(&ctx("msg_1"), "full reasoning", None, Some("sig_xyz".into()), true);
        store.process_chunk(&complete);

        let item = store.get("msg_1").unwrap();
        assert_eq!(item.thinking, "full reasoning");
        assert_eq!(item.signature, "sig_xyz");
    }

    #[test]
    fn test_complete_without_signature_not_persisted() {
        let mut store = ThinkingHistoryStore::new();
        let chunk = build_thinking_chunk(&ctx("msg_1"), "scratch", None, None, true);
        store.process_chunk(&chunk);

        assert!(!store.has_history());
        // The in-progress pointer still tracks it
        assert_eq!(store.current().unwrap().id, "msg_1");
    }

    #[test]
    fn test_replay_items_keep_insertion_order() {
        let mut store = ThinkingHistoryStore::new();
        for (id, text) in [("msg_b", "second"), ("msg_a", "first")] {
            store.save(
                id,
                ThinkingHistoryItem {
                    thinking: text.to_string(),
                    signature: "s".to_string(),
                },
            );
        }

        let items = store.replay_items();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].thinking, "second");
        assert_eq!(items[1].thinking, "first");
    }

    #[test]
    fn test_resave_same_id_does_not_duplicate_order() {
        let mut store = ThinkingHistoryStore::new();
        store.save(
            "msg_1",
            ThinkingHistoryItem {
                thinking: "v1".to_string(),
                signature: "s1".to_string(),
            },
        );
        store.save(
            "msg_1",
            ThinkingHistoryItem {
                thinking: "v2".to_string(),
                signature: "s2".to_string(),
            },
        );

        assert_eq!(store.replay_items().len(), 1);
        assert_eq!(store.get("msg_1").unwrap().thinking, "v2");
    }

    #[test]
    fn test_clear_resets_everything() {
        let mut store = ThinkingHistoryStore::new();
        store.save(
            "msg_1",
            ThinkingHistoryItem {
                thinking: "t".to_string(),
                signature: "s".to_string(),
            },
        );
        store.set_current("msg_1", "t");

        store.clear();
        assert!(!store.has_history());
        assert!(store.current().is_none());
        assert!(store.replay_items().is_empty());
    }
}
