//! # Conversation Memory (C8)
//!
//! In-process, per-conversation bounded message history, guarded by a
//! `parking_lot::Mutex`. This is process memory only — history does not
//! survive a restart and is never written to disk.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::model::Message;

const MAX_HISTORY: usize = 20;

#[derive(Default)]
struct ConversationStoreInner {
    conversations: HashMap<String, Vec<Message>>,
}

/// Holds every conversation's history, created lazily on first message.
pub struct ConversationStore {
    inner: Mutex<ConversationStoreInner>,
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(ConversationStoreInner::default()),
        }
    }

    /// Append a message, trimming the history to the most recent
    /// [`MAX_HISTORY`] entries if it overflows.
    pub fn append(&self, conversation_id: &str, message: Message) {
        let mut guard = self.inner.lock();
        let history = guard
            .conversations
            .entry(conversation_id.to_string())
            .or_default();
        history.push(message);
        if history.len() > MAX_HISTORY {
            let overflow = history.len() - MAX_HISTORY;
            history.drain(0..overflow);
        }
    }

    /// The last `n` messages for a conversation, oldest first. Returns an
    /// empty vec for a conversation that doesn't exist yet.
    pub fn last_n(&self, conversation_id: &str, n: usize) -> Vec<Message> {
        let guard = self.inner.lock();
        match guard.conversations.get(conversation_id) {
            Some(history) => {
                let start = history.len().saturating_sub(n);
                history[start..].to_vec()
            }
            None => Vec::new(),
        }
    }

    pub fn conversation_count(&self) -> usize {
        self.inner.lock().conversations.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Role;
    use chrono::Utc;

    fn msg(content: &str) -> Message {
        Message {
            role: Role::User,
            content: content.to_string(),
            timestamp: Utc::now(),
            mode: None,
            sources: None,
        }
    }

    #[test]
    fn unknown_conversation_yields_empty_history() {
        let store = ConversationStore::new();
        assert!(store.last_n("nope", 6).is_empty());
    }

    #[test]
    fn history_is_bounded_to_twenty() {
        let store = ConversationStore::new();
        for i in 0..25 {
            store.append("c1", msg(&format!("message {i}")));
        }
        let all = store.last_n("c1", 25);
        assert_eq!(all.len(), 20);
        assert_eq!(all[0].content, "message 5");
        assert_eq!(all.last().unwrap().content, "message 24");
    }

    #[test]
    fn last_n_respects_window() {
        let store = ConversationStore::new();
        for i in 0..10 {
            store.append("c1", msg(&format!("m{i}")));
        }
        let window = store.last_n("c1", 6);
        assert_eq!(window.len(), 6);
        assert_eq!(window[0].content, "m4");
    }

    #[test]
    fn conversations_are_independent() {
        let store = ConversationStore::new();
        store.append("a", msg("hello a"));
        store.append("b", msg("hello b"));
        assert_eq!(store.last_n("a", 6).len(), 1);
        assert_eq!(store.last_n("b", 6).len(), 1);
        assert_eq!(store.conversation_count(), 2);
    }
}
