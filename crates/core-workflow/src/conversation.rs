// SPDX-License-Identifier: Apache-2.0
use std::sync::Mutex;

use uuid::Uuid;

use crate::message::Message;

/// §4.5: the one active Conversation, held by the wiring layer as an
/// explicit `Arc<ConversationStore>` rather than a module-level static
/// (per the anti-singleton design note — callers are handed the Arc,
/// never reach for a global).
#[derive(Debug)]
pub struct ConversationStore {
    id: String,
    messages: Mutex<Vec<Message>>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            messages: Mutex::new(Vec::new()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Mutex-protected; insertion order is preserved under all
    /// concurrency and no message is ever mutated afterward.
    pub fn append(&self, message: Message) {
        self.messages
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(message);
    }

    /// An immutable copy for read-only consumption by the LLM Gateway
    /// and the router.
    pub fn snapshot(&self) -> Vec<Message> {
        self.messages
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Role;

    #[test]
    fn append_preserves_insertion_order() {
        let store = ConversationStore::new();
        store.append(Message::user("first"));
        store.append(Message::assistant("second"));
        let snapshot = store.snapshot();
        assert_eq!(snapshot[0].content, "first");
        assert_eq!(snapshot[1].content, "second");
    }

    #[test]
    fn snapshot_is_a_copy_not_a_view() {
        let store = ConversationStore::new();
        store.append(Message::user("first"));
        let mut snapshot = store.snapshot();
        snapshot.push(Message::new(Role::System, "mutated locally only"));
        assert_eq!(store.snapshot().len(), 1);
    }

    #[test]
    fn each_store_has_a_distinct_id() {
        let a = ConversationStore::new();
        let b = ConversationStore::new();
        assert_ne!(a.id(), b.id());
    }
}
