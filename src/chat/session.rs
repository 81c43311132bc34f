//! Conversation history for one chat session.

use crate::observability::SESSION_RESETS;
use crate::types::Message;

/// The ordered history of a conversation.
///
/// Messages only ever enter the store as complete user/assistant pairs, so a user message
/// never appears without the reply it received.
#[derive(Debug, Default, Clone)]
pub struct SessionStore {
    messages: Vec<Message>,
}

impl SessionStore {
    /// Creates an empty session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one completed exchange.
    pub fn append_exchange(&mut self, user: Message, assistant: Message) {
        self.messages.reserve(2);
        self.messages.push(user);
        self.messages.push(assistant);
    }

    /// Discard the whole history.
    pub fn reset(&mut self) {
        tracing::debug!(discarded = self.messages.len(), "session reset");
        SESSION_RESETS.click();
        self.messages = Vec::new();
    }

    /// The current history, oldest first.
    pub fn snapshot(&self) -> &[Message] {
        &self.messages
    }

    /// Number of messages (twice the number of exchanges).
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// True when no exchange has completed since creation or the last reset.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// The most recent user message and its reply.
    pub fn last_exchange(&self) -> Option<(&Message, &Message)> {
        match self.messages.as_slice() {
            [.., user, assistant] => Some((user, assistant)),
            _ => None,
        }
    }
}
