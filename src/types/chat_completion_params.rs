use serde::{Deserialize, Serialize};

use crate::types::{Message, Model};

/// Body of a `POST /chat/completions` request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatCompletionParams {
    /// The model that will complete the conversation.
    pub model: Model,

    /// The conversation so far, oldest first, ending with the new user message.
    pub messages: Vec<Message>,

    /// Whether to receive the reply as a stream of server-sent events.
    #[serde(default)]
    pub stream: bool,
}

impl ChatCompletionParams {
    /// Create a new non-streaming request.
    pub fn new(model: Model, messages: Vec<Message>) -> Self {
        Self {
            model,
            messages,
            stream: false,
        }
    }

    /// Sets the streaming flag.
    pub fn with_stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }
}
