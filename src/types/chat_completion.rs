use serde::{Deserialize, Serialize};

use crate::types::{FinishReason, Role};

/// A complete, non-streamed chat completion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatCompletion {
    /// Unique identifier of the completion.
    #[serde(default)]
    pub id: String,

    /// The model that produced the completion.
    #[serde(default)]
    pub model: String,

    /// Candidate replies; this client only ever requests one.
    pub choices: Vec<Choice>,

    /// Token accounting, when the service reports it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

/// One candidate reply of a [`ChatCompletion`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Choice {
    /// Position of the choice in the response.
    #[serde(default)]
    pub index: u32,

    /// The reply.
    pub message: ResponseMessage,

    /// Why generation stopped.
    #[serde(default)]
    pub finish_reason: Option<FinishReason>,
}

/// A reply message as returned by the service; the content may be null.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResponseMessage {
    /// Author of the reply.
    pub role: Role,

    /// Text of the reply.
    #[serde(default)]
    pub content: Option<String>,
}

/// Token usage reported by the service.
#[derive(Debug, Copy, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Usage {
    /// Tokens in the request.
    #[serde(default)]
    pub prompt_tokens: u64,

    /// Tokens in the reply.
    #[serde(default)]
    pub completion_tokens: u64,

    /// Sum of both.
    #[serde(default)]
    pub total_tokens: u64,
}

impl ChatCompletion {
    /// The first choice, which is the only one this client asks for.
    pub fn first_choice(&self) -> Option<&Choice> {
        self.choices.first()
    }
}
