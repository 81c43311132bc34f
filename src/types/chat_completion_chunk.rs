use serde::{Deserialize, Serialize};

use crate::types::{FinishReason, Role};

/// One `chat.completion.chunk` object from a streamed reply.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ChatCompletionChunk {
    /// Identifier shared by every chunk of one completion.
    #[serde(default)]
    pub id: String,

    /// The model producing the completion.
    #[serde(default)]
    pub model: String,

    /// Per-choice deltas; empty on some usage-only chunks.
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
}

/// The delta for one choice within a chunk.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ChunkChoice {
    /// Position of the choice.
    #[serde(default)]
    pub index: u32,

    /// The incremental change.
    #[serde(default)]
    pub delta: Delta,

    /// Set on the final chunk of the choice.
    #[serde(default)]
    pub finish_reason: Option<FinishReason>,
}

/// Incremental message content.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Delta {
    /// Present on the first chunk only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,

    /// The new text, if this chunk carries any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl ChatCompletionChunk {
    /// Build a chunk carrying one text fragment.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            choices: vec![ChunkChoice {
                delta: Delta {
                    role: None,
                    content: Some(content.into()),
                },
                ..ChunkChoice::default()
            }],
            ..Self::default()
        }
    }

    /// Build the role-only chunk that opens a stream.
    pub fn role(role: Role) -> Self {
        Self {
            choices: vec![ChunkChoice {
                delta: Delta {
                    role: Some(role),
                    content: None,
                },
                ..ChunkChoice::default()
            }],
            ..Self::default()
        }
    }

    /// Build the closing chunk that carries only a finish reason.
    pub fn finished(reason: FinishReason) -> Self {
        Self {
            choices: vec![ChunkChoice {
                finish_reason: Some(reason),
                ..ChunkChoice::default()
            }],
            ..Self::default()
        }
    }

    /// The text fragment of the first choice, if it is present and non-empty.
    pub fn fragment(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|choice| choice.delta.content.as_deref())
            .filter(|text| !text.is_empty())
    }

    /// The finish reason of the first choice, if this chunk carries one.
    pub fn finish_reason(&self) -> Option<&FinishReason> {
        self.choices
            .first()
            .and_then(|choice| choice.finish_reason.as_ref())
    }
}
