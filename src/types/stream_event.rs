use crate::types::ChatCompletionChunk;

/// One event of a streamed chat completion.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// A `chat.completion.chunk` payload.
    Chunk(ChatCompletionChunk),

    /// The `[DONE]` end marker.
    Done,
}
