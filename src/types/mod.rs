mod chat_completion;
mod chat_completion_chunk;
mod chat_completion_params;
mod finish_reason;
mod message;
mod model;
mod stream_event;

pub use chat_completion::{ChatCompletion, Choice, ResponseMessage, Usage};
pub use chat_completion_chunk::{ChatCompletionChunk, ChunkChoice, Delta};
pub use chat_completion_params::ChatCompletionParams;
pub use finish_reason::FinishReason;
pub use message::{Message, Role};
pub use model::{KnownModel, Model};
pub use stream_event::StreamEvent;
