// Public modules
pub mod chat;
pub mod client;
pub mod error;
pub mod observability;
pub mod render;
pub mod sse;
pub mod types;

// Re-exports
pub use client::{Completions, DEFAULT_API_URL, EventStream, OpenAi};
pub use error::{Error, Result};
pub use observability::register_biometrics;
pub use types::*;
