//! Interactive chat over an OpenAI-compatible completion service.
//!
//! # Architecture
//!
//! - [`config`]: CLI argument parsing, configuration and credentials
//! - [`session`]: the conversation history
//! - [`responder`]: sends the conversation and streams the reply back
//! - [`commands`]: reserved input tokens
//! - [`input`] and [`editor`]: line, multi-line, and external-editor input
//! - [`repl`]: the loop tying these together

pub mod commands;
pub mod config;
pub mod editor;
pub mod input;
pub mod interrupt;
pub mod repl;
pub mod responder;
pub mod session;

pub use crate::render::{HeadingPolicy, PlainTextRenderer, Renderer, Style, StyleGuard};
pub use commands::{ChatCommand, help_text, parse_command};
pub use config::{ChatArgs, ChatConfig, Credentials, DEFAULT_EDITOR};
pub use editor::edit_text;
pub use input::{InputSource, Line, ScriptedInput, TerminalInput};
pub use interrupt::Interrupt;
pub use repl::ChatRepl;
pub use responder::{Exchange, Responder, ResponseMode};
pub use session::SessionStore;
