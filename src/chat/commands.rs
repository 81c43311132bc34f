//! Reserved input tokens for the chat loop.
//!
//! A handful of literal inputs control the session instead of being sent to the service.
//! They are recognized before anything else happens to a line of input.

/// A parsed chat command.
///
/// These commands control the chat loop and are never sent to the service.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    /// Exit the chat application (`exit`, `exit()`).
    Exit,

    /// Discard the conversation history (`reset`, `reset()`).
    Reset,

    /// Read this turn as multiple lines (`multi`, `multi()`, `m`).
    Multi,

    /// Nothing was entered; prompt again.
    Empty,
}

/// Parses a line of input into a command.
///
/// Surrounding whitespace is ignored.  Returns `None` when the input is conversation
/// content that should be sent as-is.
pub fn parse_command(input: &str) -> Option<ChatCommand> {
    match input.trim() {
        "" => Some(ChatCommand::Empty),
        "exit" | "exit()" => Some(ChatCommand::Exit),
        "reset" | "reset()" => Some(ChatCommand::Reset),
        "multi" | "multi()" | "m" => Some(ChatCommand::Multi),
        _ => None,
    }
}

/// Returns help text describing the reserved inputs.
pub fn help_text() -> &'static str {
    r#"Reserved inputs:
  exit, exit()          Exit the chat
  reset, reset()        Start a new conversation
  multi, multi(), m     Enter several lines; finish with Ctrl-D

Keys:
  Ctrl-T                Edit the current line in $VISUAL or $EDITOR
  Ctrl-C                Quit immediately
"#
}
