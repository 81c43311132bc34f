//! Terminal input: single lines, multi-line blocks, and hand-off to an external editor.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rustyline::config::{Config, EditMode};
use rustyline::error::ReadlineError;
use rustyline::{
    Cmd, ConditionalEventHandler, DefaultEditor, Event, EventContext, EventHandler, KeyEvent,
    RepeatCount,
};

use crate::chat::editor::edit_text;
use crate::error::Result;

const PROMPT: &str = ">> ";
const COLOR_PROMPT: &str = "\x1b[32m>> \x1b[0m";
const CONTINUATION_PROMPT: &str = ".. ";

/// One unit of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    /// Text entered by the user, possibly spanning several lines.
    Text(String),
    /// The user pressed Ctrl-C.
    Interrupted,
    /// Input is exhausted (Ctrl-D at an empty prompt).
    Eof,
}

/// A source of user input for the chat loop.
pub trait InputSource {
    /// Read one line of input.
    fn read_line(&mut self) -> Result<Line>;

    /// Read lines until end of input and join them with `\n`.
    ///
    /// End of input finishes the block; it is not reported as [`Line::Eof`].
    fn read_multi_line(&mut self) -> Result<Line>;
}

/// Accepts the current line and records that the user asked for the external editor.
struct EditorRequest(Arc<AtomicBool>);

impl ConditionalEventHandler for EditorRequest {
    fn handle(&self, _: &Event, _: RepeatCount, _: bool, _: &EventContext) -> Option<Cmd> {
        self.0.store(true, Ordering::SeqCst);
        Some(Cmd::AcceptLine)
    }
}

/// Interactive input from the terminal via rustyline.
///
/// Lines are edited in vi mode and kept in an in-memory history.  Ctrl-T opens the text
/// typed so far in the external editor; whatever is saved there becomes the input.
pub struct TerminalInput {
    editor: DefaultEditor,
    editor_command: String,
    wants_editor: Arc<AtomicBool>,
    prompt: &'static str,
}

impl TerminalInput {
    /// Creates terminal input that opens `editor_command` on Ctrl-T.
    pub fn new(editor_command: impl Into<String>, use_color: bool) -> Result<Self> {
        let config = Config::builder()
            .edit_mode(EditMode::Vi)
            .auto_add_history(false)
            .build();
        let mut editor = DefaultEditor::with_config(config)?;
        let wants_editor = Arc::new(AtomicBool::new(false));
        editor.bind_sequence(
            KeyEvent::ctrl('T'),
            EventHandler::Conditional(Box::new(EditorRequest(Arc::clone(&wants_editor)))),
        );
        Ok(Self {
            editor,
            editor_command: editor_command.into(),
            wants_editor,
            prompt: if use_color { COLOR_PROMPT } else { PROMPT },
        })
    }

    fn read(&mut self, prompt: &str) -> Result<RawLine> {
        self.wants_editor.store(false, Ordering::SeqCst);
        match self.editor.readline(prompt) {
            Ok(line) if self.wants_editor.swap(false, Ordering::SeqCst) => {
                Ok(RawLine::Edit(line))
            }
            Ok(line) => Ok(RawLine::Line(line)),
            Err(ReadlineError::Interrupted) => Ok(RawLine::Interrupted),
            Err(ReadlineError::Eof) => Ok(RawLine::Eof),
            Err(err) => Err(err.into()),
        }
    }

    fn remember(&mut self, text: &str) {
        if !text.trim().is_empty() {
            let _ = self.editor.add_history_entry(text);
        }
    }
}

enum RawLine {
    Line(String),
    Edit(String),
    Interrupted,
    Eof,
}

impl InputSource for TerminalInput {
    fn read_line(&mut self) -> Result<Line> {
        let prompt = self.prompt;
        let line = match self.read(prompt)? {
            RawLine::Line(line) => line,
            RawLine::Edit(draft) => edit_text(&self.editor_command, &draft)?,
            RawLine::Interrupted => return Ok(Line::Interrupted),
            RawLine::Eof => return Ok(Line::Eof),
        };
        self.remember(&line);
        Ok(Line::Text(line))
    }

    fn read_multi_line(&mut self) -> Result<Line> {
        let mut lines = Vec::new();
        loop {
            match self.read(CONTINUATION_PROMPT)? {
                RawLine::Line(line) => lines.push(line),
                RawLine::Edit(draft) => {
                    lines.push(draft);
                    let text = edit_text(&self.editor_command, &lines.join("\n"))?;
                    return Ok(Line::Text(text));
                }
                RawLine::Interrupted => return Ok(Line::Interrupted),
                RawLine::Eof => return Ok(Line::Text(lines.join("\n"))),
            }
        }
    }
}

/// Input replayed from a fixed script, for driving the chat loop without a terminal.
///
/// Each entry is one line.  Multi-line reads consume entries up to the next [`Line::Eof`].
#[derive(Debug, Clone, Default)]
pub struct ScriptedInput {
    lines: VecDeque<Line>,
}

impl ScriptedInput {
    /// Creates a script from lines of text.
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_lines(lines.into_iter().map(|s| Line::Text(s.into())))
    }

    /// Creates a script that may also contain interrupts and end-of-input markers.
    pub fn from_lines(lines: impl IntoIterator<Item = Line>) -> Self {
        Self {
            lines: lines.into_iter().collect(),
        }
    }

    /// Number of unread entries.
    pub fn remaining(&self) -> usize {
        self.lines.len()
    }
}

impl InputSource for ScriptedInput {
    fn read_line(&mut self) -> Result<Line> {
        Ok(self.lines.pop_front().unwrap_or(Line::Eof))
    }

    fn read_multi_line(&mut self) -> Result<Line> {
        let mut lines = Vec::new();
        loop {
            match self.lines.pop_front() {
                Some(Line::Text(line)) => lines.push(line),
                Some(Line::Interrupted) => return Ok(Line::Interrupted),
                Some(Line::Eof) | None => return Ok(Line::Text(lines.join("\n"))),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripted_lines_then_eof() {
        let mut input = ScriptedInput::new(["hello", "exit"]);
        assert_eq!(input.read_line().unwrap(), Line::Text("hello".to_string()));
        assert_eq!(input.read_line().unwrap(), Line::Text("exit".to_string()));
        assert_eq!(input.read_line().unwrap(), Line::Eof);
    }

    #[test]
    fn multi_line_joins_until_eof() {
        let mut input = ScriptedInput::from_lines([
            Line::Text("first".to_string()),
            Line::Text("".to_string()),
            Line::Text("third".to_string()),
            Line::Eof,
            Line::Text("after".to_string()),
        ]);
        assert_eq!(
            input.read_multi_line().unwrap(),
            Line::Text("first\n\nthird".to_string())
        );
        assert_eq!(input.remaining(), 1);
    }

    #[test]
    fn multi_line_interrupt() {
        let mut input =
            ScriptedInput::from_lines([Line::Text("first".to_string()), Line::Interrupted]);
        assert_eq!(input.read_multi_line().unwrap(), Line::Interrupted);
    }
}
