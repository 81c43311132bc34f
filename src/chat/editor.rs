//! External editor delegation.
//!
//! Writes the partially typed input to a scratch file, runs the user's editor on it, and
//! reads the result back.  The scratch file is removed on every path.

use std::env;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

use crate::error::{Error, Result};
use crate::observability::{EDITOR_FAILURES, EDITOR_INVOCATIONS};

/// Open `initial` in the editor `command` and return what the user saved.
///
/// `command` may carry arguments (`code --wait`); the scratch file path is appended as the
/// last argument.  Trailing newlines are stripped from the result.  A non-zero exit status
/// is an [`Error::Editor`].
pub fn edit_text(command: &str, initial: &str) -> Result<String> {
    edit_text_in(&env::temp_dir(), command, initial)
}

/// Like [`edit_text`], with the scratch file created in `dir`.
pub fn edit_text_in(dir: &Path, command: &str, initial: &str) -> Result<String> {
    EDITOR_INVOCATIONS.click();
    let result = run_editor(dir, command, initial);
    if let Err(err) = &result {
        EDITOR_FAILURES.click();
        tracing::warn!(error = %err, "external editor failed");
    }
    result
}

fn run_editor(dir: &Path, command: &str, initial: &str) -> Result<String> {
    let mut words = command.split_whitespace();
    let program = words
        .next()
        .ok_or_else(|| Error::editor("no editor command configured", None))?;

    let mut scratch = tempfile::Builder::new()
        .prefix("colloquy-")
        .suffix(".md")
        .tempfile_in(dir)
        .map_err(|e| Error::io("failed to create scratch file", e))?;
    scratch
        .write_all(initial.as_bytes())
        .and_then(|()| scratch.flush())
        .map_err(|e| Error::io("failed to write scratch file", e))?;

    tracing::debug!(editor = program, path = %scratch.path().display(), "launching editor");
    let status = Command::new(program)
        .args(words)
        .arg(scratch.path())
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .map_err(|e| Error::editor(format!("failed to launch {program}: {e}"), None))?;
    if !status.success() {
        return Err(Error::editor(
            format!("{program} exited unsuccessfully"),
            status.code(),
        ));
    }

    let text = fs::read_to_string(scratch.path())
        .map_err(|e| Error::io("failed to read scratch file", e))?;
    Ok(text.trim_end_matches(['\n', '\r']).to_string())
}
