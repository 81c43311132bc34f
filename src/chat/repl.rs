//! The read-eval-print loop that ties input, the responder, and rendering together.

use futures::StreamExt;

use crate::chat::commands::{ChatCommand, parse_command};
use crate::chat::config::ChatConfig;
use crate::chat::input::{InputSource, Line};
use crate::chat::interrupt::Interrupt;
use crate::chat::responder::Responder;
use crate::client::Completions;
use crate::error::{Error, Result};
use crate::render::{Renderer, Style, StyleGuard};

const ECHO_PREFIX: &str = ">> ";

enum Flow {
    Continue,
    Exit,
}

/// An interactive chat session.
///
/// Reads one query at a time, sends it through the [`Responder`], and renders the reply as
/// it streams in.  Failed exchanges are reported and the loop returns to the prompt; Ctrl-C
/// ends the session immediately.
pub struct ChatRepl<C, I, R> {
    responder: Responder<C>,
    input: I,
    renderer: R,
    config: ChatConfig,
}

impl<C: Completions, I: InputSource, R: Renderer> ChatRepl<C, I, R> {
    pub fn new(responder: Responder<C>, input: I, renderer: R, config: ChatConfig) -> Self {
        Self {
            responder,
            input,
            renderer,
            config,
        }
    }

    pub fn responder(&self) -> &Responder<C> {
        &self.responder
    }

    pub fn input(&self) -> &I {
        &self.input
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Run until the user exits, input ends, or `interrupt` fires.
    ///
    /// A configured initial query is echoed and answered before the first prompt.
    pub async fn run(&mut self, interrupt: &Interrupt) -> Result<()> {
        let mut pending = self.config.initial_query.take().map(|query| {
            self.renderer
                .write(&format!("{ECHO_PREFIX}{query}"), Style::Prompt);
            self.renderer.newline();
            Line::Text(query)
        });

        loop {
            let line = match pending.take() {
                Some(line) => line,
                None => match self.input.read_line() {
                    Ok(line) => line,
                    Err(err) => {
                        self.input_failed(err)?;
                        continue;
                    }
                },
            };
            let text = match line {
                Line::Text(text) => text,
                Line::Interrupted | Line::Eof => break,
            };

            match parse_command(&text) {
                Some(ChatCommand::Exit) => break,
                Some(ChatCommand::Empty) => continue,
                Some(ChatCommand::Reset) => {
                    self.responder.reset();
                    continue;
                }
                Some(ChatCommand::Multi) => {
                    match self.input.read_multi_line() {
                        Ok(Line::Text(block)) => pending = Some(Line::Text(block)),
                        Ok(Line::Interrupted) | Ok(Line::Eof) => break,
                        Err(err) => self.input_failed(err)?,
                    }
                    continue;
                }
                None => {}
            }

            if matches!(self.converse(text, interrupt).await, Flow::Exit) {
                return Ok(());
            }
            if self.config.terminate {
                break;
            }
        }
        Ok(())
    }

    /// Editor and scratch-file failures cost one prompt; anything else ends the session.
    fn input_failed(&mut self, err: Error) -> Result<()> {
        match err {
            Error::Editor { .. } | Error::Io { .. } => {
                self.renderer.print_error(&err.to_string());
                Ok(())
            }
            err => Err(err),
        }
    }

    async fn converse(&mut self, text: String, interrupt: &Interrupt) -> Flow {
        interrupt.arm();
        let result = tokio::select! {
            biased;
            _ = interrupt.wait() => None,
            result = respond(&mut self.responder, &mut self.renderer, text) => Some(result),
        };
        let Some(result) = result else {
            tracing::debug!("exchange interrupted");
            return Flow::Exit;
        };
        if let Err(err) = result {
            tracing::debug!(error = %err, transport = err.is_transport(), "exchange failed");
            self.renderer.print_error(&err.to_string());
        }
        Flow::Continue
    }
}

async fn respond<C: Completions, R: Renderer>(
    responder: &mut Responder<C>,
    renderer: &mut R,
    text: String,
) -> Result<()> {
    let mut exchange = match responder.ask(text).await {
        Ok(exchange) => exchange,
        Err(Error::Protocol {
            finish_reason,
            content,
        }) => {
            if let Some(content) = content.filter(|c| !c.is_empty()) {
                StyleGuard::new(&mut *renderer).fragment(&content);
                renderer.newline();
            }
            renderer.print_warning(&format!(
                "reply ended early (finish reason: {finish_reason}); not added to the conversation"
            ));
            renderer.newline();
            return Ok(());
        }
        Err(err) => return Err(err),
    };

    {
        let mut guard = StyleGuard::new(&mut *renderer);
        while let Some(fragment) = exchange.next().await {
            guard.fragment(&fragment?);
        }
    }
    renderer.newline();
    renderer.newline();

    if let Some(reason) = exchange.finish_reason().filter(|r| !r.is_stop()) {
        renderer.print_warning(&format!("reply ended early (finish reason: {reason})"));
    }
    Ok(())
}
