//! The streaming responder: sends the conversation and yields the reply as it arrives.

use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

use futures::{Stream, StreamExt};

use crate::chat::session::SessionStore;
use crate::client::{Completions, EventStream};
use crate::error::{Error, Result};
use crate::observability::{
    EXCHANGE_DURATION, EXCHANGE_FAILURES, EXCHANGE_FIRST_FRAGMENT, EXCHANGE_FRAGMENTS, EXCHANGES,
};
use crate::types::{
    ChatCompletionChunk, ChatCompletionParams, FinishReason, Message, Model, StreamEvent,
};

/// How replies are requested from the service.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum ResponseMode {
    /// Server-sent events, one fragment at a time.
    #[default]
    Streaming,
    /// One complete reply per request.
    Blocking,
}

/// Sends each user utterance together with the session history and records the exchange.
///
/// The responder owns the [`SessionStore`]; only completed exchanges reach it.
pub struct Responder<C> {
    client: C,
    model: Model,
    mode: ResponseMode,
    session: SessionStore,
}

impl<C: Completions> Responder<C> {
    /// Creates a responder with an empty session.
    pub fn new(client: C, model: Model, mode: ResponseMode) -> Self {
        Self {
            client,
            model,
            mode,
            session: SessionStore::new(),
        }
    }

    /// The conversation so far.
    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    /// Start a fresh conversation.
    pub fn reset(&mut self) {
        self.session.reset();
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn set_model(&mut self, model: Model) {
        self.model = model;
    }

    pub fn mode(&self) -> ResponseMode {
        self.mode
    }

    /// Send `content` as the next user message.
    ///
    /// The request carries the session history followed by the new message.  The returned
    /// [`Exchange`] yields the reply's fragments; it appends the user message and the
    /// assembled reply to the session once it has been drained without error.
    ///
    /// In blocking mode a finish reason other than `stop` fails with [`Error::Protocol`]
    /// carrying whatever content arrived, and nothing is recorded.
    pub async fn ask(&mut self, content: impl Into<String>) -> Result<Exchange<'_>> {
        let user = Message::user(content);
        let mut messages = self.session.snapshot().to_vec();
        messages.push(user.clone());
        let params = ChatCompletionParams::new(self.model.clone(), messages);
        let started = Instant::now();
        tracing::debug!(
            model = %self.model,
            history = self.session.len(),
            mode = ?self.mode,
            "starting exchange"
        );

        let (source, finish_reason) = match self.mode {
            ResponseMode::Streaming => {
                let events = self
                    .client
                    .stream(params.with_stream(true))
                    .await
                    .map_err(failed)?;
                (Source::Events(events), None)
            }
            ResponseMode::Blocking => {
                let completion = self.client.send(params).await.map_err(failed)?;
                let choice = completion
                    .choices
                    .into_iter()
                    .next()
                    .ok_or_else(|| failed(Error::serialization("response has no choices", None)))?;
                if let Some(reason) = choice.finish_reason.as_ref().filter(|r| !r.is_stop()) {
                    return Err(failed(Error::protocol(
                        reason.to_string(),
                        choice.message.content,
                    )));
                }
                let text = choice.message.content.filter(|text| !text.is_empty());
                (Source::Single(text), choice.finish_reason)
            }
        };

        Ok(Exchange {
            session: &mut self.session,
            user: Some(user),
            source,
            content: String::new(),
            finish_reason,
            state: State::Open,
            started,
            fragments: 0,
        })
    }
}

fn failed(err: Error) -> Error {
    EXCHANGE_FAILURES.click();
    tracing::debug!(error = %err, "exchange failed");
    err
}

enum Source {
    Events(EventStream),
    Single(Option<String>),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum State {
    Open,
    Committed,
    Failed,
}

/// One in-flight exchange.
///
/// Yields each non-empty fragment of the reply in arrival order.  When the reply ends the
/// user message and the concatenated fragments are appended to the session as one pair.
/// An error ends the exchange without touching the session, as does dropping it early.
pub struct Exchange<'a> {
    session: &'a mut SessionStore,
    user: Option<Message>,
    source: Source,
    content: String,
    finish_reason: Option<FinishReason>,
    state: State,
    started: Instant,
    fragments: u64,
}

impl Exchange<'_> {
    /// The reply text received so far.
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Why the service stopped generating, once it has said so.
    pub fn finish_reason(&self) -> Option<&FinishReason> {
        self.finish_reason.as_ref()
    }

    /// True once the exchange has been recorded in the session.
    pub fn is_complete(&self) -> bool {
        self.state == State::Committed
    }

    /// Drain the exchange and return the full reply.
    pub async fn collect_text(mut self) -> Result<String> {
        while let Some(fragment) = self.next().await {
            fragment?;
        }
        Ok(std::mem::take(&mut self.content))
    }

    fn next_event(&mut self, cx: &mut Context<'_>) -> Poll<Option<Result<StreamEvent>>> {
        match &mut self.source {
            Source::Events(events) => events.as_mut().poll_next(cx),
            Source::Single(text) => Poll::Ready(
                text.take()
                    .map(|text| Ok(StreamEvent::Chunk(ChatCompletionChunk::text(text)))),
            ),
        }
    }

    fn record_fragment(&mut self, fragment: &str) {
        if self.fragments == 0 {
            EXCHANGE_FIRST_FRAGMENT.add(self.started.elapsed().as_secs_f64());
        }
        self.fragments += 1;
        EXCHANGE_FRAGMENTS.click();
        self.content.push_str(fragment);
    }

    fn commit(&mut self) {
        if let Some(user) = self.user.take() {
            self.session
                .append_exchange(user, Message::assistant(self.content.clone()));
        }
        self.state = State::Committed;
        EXCHANGES.click();
        EXCHANGE_DURATION.add(self.started.elapsed().as_secs_f64());
        tracing::debug!(
            fragments = self.fragments,
            chars = self.content.len(),
            finish_reason = ?self.finish_reason,
            "exchange complete"
        );
    }
}

impl Stream for Exchange<'_> {
    type Item = Result<String>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            if this.state != State::Open {
                return Poll::Ready(None);
            }
            match this.next_event(cx) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(Some(Ok(StreamEvent::Chunk(chunk)))) => {
                    if let Some(reason) = chunk.finish_reason() {
                        this.finish_reason = Some(reason.clone());
                    }
                    match chunk.fragment() {
                        Some(fragment) => {
                            this.record_fragment(fragment);
                            return Poll::Ready(Some(Ok(fragment.to_string())));
                        }
                        None => {
                            tracing::trace!("skipping chunk without text");
                            continue;
                        }
                    }
                }
                Poll::Ready(Some(Ok(StreamEvent::Done))) | Poll::Ready(None) => {
                    this.commit();
                    return Poll::Ready(None);
                }
                Poll::Ready(Some(Err(err))) => {
                    this.state = State::Failed;
                    return Poll::Ready(Some(Err(failed(err))));
                }
            }
        }
    }
}

impl Drop for Exchange<'_> {
    fn drop(&mut self) {
        if self.state == State::Open {
            tracing::debug!(
                received = self.content.len(),
                "discarding unfinished exchange"
            );
        }
    }
}
