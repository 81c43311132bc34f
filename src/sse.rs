//! Server-Sent Events (SSE) processing for streamed chat completions.
//!
//! The service sends one `data:` line per `chat.completion.chunk`, separated by blank
//! lines, and finishes with `data: [DONE]`.  Comment lines (leading `:`) are keep-alives.

use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};
use serde::Deserialize;

use crate::observability::{STREAM_BYTES, STREAM_ERRORS, STREAM_EVENTS};
use crate::{ChatCompletionChunk, Error, Result, StreamEvent};

/// Process a stream of bytes into a stream of completion events.
///
/// Bytes are buffered until a full event is available, so multi-byte characters and events
/// split across network reads decode correctly.  The stream ends after the `[DONE]` marker
/// or when the body ends, whichever comes first.
pub fn process_sse<S, E>(byte_stream: S) -> impl Stream<Item = Result<StreamEvent>>
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Unpin,
    E: std::error::Error + Send + Sync + 'static,
{
    let stream = byte_stream.map(|result| {
        result
            .map_err(|e| Error::streaming(format!("Error in HTTP stream: {e}"), Some(Box::new(e))))
    });

    let buffer: Vec<u8> = Vec::new();

    stream::unfold(
        (stream, buffer, false),
        move |(mut stream, mut buffer, done)| async move {
            if done {
                return None;
            }
            loop {
                if let Some((event, remaining)) = extract_event(&buffer) {
                    buffer = remaining;
                    match event {
                        Some(event) => {
                            let done = matches!(event, Ok(StreamEvent::Done));
                            if event.is_err() {
                                STREAM_ERRORS.click();
                            }
                            return Some((event, (stream, buffer, done)));
                        }
                        None => continue,
                    }
                }

                match stream.next().await {
                    Some(Ok(bytes)) => {
                        STREAM_BYTES.count(bytes.len() as u64);
                        buffer.extend_from_slice(&bytes);
                    }
                    Some(Err(e)) => {
                        STREAM_ERRORS.click();
                        return Some((Err(e), (stream, buffer, true)));
                    }
                    None => {
                        // A final event without its trailing blank line.
                        if !buffer.is_empty() {
                            buffer.extend_from_slice(b"\n\n");
                            if let Some((Some(event), _)) = extract_event(&buffer) {
                                return Some((event, (stream, Vec::new(), true)));
                            }
                        }
                        return None;
                    }
                }
            }
        },
    )
}

/// Extract one complete SSE event from the front of the buffer.
///
/// Returns `None` when no complete event is buffered yet.  The inner `Option` is `None` for
/// events that carry no data (keep-alive comments), which the caller skips.
fn extract_event(buffer: &[u8]) -> Option<(Option<Result<StreamEvent>>, Vec<u8>)> {
    let (end, separator_len) = find_separator(buffer)?;
    let rest = buffer[end + separator_len..].to_vec();

    let event_text = match std::str::from_utf8(&buffer[..end]) {
        Ok(text) => text,
        Err(e) => return Some((Some(Err(e.into())), rest)),
    };

    let mut data = Vec::new();
    for line in event_text.lines() {
        let line = line.trim_end_matches('\r');
        if let Some(value) = line.strip_prefix("data:") {
            data.push(value.strip_prefix(' ').unwrap_or(value));
        }
    }
    if data.is_empty() {
        return Some((None, rest));
    }

    let data = data.join("\n");
    STREAM_EVENTS.click();
    Some((Some(parse_data(&data)), rest))
}

/// Locate the first blank-line separator, accepting both `\n\n` and `\r\n\r\n`.
fn find_separator(buffer: &[u8]) -> Option<(usize, usize)> {
    let lf = buffer.windows(2).position(|w| w == b"\n\n").map(|i| (i, 2));
    let crlf = buffer
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .map(|i| (i, 4));
    match (lf, crlf) {
        (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
        (a, b) => a.or(b),
    }
}

fn parse_data(data: &str) -> Result<StreamEvent> {
    if data.trim() == "[DONE]" {
        return Ok(StreamEvent::Done);
    }

    #[derive(Deserialize)]
    struct ErrorEnvelope {
        error: ErrorDetail,
    }

    #[derive(Deserialize)]
    struct ErrorDetail {
        #[serde(rename = "type")]
        error_type: Option<String>,
        message: Option<String>,
    }

    if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(data) {
        return Err(Error::api(
            500,
            envelope
                .error
                .error_type
                .or_else(|| Some("stream_error".to_string())),
            envelope.error.message.unwrap_or_else(|| data.to_string()),
            None,
        ));
    }

    serde_json::from_str::<ChatCompletionChunk>(data)
        .map(StreamEvent::Chunk)
        .map_err(|e| {
            Error::serialization(
                format!("Failed to parse event JSON: {e}"),
                Some(Box::new(e)),
            )
        })
}
