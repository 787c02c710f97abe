//! Decoder for the `data: <json>` line protocol used by streaming chat completions.
//!
//! Network reads do not line up with frames, so the decoder keeps whatever follows the last
//! newline of a read and only decodes a line once its terminating `\n` has arrived. The
//! stream ends with a `data: [DONE]` line or when the connection closes.

use std::collections::VecDeque;
use std::pin::Pin;

use futures::stream::{Stream, StreamExt};

use crate::error::{Error, Result};
use crate::models::{Chunk, Completion};

const DONE: &str = "[DONE]";

/// A decoded unit of the completion stream.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Partial assistant text. The server may omit the content.
    Delta { content: Option<String> },
    /// The first choice carries a finish reason; no more text follows for this turn.
    Completed {
        finish_reason: String,
        sources: Option<Vec<Chunk>>,
    },
    /// The `data: [DONE]` sentinel.
    Done,
}

impl StreamEvent {
    /// Text to append for a delta. A missing content is the empty string.
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Delta { content } => Some(content.as_deref().unwrap_or_default()),
            _ => None,
        }
    }

    /// Returns true if nothing should be folded after this event.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Delta { .. })
    }
}

/// Incremental line decoder. Lives for the duration of one stream.
#[derive(Debug, Default)]
pub struct Decoder {
    buffer: Vec<u8>,
    finished: bool,
}

impl Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true once the `[DONE]` sentinel has been seen.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Feeds a fragment read from the network.
    ///
    /// Events for every complete line are pushed onto `events`. On error, the events decoded
    /// before the offending line are still in `events`.
    pub fn push(&mut self, fragment: &[u8], events: &mut VecDeque<StreamEvent>) -> Result<()> {
        if self.finished {
            return Ok(());
        }

        self.buffer.extend_from_slice(fragment);

        let mut start = 0;
        while let Some(offset) = self.buffer[start..].iter().position(|b| *b == b'\n') {
            let end = start + offset;
            let line = strip_cr(&self.buffer[start..end]).to_vec();
            start = end + 1;

            if let Err(e) = self.line(line, events) {
                self.buffer.drain(..start);
                return Err(e);
            }

            if self.finished {
                self.buffer.clear();
                return Ok(());
            }
        }

        self.buffer.drain(..start);

        Ok(())
    }

    /// Decodes a trailing line left without a newline when the connection closed.
    pub fn finish(&mut self, events: &mut VecDeque<StreamEvent>) -> Result<()> {
        if self.finished || self.buffer.is_empty() {
            return Ok(());
        }

        let buffer = std::mem::take(&mut self.buffer);
        self.line(strip_cr(&buffer).to_vec(), events)
    }

    fn line(&mut self, line: Vec<u8>, events: &mut VecDeque<StreamEvent>) -> Result<()> {
        let line = String::from_utf8(line)?;

        if let Some(event) = decode_line(&line)? {
            if event == StreamEvent::Done {
                tracing::event!(tracing::Level::INFO, "Stream terminated by [DONE]");
                self.finished = true;
            }
            events.push_back(event);
        }

        Ok(())
    }
}

fn strip_cr(line: &[u8]) -> &[u8] {
    line.strip_suffix(b"\r").unwrap_or(line)
}

/// Decodes a single line without its newline.
pub fn decode_line(line: &str) -> Result<Option<StreamEvent>> {
    if line.is_empty() || line.starts_with(':') {
        return Ok(None);
    }

    let payload = match line.split_once(':') {
        Some(("data", value)) => value.strip_prefix(' ').unwrap_or(value),
        Some(("event" | "id" | "retry", _)) => return Ok(None),
        _ => {
            return Err(Error::UnknownField {
                line: line.to_string(),
            })
        }
    };

    if payload == DONE {
        return Ok(Some(StreamEvent::Done));
    }

    let chunk: Completion = serde_json::from_str(payload).map_err(|source| Error::Frame {
        line: line.to_string(),
        source,
    })?;

    let Some(choice) = chunk.choices.into_iter().next() else {
        tracing::event!(tracing::Level::DEBUG, "Chunk without choices: {line}");
        return Ok(None);
    };

    let event = match choice.finish_reason {
        None => StreamEvent::Delta {
            content: choice.delta.and_then(|delta| delta.content),
        },
        Some(finish_reason) => StreamEvent::Completed {
            finish_reason,
            sources: choice.sources,
        },
    };

    Ok(Some(event))
}

struct State<S> {
    inner: Pin<Box<S>>,
    decoder: Decoder,
    pending: VecDeque<StreamEvent>,
    failure: Option<Error>,
    exhausted: bool,
}

/// Turns a stream of network reads into a stream of events.
///
/// The returned stream ends after `[DONE]`, when `inner` ends, or right after the first error.
/// Events decoded before an error are yielded before it.
pub fn decode<S, B, E>(inner: S) -> impl Stream<Item = Result<StreamEvent>>
where
    S: Stream<Item = std::result::Result<B, E>>,
    B: AsRef<[u8]>,
    Error: From<E>,
{
    let state = State {
        inner: Box::pin(inner),
        decoder: Decoder::new(),
        pending: VecDeque::new(),
        failure: None,
        exhausted: false,
    };

    futures::stream::unfold(state, |mut state| async move {
        loop {
            if let Some(event) = state.pending.pop_front() {
                tracing::event!(tracing::Level::DEBUG, "event: {:?}", event);
                return Some((Ok(event), state));
            }

            if let Some(e) = state.failure.take() {
                state.exhausted = true;
                return Some((Err(e), state));
            }

            if state.exhausted || state.decoder.is_finished() {
                return None;
            }

            match state.inner.next().await {
                Some(Ok(fragment)) => {
                    if let Err(e) = state.decoder.push(fragment.as_ref(), &mut state.pending) {
                        state.failure = Some(e);
                    }
                }
                Some(Err(e)) => state.failure = Some(Error::from(e)),
                None => {
                    state.exhausted = true;
                    if let Err(e) = state.decoder.finish(&mut state.pending) {
                        state.failure = Some(e);
                    }
                }
            }
        }
    })
}
