//! Incremental decoding of `data: <json>` event frames.
//!
//! The chat endpoints answer with a minimal event-stream: one `data:` line per
//! event, no `event:`/`id:` fields and no reconnection. [`FrameDecoder`] turns
//! arbitrary network chunks into [`StreamEvent`]s and [`decode_events`] wraps a
//! response body into a lazy stream of them. [`fold`] folds those events into
//! the chat message being displayed.

pub mod fold;

pub use fold::{FoldOutcome, MessageFolder, STREAM_FAILURE_MESSAGE, fold_events};

use crate::api::{ApiError, ApiResult};
use crate::types::WardrobeItem;
use futures::stream::{self, BoxStream, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::pin::Pin;
use tracing::debug;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamEvent {
    Chunk {
        #[serde(default)]
        content: String,
    },
    #[serde(rename_all = "camelCase")]
    Done {
        #[serde(default, alias = "selected_items", skip_serializing_if = "Option::is_none")]
        selected_items: Option<Vec<WardrobeItem>>,
        #[serde(
            default,
            alias = "avatar_preview_url",
            skip_serializing_if = "Option::is_none"
        )]
        avatar_preview_url: Option<String>,
    },
    Error {
        #[serde(default, alias = "error")]
        message: String,
    },
}

/// Lazy, finite event sequence of one response body. Not restartable.
pub type EventStream = BoxStream<'static, ApiResult<StreamEvent>>;

/// Splits raw body bytes into lines and parses the `data:` frames among them.
///
/// Bytes are buffered until a newline arrives, so both a frame cut in two and
/// a UTF-8 character split across chunks are reassembled before decoding.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one network chunk and return every event it completed.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<StreamEvent> {
        self.buffer.extend_from_slice(bytes);
        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(event) = parse_frame_line(&line[..pos]) {
                events.push(event);
            }
        }
        events
    }

    /// Flush a final line the body ended without terminating.
    pub fn finish(&mut self) -> Option<StreamEvent> {
        let rest = std::mem::take(&mut self.buffer);
        parse_frame_line(&rest)
    }
}

/// Parse one line; anything that is not a well-formed `data:` frame is skipped.
pub fn parse_frame_line(line: &[u8]) -> Option<StreamEvent> {
    let decoded = String::from_utf8_lossy(line);
    let text: &str = &decoded;
    let text = text.strip_suffix('\r').unwrap_or(text);
    let payload = text.strip_prefix("data:")?.trim();
    if payload.is_empty() {
        return None;
    }
    match serde_json::from_str(payload) {
        Ok(event) => Some(event),
        Err(err) => {
            debug!(error = %err, "skipping malformed frame");
            None
        }
    }
}

struct DecodeState<S> {
    body: Pin<Box<S>>,
    decoder: FrameDecoder,
    pending: VecDeque<StreamEvent>,
    ended: bool,
}

/// Turn a chunked body into an [`EventStream`]. A transport error is yielded
/// once and ends the stream.
pub fn decode_events<S, B, E>(body: S) -> EventStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Into<ApiError> + Send + 'static,
{
    let state = DecodeState {
        body: Box::pin(body),
        decoder: FrameDecoder::new(),
        pending: VecDeque::new(),
        ended: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(event) = state.pending.pop_front() {
                return Some((Ok(event), state));
            }
            if state.ended {
                return None;
            }
            match state.body.next().await {
                Some(Ok(bytes)) => {
                    let events = state.decoder.push(bytes.as_ref());
                    state.pending.extend(events);
                }
                Some(Err(err)) => {
                    state.ended = true;
                    return Some((Err(err.into()), state));
                }
                None => {
                    state.ended = true;
                    state.pending.extend(state.decoder.finish());
                }
            }
        }
    })
    .boxed()
}
