//! Server-sent event decoding for streamed completions.
//!
//! [`SseDecoder`] turns individual lines of a `text/event-stream` body into
//! [`MessageEvent`]s. [`MessageStream`] is the consumer-facing sequence: it
//! issues the completion request on first poll, runs one producer task that
//! feeds a bounded channel, and stops that task (dropping the HTTP response)
//! as soon as the consumer cancels or drops the stream.
//!
//! Only the subset the service emits is understood:
//!
//! | Line | Effect |
//! |------|--------|
//! | `data: [DONE]` | emit `Done`, end the stream |
//! | `data: {"completion": "..."}` | emit `CompletionDelta` |
//! | `event: error` | next line's payload becomes an `Error` event, ending the stream |
//!
//! Malformed JSON payloads are logged and skipped. Transport failures and
//! non-2xx responses also arrive as a final `Error` event, after any
//! completions already received.

use futures::{Stream, StreamExt};
use reqwest::RequestBuilder;
use serde_json::Value;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;

use crate::models::MessageEvent;
use crate::provider::response;

/// Capacity of the producer → consumer channel.
pub const EVENT_CHANNEL_SIZE: usize = 32;

const DATA_PREFIX: &str = "data: ";
const DONE_MARKER: &str = "[DONE]";

/// Line-level event-stream decoder.
#[derive(Debug, Default)]
pub struct SseDecoder {
    awaiting_error: bool,
    finished: bool,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// True once `[DONE]` has been seen; later lines are ignored.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Decode one line (without its trailing newline).
    pub fn decode_line(&mut self, line: &str) -> Option<MessageEvent> {
        if self.finished {
            return None;
        }

        if self.awaiting_error {
            self.awaiting_error = false;
            let payload = line.strip_prefix(DATA_PREFIX).unwrap_or(line);
            return Some(MessageEvent::Error(payload.to_string()));
        }

        if let Some(payload) = line.strip_prefix(DATA_PREFIX) {
            if payload == DONE_MARKER {
                self.finished = true;
                return Some(MessageEvent::Done);
            }
            return match serde_json::from_str::<Value>(payload) {
                Ok(event) => event
                    .get("completion")
                    .and_then(Value::as_str)
                    .map(|text| MessageEvent::CompletionDelta(text.to_string())),
                Err(e) => {
                    tracing::warn!(error = %e, payload, "failed to parse SSE event, skipping");
                    None
                }
            };
        }

        if line.starts_with("event: error") {
            self.awaiting_error = true;
        }
        None
    }
}

/// Splits a byte stream into lines across arbitrary chunk boundaries.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    /// Append a chunk and return every line it completed. `\r\n` and `\n`
    /// both terminate a line.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);
        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.pending.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            lines.push(String::from_utf8_lossy(&line).into_owned());
        }
        lines
    }

    /// Whatever is left after the final chunk, if non-empty.
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.pending);
        Some(String::from_utf8_lossy(&rest).trim_end_matches('\r').to_string())
    }
}

enum StreamState {
    /// Request built but not yet sent.
    Idle(RequestBuilder),
    Running(mpsc::Receiver<MessageEvent>),
    Closed,
}

/// Finite, cold, non-restartable sequence of completion events.
///
/// Nothing is sent until the first poll. Call [`cancel`](Self::cancel) (or
/// drop the stream) to stop early; the producer notices the closed channel
/// and releases the connection.
pub struct MessageStream {
    state: StreamState,
}

impl MessageStream {
    pub(crate) fn new(request: RequestBuilder) -> Self {
        Self {
            state: StreamState::Idle(request),
        }
    }

    /// Stop consuming. No further events are yielded.
    pub fn cancel(&mut self) {
        if let StreamState::Running(rx) = &mut self.state {
            rx.close();
        }
        self.state = StreamState::Closed;
    }
}

impl Stream for MessageStream {
    type Item = MessageEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<MessageEvent>> {
        let this = self.get_mut();
        loop {
            match std::mem::replace(&mut this.state, StreamState::Closed) {
                StreamState::Idle(request) => {
                    let (tx, rx) = mpsc::channel(EVENT_CHANNEL_SIZE);
                    tokio::spawn(produce(request, tx));
                    this.state = StreamState::Running(rx);
                }
                StreamState::Running(mut rx) => {
                    return match rx.poll_recv(cx) {
                        Poll::Ready(Some(event)) => {
                            this.state = StreamState::Running(rx);
                            Poll::Ready(Some(event))
                        }
                        Poll::Ready(None) => Poll::Ready(None),
                        Poll::Pending => {
                            this.state = StreamState::Running(rx);
                            Poll::Pending
                        }
                    };
                }
                StreamState::Closed => return Poll::Ready(None),
            }
        }
    }
}

/// Producer task. Owns the sender, so the channel closes exactly once, when
/// this returns.
async fn produce(request: RequestBuilder, tx: mpsc::Sender<MessageEvent>) {
    let sent = tokio::select! {
        _ = tx.closed() => return,
        sent = request.send() => sent,
    };
    let response = match sent {
        Ok(response) => response,
        Err(e) => {
            let _ = tx.send(MessageEvent::Error(e.to_string())).await;
            return;
        }
    };

    let status = response.status();
    tracing::debug!(status = status.as_u16(), "completion response");
    if !status.is_success() {
        let headers = response.headers().clone();
        let message = match response.bytes().await {
            Ok(raw) => match response::decode_body(&headers, &raw) {
                Ok(body) => response::classify(status.as_u16(), &body).to_string(),
                Err(e) => e.to_string(),
            },
            Err(e) => e.to_string(),
        };
        let _ = tx.send(MessageEvent::Error(message)).await;
        return;
    }

    let mut body = Box::pin(response.bytes_stream());
    let mut lines = LineBuffer::default();
    let mut decoder = SseDecoder::new();

    loop {
        let chunk = tokio::select! {
            _ = tx.closed() => {
                tracing::debug!("message stream cancelled by consumer");
                return;
            }
            chunk = body.next() => chunk,
        };
        let (completed, ended) = match chunk {
            Some(Ok(bytes)) => (lines.push(&bytes), false),
            Some(Err(e)) => {
                let _ = tx.send(MessageEvent::Error(e.to_string())).await;
                return;
            }
            None => (lines.finish().into_iter().collect(), true),
        };

        for line in completed {
            if let Some(event) = decoder.decode_line(&line) {
                let terminal = event.is_terminal();
                if tx.send(event).await.is_err() || terminal {
                    return;
                }
            }
        }
        if ended {
            return;
        }
    }
}
