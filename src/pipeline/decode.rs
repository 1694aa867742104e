//! Streaming decoder (Bytes -> UnifiedStreamIncrement)
//!
//! Framing is line based: each chunk is appended to a byte buffer, every
//! complete line is handed to the adapter, and the trailing partial line waits
//! for the next chunk. Vendor semantics stay in the adapter; this module only
//! knows about lines, SSE comments and the adapter's end-of-stream sentinel.

use std::collections::VecDeque;
use std::sync::Arc;

use bytes::Bytes;
use futures::{stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::adapters::ChatAdapter;
use crate::transport::ByteStream;
use crate::types::{TokenUsage, UnifiedStreamIncrement};
use crate::{BoxStream, Result};

/// Lazily produced increments of one streaming call.
pub type IncrementStream = BoxStream<'static, UnifiedStreamIncrement>;

/// Accumulates raw chunks and yields complete lines.
///
/// Splitting happens on the `\n` byte before UTF-8 decoding, so a multi-byte
/// character cut across two chunks stays in the pending tail until the rest
/// of it arrives. A trailing `\r` is stripped from every line.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and drain every line it completes.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        // Bytes already pending hold no newline; only the new chunk is scanned.
        let scanned = self.pending.len();
        self.pending.extend_from_slice(chunk);
        let Some(offset) = chunk.iter().rposition(|b| *b == b'\n') else {
            return Vec::new();
        };
        let last_newline = scanned + offset;
        let tail = self.pending.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.pending, tail);
        let text = String::from_utf8_lossy(&complete[..last_newline]);
        text.split('\n').map(trim_cr).collect()
    }

    /// Flush whatever is left once the body is exhausted.
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.pending);
        Some(trim_cr(&String::from_utf8_lossy(&rest)))
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

fn trim_cr(line: &str) -> String {
    line.strip_suffix('\r').unwrap_or(line).to_string()
}

/// What one line means for the stream.
#[derive(Debug)]
pub enum LineAction {
    Emit(UnifiedStreamIncrement),
    Skip,
    Terminate,
}

/// Classify a single line with the adapter's parsing rules.
///
/// Parse failures are logged and skipped; one bad line never ends the stream.
pub fn classify_line<A: ChatAdapter + ?Sized>(adapter: &A, line: &str) -> LineAction {
    if line.trim().is_empty() || line.starts_with(':') {
        return LineAction::Skip;
    }
    if adapter.is_stream_done(line) {
        return LineAction::Terminate;
    }
    match adapter.parse_stream_chunk(line) {
        Ok(Some(increment)) => LineAction::Emit(increment),
        Ok(None) => LineAction::Skip,
        Err(e) => {
            warn!(adapter = %adapter.key(), error = %e, "skipping undecodable stream line");
            LineAction::Skip
        }
    }
}

/// Drives one adapter over one response body.
pub struct StreamDecoder<A: ChatAdapter + ?Sized> {
    adapter: Arc<A>,
}

impl<A: ChatAdapter + ?Sized> StreamDecoder<A> {
    pub fn new(adapter: Arc<A>) -> Self {
        Self { adapter }
    }

    /// Turn `body` into a lazy, single-pass stream of increments.
    ///
    /// The stream ends at the adapter's sentinel, at body exhaustion (after
    /// flushing the last partial line), after yielding a transport error, or
    /// as soon as `cancel` fires. The body is dropped exactly once in each case.
    pub fn decode(self, body: ByteStream, cancel: CancellationToken) -> IncrementStream {
        let state = DecodeState {
            adapter: self.adapter,
            body: Some(body),
            buffer: LineBuffer::new(),
            ready: VecDeque::new(),
            usage: None,
            cancel,
        };

        let stream = stream::unfold(state, |mut state| async move {
            loop {
                if state.cancel.is_cancelled() {
                    state.release("cancelled");
                    return None;
                }

                if let Some(line) = state.ready.pop_front() {
                    match classify_line(&*state.adapter, &line) {
                        LineAction::Emit(mut increment) => {
                            state.carry_usage(&mut increment);
                            return Some((Ok(increment), state));
                        }
                        LineAction::Skip => continue,
                        LineAction::Terminate => {
                            state.release("sentinel");
                            return None;
                        }
                    }
                }

                let Some(body) = state.body.as_mut() else {
                    return None;
                };

                let read = tokio::select! {
                    biased;
                    _ = state.cancel.cancelled() => Read::Cancelled,
                    item = body.next() => Read::Item(item),
                };

                match read {
                    Read::Cancelled => {
                        state.release("cancelled");
                        return None;
                    }
                    Read::Item(Some(Ok(bytes))) => {
                        let lines = state.buffer.push(&bytes);
                        state.ready.extend(lines);
                    }
                    Read::Item(Some(Err(e))) => {
                        state.release("transport error");
                        return Some((Err(e), state));
                    }
                    Read::Item(None) => {
                        state.body = None;
                        if let Some(line) = state.buffer.finish() {
                            state.ready.push_back(line);
                        }
                    }
                }
            }
        });

        Box::pin(stream)
    }
}

enum Read {
    Cancelled,
    Item(Option<Result<Bytes>>),
}

struct DecodeState<A: ChatAdapter + ?Sized> {
    adapter: Arc<A>,
    body: Option<ByteStream>,
    buffer: LineBuffer,
    ready: VecDeque<String>,
    /// Latest usage seen on this stream.
    usage: Option<TokenUsage>,
    cancel: CancellationToken,
}

impl<A: ChatAdapter + ?Sized> DecodeState<A> {
    /// Complete a usage report with counters sent earlier in the stream.
    fn carry_usage(&mut self, increment: &mut UnifiedStreamIncrement) {
        if let Some(usage) = increment.usage.as_mut() {
            if let Some(earlier) = self.usage.as_ref() {
                usage.carry_forward(earlier);
            }
            self.usage = Some(*usage);
        }
    }

        /// Drop the body (closing the connection) and any undelivered lines.
    fn release(&mut self, reason: &str) {
        if self.body.take().is_some() {
            debug!(adapter = %self.adapter.key(), reason, "stream body released");
        }
        self.ready.clear();
        self.buffer.clear();
    }
}
