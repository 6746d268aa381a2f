//! The stream relay: upstream SSE bytes in, plain text out.
//!
//! A [`RelaySession`] is one sequential pull loop:
//!
//! 1. read the next upstream chunk (racing cancellation and consumer loss),
//! 2. append it to the [`LineBuffer`] and decode every complete line,
//! 3. forward each chunk's text to the [`OutboundSink`], awaiting the write
//!    before reading upstream again.
//!
//! The loop ends on exactly one [`Termination`]. Whatever the exit path, the
//! sink is closed once and the upstream stream is dropped with the session,
//! which releases the upstream connection.

use std::panic::AssertUnwindSafe;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{FutureExt, Stream, StreamExt};
use serde_json::json;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::client::ClientError;
use crate::sse::{decode_frame, LineBuffer, UpstreamFrame};

/// Errors raised by an [`OutboundSink`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RelayError {
    #[error("outbound consumer disconnected")]
    ConsumerGone,

    #[error("outbound sink already closed")]
    Closed,
}

/// Where the relay writes forwarded text.
#[async_trait]
pub trait OutboundSink: Send {
    /// Write one piece of output. Completes once the sink has accepted it.
    async fn write(&mut self, bytes: Bytes) -> Result<(), RelayError>;

    /// Resolves when the consumer can no longer receive output.
    async fn consumer_gone(&self);

    /// Signal end of output. Closing twice is a no-op.
    fn close(&mut self);
}

/// [`OutboundSink`] backed by a bounded channel.
///
/// The channel capacity bounds how far the relay may run ahead of the reader.
#[derive(Debug)]
pub struct ChannelSink {
    tx: Option<mpsc::Sender<Bytes>>,
}

impl ChannelSink {
    /// Create a sink and the stream its output can be read from.
    pub fn channel(capacity: usize) -> (Self, ReceiverStream<Bytes>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx: Some(tx) }, ReceiverStream::new(rx))
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_none()
    }

    /// Another handle onto the same channel, while the sink is open.
    pub fn sender(&self) -> Option<mpsc::Sender<Bytes>> {
        self.tx.clone()
    }
}

#[async_trait]
impl OutboundSink for ChannelSink {
    async fn write(&mut self, bytes: Bytes) -> Result<(), RelayError> {
        let tx = self.tx.as_ref().ok_or(RelayError::Closed)?;
        tx.send(bytes).await.map_err(|_| RelayError::ConsumerGone)
    }

    async fn consumer_gone(&self) {
        if let Some(tx) = &self.tx {
            tx.closed().await;
        }
    }

    fn close(&mut self) {
        // Dropping the sender ends the receiver stream once it is drained.
        self.tx.take();
    }
}

/// Why a relay session stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// `[DONE]` received.
    Done,
    /// Upstream sent an error frame, which was forwarded.
    UpstreamError,
    /// Upstream ended without `[DONE]`.
    Eof,
    /// Reading upstream failed.
    ReadFailed,
    /// The outbound consumer went away.
    ConsumerGone,
    /// Cancelled from outside.
    Cancelled,
}

impl Termination {
    /// Whether the caller received the full output.
    pub fn is_complete(self) -> bool {
        matches!(self, Self::Done | Self::Eof)
    }
}

/// Summary of a finished session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayOutcome {
    pub termination: Termination,
    /// Chunk frames forwarded.
    pub chunks: usize,
    /// Bytes of chunk text forwarded.
    pub bytes: usize,
}

/// One in-flight proxying operation.
pub struct RelaySession<S, K: OutboundSink> {
    upstream: S,
    sink: K,
    buffer: LineBuffer,
    cancel: CancellationToken,
    closed: bool,
    chunks: usize,
    bytes: usize,
}

impl<S, K> RelaySession<S, K>
where
    S: Stream<Item = Result<Bytes, ClientError>> + Send + Unpin,
    K: OutboundSink,
{
    pub fn new(upstream: S, sink: K) -> Self {
        Self {
            upstream,
            sink,
            buffer: LineBuffer::new(),
            cancel: CancellationToken::new(),
            closed: false,
            chunks: 0,
            bytes: 0,
        }
    }

    /// Stop the session when `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Drive the session to completion.
    ///
    /// Never fails: every way the session can end is reported as a
    /// [`Termination`]. The upstream stream is dropped on return.
    pub async fn run(mut self) -> RelayOutcome {
        let termination = self.pump().await;
        self.close_sink();

        let outcome = RelayOutcome {
            termination,
            chunks: self.chunks,
            bytes: self.bytes,
        };
        info!(
            termination = ?outcome.termination,
            chunks = outcome.chunks,
            bytes = outcome.bytes,
            "relay session finished"
        );
        outcome
    }

    async fn pump(&mut self) -> Termination {
        loop {
            let next = tokio::select! {
                biased;
                () = self.cancel.cancelled() => return Termination::Cancelled,
                () = self.sink.consumer_gone() => {
                    debug!("outbound consumer disconnected while waiting for upstream");
                    return Termination::ConsumerGone;
                }
                next = self.upstream.next() => next,
            };

            match next {
                Some(Ok(chunk)) => {
                    self.buffer.push(&chunk);
                    if let Some(termination) = self.drain_lines().await {
                        return termination;
                    }
                }
                Some(Err(err)) => {
                    warn!(error = %err, "upstream read failed mid-stream");
                    let record = json!({
                        "error": "Stream interrupted",
                        "details": err.to_string(),
                    });
                    if let Err(termination) = self.forward(Bytes::from(record.to_string())).await {
                        debug!(?termination, "could not report read failure downstream");
                    }
                    return Termination::ReadFailed;
                }
                None => {
                    if !self.buffer.is_empty() {
                        let dropped = self.buffer.discard();
                        debug!(dropped, "discarding unterminated line at end of upstream");
                    }
                    return Termination::Eof;
                }
            }
        }
    }

    /// Process every complete line currently buffered.
    async fn drain_lines(&mut self) -> Option<Termination> {
        while let Some(line) = self.buffer.next_line() {
            let frame = match decode_frame(&line) {
                Ok(Some(frame)) => frame,
                Ok(None) => continue,
                Err(err) => {
                    warn!(error = %err, "skipping malformed upstream frame");
                    continue;
                }
            };

            match frame {
                UpstreamFrame::End => return Some(Termination::Done),
                UpstreamFrame::Chunk(text) => {
                    let len = text.len();
                    if let Err(termination) = self.forward(Bytes::from(text)).await {
                        return Some(termination);
                    }
                    self.chunks += 1;
                    self.bytes += len;
                }
                UpstreamFrame::Error(value) => {
                    warn!(error = %value, "upstream reported an error mid-stream");
                    if let Err(termination) = self.forward(Bytes::from(value.to_string())).await {
                        return Some(termination);
                    }
                    return Some(Termination::UpstreamError);
                }
            }
        }
        None
    }

    /// Write to the sink, giving up early if the session is cancelled.
    async fn forward(&mut self, bytes: Bytes) -> Result<(), Termination> {
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(Termination::Cancelled),
            written = self.sink.write(bytes) => written.map_err(|err| {
                debug!(error = %err, "outbound write failed");
                Termination::ConsumerGone
            }),
        }
    }

    fn close_sink(&mut self) {
        if !self.closed {
            self.closed = true;
            self.sink.close();
        }
    }
}

impl<S, K: OutboundSink> Drop for RelaySession<S, K> {
    // Covers sessions dropped mid-flight (task abort, panic unwind).
    fn drop(&mut self) {
        if !self.closed {
            self.closed = true;
            self.sink.close();
        }
    }
}

/// Spawn a relay session for `upstream` and return the outbound text stream.
///
/// If the session panics, a `{"error":"Relay failed","details":...}` record
/// is written to the outbound stream before it ends, and the handle yields
/// `None`.
pub fn relay<S>(
    upstream: S,
    capacity: usize,
    cancel: CancellationToken,
) -> (ReceiverStream<Bytes>, JoinHandle<Option<RelayOutcome>>)
where
    S: Stream<Item = Result<Bytes, ClientError>> + Send + Unpin + 'static,
{
    let (sink, outbound) = ChannelSink::channel(capacity);
    let fault_tx = sink.sender();
    let session = RelaySession::new(upstream, sink).with_cancellation(cancel);

    let handle = tokio::spawn(async move {
        match AssertUnwindSafe(session.run()).catch_unwind().await {
            Ok(outcome) => Some(outcome),
            Err(panic) => {
                let details = panic_message(panic.as_ref());
                error!(%details, "relay session panicked");
                if let Some(tx) = fault_tx {
                    let record = json!({ "error": "Relay failed", "details": details });
                    if tx.send(Bytes::from(record.to_string())).await.is_err() {
                        debug!("consumer gone before relay failure could be reported");
                    }
                }
                None
            }
        }
    });

    (outbound, handle)
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "internal relay fault".to_string()
    }
}
