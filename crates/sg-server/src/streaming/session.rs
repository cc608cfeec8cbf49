//! Per-request streaming state.
//!
//! A [`StreamSession`] owns the blob reader for exactly one response body.
//! It is moved into the body stream, so it is dropped exactly once on every
//! exit path: the last byte was read, a read failed, or the client went away
//! and hyper dropped the body. Dropping it releases the reader and records
//! the outcome.

use std::fmt;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

use tokio::io::{AsyncRead, ReadBuf};

use sg_core::{ByteRange, TrackId};
use sg_storage::BlobReader;

/// Phases of one stream request.
///
/// `Pending → Authorized | Denied`, then `Authorized → RangeEvaluated →
/// Responding → Completed | Aborted`. Error responses may end the request in
/// any non-terminal phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Pending,
    Authorized,
    Denied,
    RangeEvaluated,
    Responding,
    Completed,
    Aborted,
}

impl SessionPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionPhase::Pending => "pending",
            SessionPhase::Authorized => "authorized",
            SessionPhase::Denied => "denied",
            SessionPhase::RangeEvaluated => "range_evaluated",
            SessionPhase::Responding => "responding",
            SessionPhase::Completed => "completed",
            SessionPhase::Aborted => "aborted",
        }
    }

    /// Whether `next` directly follows `self`.
    pub fn can_advance_to(self, next: SessionPhase) -> bool {
        use SessionPhase::*;
        matches!(
            (self, next),
            (Pending, Authorized)
                | (Pending, Denied)
                | (Authorized, RangeEvaluated)
                | (RangeEvaluated, Responding)
                | (Responding, Completed)
                | (Responding, Aborted)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SessionPhase::Denied | SessionPhase::Completed | SessionPhase::Aborted
        )
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Phase bookkeeping for the part of a request before the body starts.
#[derive(Debug)]
pub struct PhaseTracker {
    track_id: TrackId,
    phase: SessionPhase,
}

impl PhaseTracker {
    pub fn new(track_id: TrackId) -> Self {
        Self {
            track_id,
            phase: SessionPhase::Pending,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn advance(&mut self, next: SessionPhase) {
        debug_assert!(
            self.phase.can_advance_to(next),
            "invalid stream phase transition {} -> {}",
            self.phase,
            next
        );
        tracing::trace!(
            track_id = %self.track_id,
            from = %self.phase,
            to = %next,
            "Stream phase"
        );
        self.phase = next;
    }
}

/// Why a session ended before delivering every byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    ReadFailure,
    ClientDisconnected,
}

impl AbortReason {
    pub fn as_str(self) -> &'static str {
        match self {
            AbortReason::ReadFailure => "read failure",
            AbortReason::ClientDisconnected => "client disconnected",
        }
    }
}

/// Exclusive owner of one response body's reader.
///
/// Reads pass straight through to the blob reader while counting bytes. A
/// reader that ends before the advertised length is reported as an error so
/// the connection is cut instead of the body being silently short.
pub struct StreamSession {
    track_id: TrackId,
    range: Option<ByteRange>,
    expected: u64,
    sent: u64,
    failure: Option<String>,
    started: Instant,
    reader: BlobReader,
}

impl StreamSession {
    pub fn new(track_id: TrackId, range: Option<ByteRange>, expected: u64, reader: BlobReader) -> Self {
        Self {
            track_id,
            range,
            expected,
            sent: 0,
            failure: None,
            started: Instant::now(),
            reader,
        }
    }

    pub fn bytes_sent(&self) -> u64 {
        self.sent
    }

    /// Outcome if the session ended now.
    pub fn outcome(&self) -> (SessionPhase, Option<AbortReason>) {
        if self.failure.is_some() {
            (SessionPhase::Aborted, Some(AbortReason::ReadFailure))
        } else if self.sent < self.expected {
            (SessionPhase::Aborted, Some(AbortReason::ClientDisconnected))
        } else {
            (SessionPhase::Completed, None)
        }
    }
}

impl AsyncRead for StreamSession {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if this.failure.is_some() {
            return Poll::Ready(Err(io::Error::other("stream already failed")));
        }

        let before = buf.filled().len();
        match this.reader.as_mut().poll_read(cx, buf) {
            Poll::Ready(Ok(())) => {
                let n = (buf.filled().len() - before) as u64;
                this.sent += n;
                if n == 0 && this.sent < this.expected {
                    let msg = format!(
                        "source ended after {} of {} bytes",
                        this.sent, this.expected
                    );
                    this.failure = Some(msg.clone());
                    return Poll::Ready(Err(io::Error::new(io::ErrorKind::UnexpectedEof, msg)));
                }
                Poll::Ready(Ok(()))
            }
            Poll::Ready(Err(e)) => {
                this.failure = Some(e.to_string());
                Poll::Ready(Err(e))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for StreamSession {
    fn drop(&mut self) {
        let (phase, reason) = self.outcome();
        let elapsed_ms = self.started.elapsed().as_millis() as u64;
        let range = self.range.map(|r| r.to_string());

        match reason {
            None => tracing::debug!(
                track_id = %self.track_id,
                range = range.as_deref().unwrap_or("full"),
                bytes_sent = self.sent,
                elapsed_ms,
                outcome = %phase,
                "Stream completed"
            ),
            Some(AbortReason::ReadFailure) => tracing::warn!(
                track_id = %self.track_id,
                range = range.as_deref().unwrap_or("full"),
                bytes_sent = self.sent,
                expected = self.expected,
                error = self.failure.as_deref().unwrap_or_default(),
                outcome = %phase,
                reason = AbortReason::ReadFailure.as_str(),
                "Stream aborted"
            ),
            Some(AbortReason::ClientDisconnected) => tracing::info!(
                track_id = %self.track_id,
                range = range.as_deref().unwrap_or("full"),
                bytes_sent = self.sent,
                expected = self.expected,
                outcome = %phase,
                reason = AbortReason::ClientDisconnected.as_str(),
                "Stream aborted"
            ),
        }

        metrics::counter!("soundgate_stream_sessions_total", "outcome" => phase.as_str())
            .increment(1);
        metrics::counter!("soundgate_stream_bytes_total").increment(self.sent);
    }
}
