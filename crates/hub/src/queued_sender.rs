// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-device line request/response serializer with timeouts and queueing (C2).
//!
//! One in-flight request at a time, FIFO queue for the rest, per-request deadlines,
//! and unsolicited-line fan-out. Runs as a dedicated actor task so that the whole
//! state machine of §3/§4.2 of the design is only ever touched from one place,
//! giving the single-threaded-cooperative contract "for free" the way the teacher's
//! `upstream::bridge` run loop gives it to its correlation map.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::line_session::LineSession;

/// A validation/transform failure raised by a post-processing hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolError(pub String);

impl std::fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ProtocolError {}

/// Device-specific response validation/transformation hook. Default is identity.
pub type PostProcessor = std::sync::Arc<dyn Fn(&str) -> Result<String, ProtocolError> + Send + Sync>;

/// Hook invoked with every unsolicited line, before fan-out to waiters.
pub type UnsolicitedHook = std::sync::Arc<dyn Fn(&str) + Send + Sync>;

pub fn identity_post_processor() -> PostProcessor {
    std::sync::Arc::new(|line: &str| Ok(line.to_owned()))
}

/// Terminal outcome of a single `send`/`get_unsolicited` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    Line(String),
    Timeout,
}

/// Why a `send`/`get_unsolicited` future failed instead of resolving to an outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendError {
    /// The underlying session actor is gone (transport closed or disconnected).
    Closed,
    /// The post-processing hook rejected the response line.
    Protocol(ProtocolError),
}

impl std::fmt::Display for SendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SendError::Closed => write!(f, "session closed"),
            SendError::Protocol(e) => write!(f, "{e}"),
        }
    }
}

pub type SendResult = Result<SendOutcome, SendError>;

/// Why the session actor stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClosedReason {
    /// `disconnect()` was called — a voluntary abort.
    Disconnected,
    /// The transport hit clean EOF.
    TransportClosed,
    /// The transport returned an I/O error.
    TransportError,
}

enum SenderCommand {
    Send { id: u64, line: String, timeout: Duration, resp: oneshot::Sender<SendResult> },
    GetUnsolicited { id: u64, timeout: Duration, resp: oneshot::Sender<SendResult> },
    Cancel(u64),
    Expire(u64),
}

struct PendingRequest {
    id: u64,
    line: String,
    resp: oneshot::Sender<SendResult>,
}

struct Waiter {
    id: u64,
    resp: oneshot::Sender<SendResult>,
}

/// Handle to a running Queued Line Sender actor.
///
/// Cloning is not supported: one handle per session keeps the per-request id
/// allocator unambiguous. Share the handle behind an `Arc` if multiple callers
/// need it (as `DeviceSession` does).
pub struct QueuedLineSender {
    cmd_tx: mpsc::UnboundedSender<SenderCommand>,
    next_id: AtomicU64,
    default_timeout: Duration,
}

impl QueuedLineSender {
    /// Spawn the actor task owning `line_session` and return a handle plus a join
    /// handle that resolves to why the actor stopped.
    pub fn spawn<R, W>(
        line_session: LineSession<R, W>,
        default_timeout: Duration,
        post_process: PostProcessor,
        on_unsolicited: Option<UnsolicitedHook>,
        cancel: CancellationToken,
    ) -> (Self, JoinHandle<ClosedReason>)
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let actor = Actor {
            line_session,
            in_flight: None,
            queue: VecDeque::new(),
            waiters: Vec::new(),
            post_process,
            on_unsolicited,
            self_tx: cmd_tx.clone(),
        };
        let join = tokio::spawn(actor.run(cmd_rx, cancel));
        (Self { cmd_tx, next_id: AtomicU64::new(0), default_timeout }, join)
    }

    fn alloc_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Send a line, awaiting its response (or `TIMEOUT`) per the ordering guarantee
    /// of §4.2. If this future is dropped before resolving, the request is
    /// cancelled: removed from the queue if it never reached the wire, left alone
    /// (reply discarded when it eventually arrives) if it was already in flight.
    pub async fn send(&self, line: impl Into<String>, timeout: Option<Duration>) -> SendResult {
        self.call(timeout, |id, timeout, resp| SenderCommand::Send { id, line: line.into(), timeout, resp }).await
    }

    /// Register a waiter for the next unsolicited line.
    pub async fn get_unsolicited(&self, timeout: Option<Duration>) -> SendResult {
        self.call(timeout, |id, timeout, resp| SenderCommand::GetUnsolicited { id, timeout, resp }).await
    }

    async fn call(
        &self,
        timeout: Option<Duration>,
        build: impl FnOnce(u64, Duration, oneshot::Sender<SendResult>) -> SenderCommand,
    ) -> SendResult {
        let id = self.alloc_id();
        let timeout = timeout.unwrap_or(self.default_timeout);
        let (resp_tx, resp_rx) = oneshot::channel();
        if self.cmd_tx.send(build(id, timeout, resp_tx)).is_err() {
            return Err(SendError::Closed);
        }

        let mut guard = CancelGuard { tx: &self.cmd_tx, id, armed: true };
        let result = resp_rx.await.map_err(|_| SendError::Closed);
        guard.armed = false;
        result?
    }
}

struct CancelGuard<'a> {
    tx: &'a mpsc::UnboundedSender<SenderCommand>,
    id: u64,
    armed: bool,
}

impl Drop for CancelGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            let _ = self.tx.send(SenderCommand::Cancel(self.id));
        }
    }
}

struct Actor<R, W> {
    line_session: LineSession<R, W>,
    in_flight: Option<PendingRequest>,
    queue: VecDeque<PendingRequest>,
    waiters: Vec<Waiter>,
    post_process: PostProcessor,
    on_unsolicited: Option<UnsolicitedHook>,
    self_tx: mpsc::UnboundedSender<SenderCommand>,
}

impl<R, W> Actor<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    async fn run(mut self, mut cmd_rx: mpsc::UnboundedReceiver<SenderCommand>, cancel: CancellationToken) -> ClosedReason {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return ClosedReason::Disconnected,
                cmd = cmd_rx.recv() => {
                    match cmd {
                        None => return ClosedReason::Disconnected,
                        Some(cmd) => {
                            if let Some(reason) = self.handle_command(cmd).await {
                                return reason;
                            }
                        }
                    }
                }
                line = self.line_session.read_line() => {
                    match line {
                        Ok(Some(text)) => {
                            if let Some(reason) = self.handle_line(text).await {
                                return reason;
                            }
                        }
                        Ok(None) => return ClosedReason::TransportClosed,
                        Err(_) => return ClosedReason::TransportError,
                    }
                }
            }
        }
    }

    /// Returns `Some(reason)` if the actor should stop (a write to the transport failed).
    async fn handle_command(&mut self, cmd: SenderCommand) -> Option<ClosedReason> {
        match cmd {
            SenderCommand::Send { id, line, timeout, resp } => {
                let req = PendingRequest { id, line, resp };
                self.arm_timeout(id, timeout);
                if self.in_flight.is_none() {
                    if self.line_session.write_line(&req.line).await.is_err() {
                        let _ = req.resp.send(Err(SendError::Closed));
                        return Some(ClosedReason::TransportError);
                    }
                    self.in_flight = Some(req);
                } else {
                    self.queue.push_back(req);
                }
                None
            }
            SenderCommand::GetUnsolicited { id, timeout, resp } => {
                self.arm_timeout(id, timeout);
                self.waiters.push(Waiter { id, resp });
                None
            }
            SenderCommand::Cancel(id) => {
                if let Some(pos) = self.queue.iter().position(|r| r.id == id) {
                    self.queue.remove(pos);
                } else if let Some(pos) = self.waiters.iter().position(|w| w.id == id) {
                    self.waiters.remove(pos);
                }
                // If `id` is the in-flight request, cancellation does not free the
                // slot early: the reply (or timeout) is still awaited and simply
                // discarded, per the ordering invariant.
                None
            }
            SenderCommand::Expire(id) => self.handle_expiry(id).await,
        }
    }

    fn arm_timeout(&self, id: u64, timeout: Duration) {
        let tx = self.self_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            let _ = tx.send(SenderCommand::Expire(id));
        });
    }

    async fn handle_expiry(&mut self, id: u64) -> Option<ClosedReason> {
        if self.in_flight.as_ref().is_some_and(|r| r.id == id) {
            return self.complete_in_flight(None).await;
        }
        if let Some(pos) = self.queue.iter().position(|r| r.id == id) {
            let req = self.queue.remove(pos)?;
            let _ = req.resp.send(Ok(SendOutcome::Timeout));
            return None;
        }
        if let Some(pos) = self.waiters.iter().position(|w| w.id == id) {
            let waiter = self.waiters.remove(pos);
            let _ = waiter.resp.send(Ok(SendOutcome::Timeout));
        }
        None
    }

    async fn handle_line(&mut self, line: String) -> Option<ClosedReason> {
        if self.in_flight.is_some() {
            self.complete_in_flight(Some(line)).await
        } else {
            if let Some(hook) = &self.on_unsolicited {
                hook(&line);
            }
            let fired: Vec<_> = self.waiters.drain(..).collect();
            for waiter in fired {
                let _ = waiter.resp.send(Ok(SendOutcome::Line(line.clone())));
            }
            None
        }
    }

    /// Completes the current in-flight request, first starting the next queued
    /// request (if any) so that a callback triggered by the completion observes an
    /// empty in-flight slot iff the queue was empty — per the ordering invariant in
    /// §4.2, the pop-and-start-next must happen before the completion is observable.
    ///
    /// `reply` is `Some(line)` for a real response (outcome and post-processing are
    /// derived from it); `None` means this is a synthesized `TIMEOUT`.
    async fn complete_in_flight(&mut self, reply: Option<String>) -> Option<ClosedReason> {
        let req = self.in_flight.take()?;

        let mut stop = None;
        if let Some(next) = self.queue.pop_front() {
            if self.line_session.write_line(&next.line).await.is_err() {
                let _ = next.resp.send(Err(SendError::Closed));
                stop = Some(ClosedReason::TransportError);
            } else {
                self.in_flight = Some(next);
            }
        }

        match reply {
            Some(line) => match (self.post_process)(&line) {
                Ok(processed) => {
                    let _ = req.resp.send(Ok(SendOutcome::Line(processed)));
                }
                Err(e) => {
                    let _ = req.resp.send(Err(SendError::Protocol(e)));
                }
            },
            None => {
                let _ = req.resp.send(Ok(SendOutcome::Timeout));
            }
        }

        stop
    }
}
