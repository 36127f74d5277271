// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Server-side Device Session: a Queued Line Sender bootstrapped by the peer's
//! own first line, and wired into the Device Registry for its lifetime (C3).

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::sync::CancellationToken;

use crate::line_session::LineSession;
use crate::queued_sender::{ClosedReason, PostProcessor, QueuedLineSender, SendError, SendOutcome, SendResult};
use crate::registry::DeviceRegistry;

/// Invoked for every unsolicited line received after bootstrap, with the owning
/// registry and this session's device id in scope.
pub type EventCallback = Arc<dyn Fn(&Arc<DeviceRegistry>, &str, &str) + Send + Sync>;

/// Invoked once a `send_command` call resolves, with the command and its outcome.
pub type CommandCallback = Arc<dyn Fn(&Arc<DeviceRegistry>, &str, &str, &SendResult) + Send + Sync>;

pub struct DeviceSession {
    device_id: String,
    sender: QueuedLineSender,
    registry: Arc<DeviceRegistry>,
    command_callback: Option<CommandCallback>,
    cancel: CancellationToken,
}

impl DeviceSession {
    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Read the peer's bootstrap line (its device id), then spin up the Queued
    /// Line Sender engine and register with `registry`.
    ///
    /// Returns `Ok(None)` if the peer disconnected before sending its id, or if
    /// the registry already held a session under that id (in which case this
    /// connection is told to disconnect and never becomes live).
    #[allow(clippy::too_many_arguments)]
    pub async fn bootstrap<R, W>(
        read: R,
        write: W,
        inbound_delim: impl Into<Vec<u8>>,
        outbound_delim: impl Into<Vec<u8>>,
        timeout: Duration,
        post_process: PostProcessor,
        registry: Arc<DeviceRegistry>,
        event_callback: Option<EventCallback>,
        command_callback: Option<CommandCallback>,
    ) -> std::io::Result<Option<Arc<Self>>>
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let mut line_session = LineSession::new(read, write, inbound_delim, outbound_delim);
        let device_id = match line_session.read_line().await? {
            Some(id) => id,
            None => return Ok(None),
        };

        let cancel = CancellationToken::new();
        let registry_for_hook = registry.clone();
        let device_id_for_hook = device_id.clone();
        let on_unsolicited = event_callback.map(|cb| {
            let registry = registry_for_hook;
            let device_id = device_id_for_hook;
            std::sync::Arc::new(move |line: &str| cb(&registry, &device_id, line))
                as crate::queued_sender::UnsolicitedHook
        });

        let (sender, join) = QueuedLineSender::spawn(line_session, timeout, post_process, on_unsolicited, cancel.clone());

        let session = Arc::new(Self { device_id: device_id.clone(), sender, registry: registry.clone(), command_callback, cancel });

        if !registry.register(session.clone()).await {
            session.cancel.cancel();
            let _ = join.await;
            return Ok(None);
        }

        tokio::spawn(watch_for_connection_loss(join, registry, device_id, session.clone()));

        Ok(Some(session))
    }

    /// Send `command`, invoking the command callback (if any) with its outcome.
    /// Callback failures are never observable to the caller — there is nothing to
    /// catch in safe Rust (no panics escape an `Fn` call without unwinding past
    /// this frame), so the callback itself is trusted not to misbehave.
    pub async fn send_command(&self, command: &str) -> SendResult {
        let result = self.sender.send(command, None).await;
        if let Some(cb) = &self.command_callback {
            cb(&self.registry, &self.device_id, command, &result);
        }
        result
    }

    pub async fn get_unsolicited(&self, timeout: Option<Duration>) -> SendResult {
        self.sender.get_unsolicited(timeout).await
    }

    /// Voluntarily tear down this session (used when the registry refuses a
    /// duplicate registration, or by administrative action).
    pub fn disconnect(&self) {
        self.cancel.cancel();
    }

    #[cfg(test)]
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new_for_test<R, W>(
        device_id: String,
        read: R,
        write: W,
        timeout: Duration,
        post_process: PostProcessor,
        registry: Arc<DeviceRegistry>,
        event_callback: Option<EventCallback>,
        command_callback: Option<CommandCallback>,
        cancel: CancellationToken,
    ) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let line_session = LineSession::new(read, write, "\r", "\r");
        let registry_for_hook = registry.clone();
        let device_id_for_hook = device_id.clone();
        let on_unsolicited = event_callback.map(|cb| {
            let registry = registry_for_hook;
            let device_id = device_id_for_hook;
            std::sync::Arc::new(move |line: &str| cb(&registry, &device_id, line)) as crate::queued_sender::UnsolicitedHook
        });
        let (sender, _join) = QueuedLineSender::spawn(line_session, timeout, post_process, on_unsolicited, cancel.clone());
        Self { device_id, sender, registry, command_callback, cancel }
    }
}

/// Waits for the session's actor to stop, then unregisters it unless the stop
/// was a voluntary abort (a duplicate-registration disconnect that never made
/// it into the registry in the first place).
async fn watch_for_connection_loss(
    join: tokio::task::JoinHandle<ClosedReason>,
    registry: Arc<DeviceRegistry>,
    device_id: String,
    session: Arc<DeviceSession>,
) {
    let reason = join.await.unwrap_or(ClosedReason::TransportError);
    if reason != ClosedReason::Disconnected {
        registry.unregister(&device_id, &session).await;
    }
}

/// Helper so other modules can match on a `SendResult` without constructing one
/// by hand in tests.
pub fn is_closed(result: &SendResult) -> bool {
    matches!(result, Err(SendError::Closed))
}

pub fn is_timeout(result: &SendResult) -> bool {
    matches!(result, Ok(SendOutcome::Timeout))
}
