// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Device Server: the TCP accept loop that bootstraps incoming connections into
//! registered Device Sessions (C3/C4 wiring).

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::device_session::{CommandCallback, DeviceSession, EventCallback};
use crate::queued_sender::identity_post_processor;
use crate::registry::DeviceRegistry;

/// Accept Device Client connections on `addr` until `shutdown` is cancelled.
///
/// Each accepted connection is bootstrapped independently; a connection that
/// never announces a device id, or that loses a duplicate-registration race, is
/// dropped without affecting any other session.
pub async fn run(
    addr: &str,
    registry: Arc<DeviceRegistry>,
    session_timeout: Duration,
    event_callback: Option<EventCallback>,
    command_callback: Option<CommandCallback>,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(addr, "device server listening");

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("device server shutting down");
                return Ok(());
            }
            accepted = listener.accept() => {
                let (stream, peer_addr) = accepted?;
                let registry = registry.clone();
                let event_callback = event_callback.clone();
                let command_callback = command_callback.clone();
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, registry, session_timeout, event_callback, command_callback).await {
                        warn!(%peer_addr, err = %e, "device connection bootstrap failed");
                    }
                });
            }
        }
    }
}

async fn handle_connection(
    stream: tokio::net::TcpStream,
    registry: Arc<DeviceRegistry>,
    session_timeout: Duration,
    event_callback: Option<EventCallback>,
    command_callback: Option<CommandCallback>,
) -> std::io::Result<()> {
    let (read, write) = stream.into_split();
    match DeviceSession::bootstrap(read, write, "\r", "\r", session_timeout, identity_post_processor(), registry, event_callback, command_callback)
        .await?
    {
        Some(session) => {
            info!(device_id = session.device_id(), "device registered");
            Ok(())
        }
        None => Ok(()),
    }
}
