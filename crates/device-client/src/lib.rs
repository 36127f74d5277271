// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reconnecting Client Factory (C7): maintains a Device Client's TCP connection
//! to the hub's Device Server, re-announcing the device id on every reconnect.

pub mod backend;
pub mod config;

use std::time::Duration;

use hamjab_hub::line_session::LineSession;
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backend::DeviceBackend;
use crate::config::DeviceClientConfig;

const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Run the reconnect loop until `shutdown` is cancelled.
///
/// On every successful connect, `device_id` is re-announced as the bootstrap
/// line before commands are serviced. A dropped or failed connection triggers a
/// reconnect after an exponential backoff that resets to [`INITIAL_BACKOFF`] on
/// the next successful connect.
pub async fn run(config: DeviceClientConfig, mut backend: impl DeviceBackend, shutdown: CancellationToken) {
    let addr = config.addr();
    let mut backoff = INITIAL_BACKOFF;

    loop {
        if shutdown.is_cancelled() {
            return;
        }

        info!(addr, device_id = %config.device_id, "connecting to device server");
        match TcpStream::connect(&addr).await {
            Ok(stream) => {
                backoff = INITIAL_BACKOFF;
                info!(addr, "connected");
                let (read, write) = stream.into_split();
                let mut session = LineSession::new(read, write, "\r", "\r");

                if let Err(e) = session.write_line(&config.device_id).await {
                    warn!(err = %e, "failed to announce device id");
                } else if let Err(e) = service_connection(&mut session, &mut backend, &shutdown).await {
                    debug!(err = %e, "device connection ended");
                }
            }
            Err(e) => {
                warn!(addr, err = %e, "connect failed, retrying");
            }
        }

        if shutdown.is_cancelled() {
            return;
        }

        tokio::select! {
            _ = shutdown.cancelled() => return,
            _ = tokio::time::sleep(backoff) => {}
        }
        backoff = (backoff * 2).min(MAX_BACKOFF);
    }
}

/// Service one live connection: read commands from the hub, dispatch them to
/// `backend`, and write back responses, until the connection drops.
async fn service_connection<R, W>(
    session: &mut LineSession<R, W>,
    backend: &mut impl DeviceBackend,
    shutdown: &CancellationToken,
) -> std::io::Result<()>
where
    R: tokio::io::AsyncRead + Unpin,
    W: tokio::io::AsyncWrite + Unpin,
{
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => return Ok(()),
            line = session.read_line() => {
                match line? {
                    Some(command) => {
                        let response = backend.handle_command(&command).await;
                        session.write_line(&response).await?;
                    }
                    None => return Ok(()),
                }
            }
            event = backend.poll_unsolicited() => {
                if let Some(event) = event {
                    session.write_line(&event).await?;
                }
            }
        }
    }
}
