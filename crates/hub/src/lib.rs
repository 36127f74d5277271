// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! hamjab-hub: a home-automation command hub.
//!
//! A Device Server (C1-C4) maintains persistent TCP connections to Device
//! Clients; a Control Server (C8) exposes those devices over HTTP, including
//! single commands, scripted macros (C5), and long-polled unsolicited events.

pub mod config;
pub mod device_server;
pub mod device_session;
pub mod dispatcher;
pub mod error;
pub mod line_session;
pub mod macro_def;
pub mod macro_executor;
pub mod queued_sender;
pub mod registry;
pub mod sentinel;
pub mod transport;

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::HubConfig;
use crate::dispatcher::Dispatcher;
use crate::registry::DeviceRegistry;
use crate::transport::HubState;

/// Run the hub until `shutdown` is cancelled: loads the macro table, then
/// drives the Device Server and Control Server concurrently.
pub async fn run(config: HubConfig, shutdown: CancellationToken) -> anyhow::Result<()> {
    let macros = match &config.macros_path {
        Some(path) => crate::macro_def::load(path)?,
        None => Arc::new(std::collections::HashMap::new()),
    };
    info!(macro_count = macros.len(), "macro table loaded");

    let registry = Arc::new(DeviceRegistry::new());
    let dispatcher = Arc::new(Dispatcher::new(registry.clone(), macros));

    let state = Arc::new(HubState { dispatcher, auth_token: config.auth_token.clone(), default_timeout: config.default_timeout() });

    let device_addr = config.device_addr();
    let device_shutdown = shutdown.clone();
    let device_registry = registry.clone();
    let device_timeout = config.device_timeout();
    let device_server = tokio::spawn(async move {
        crate::device_server::run(&device_addr, device_registry, device_timeout, None, None, device_shutdown).await
    });

    let http_addr = config.http_addr();
    let router = crate::transport::build_router(state);
    let http_shutdown = shutdown.clone();
    let control_server = tokio::spawn(async move {
        let listener = TcpListener::bind(&http_addr).await?;
        info!(addr = %http_addr, "control server listening");
        axum::serve(listener, router).with_graceful_shutdown(http_shutdown.cancelled_owned()).await?;
        anyhow::Ok(())
    });

    let (device_result, control_result) = tokio::join!(device_server, control_server);
    device_result??;
    control_result??;
    Ok(())
}
