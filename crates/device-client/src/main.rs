// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use clap::Parser;
use tokio_util::sync::CancellationToken;

use hamjab_device_client::backend::EchoBackend;
use hamjab_device_client::config::DeviceClientConfig;

#[tokio::main]
async fn main() {
    let config = DeviceClientConfig::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")))
        .init();

    let shutdown = CancellationToken::new();
    let shutdown_on_signal = shutdown.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        shutdown_on_signal.cancel();
    });

    // This binary ships with the loopback backend only; a real device driver
    // implements `DeviceBackend` and is wired in here in its place.
    hamjab_device_client::run(config, EchoBackend, shutdown).await;
}
