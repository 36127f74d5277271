// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process configuration for a Device Client.

/// Configuration for a single Device Client process.
#[derive(Debug, Clone, clap::Parser)]
#[command(name = "hamjab-device-client", version, about)]
pub struct DeviceClientConfig {
    /// Host of the Device Server to connect to.
    #[arg(long, default_value = "127.0.0.1", env = "HAMJAB_HUB_HOST")]
    pub host: String,

    /// Port of the Device Server's TCP listener.
    #[arg(long, default_value_t = 8007, env = "HAMJAB_HUB_PORT")]
    pub port: u16,

    /// Device id announced as the first line on each connection.
    #[arg(long, env = "HAMJAB_DEVICE_ID")]
    pub device_id: String,
}

impl DeviceClientConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
