// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process configuration for the hamjab hub.

use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the device server + control server process.
#[derive(Debug, Clone, clap::Parser)]
#[command(name = "hamjab-hub", version, about)]
pub struct HubConfig {
    /// Host to bind both listeners on.
    #[arg(long, default_value = "0.0.0.0", env = "HAMJAB_HOST")]
    pub host: String,

    /// TCP port Device Clients connect to.
    #[arg(long, default_value_t = 8007, env = "HAMJAB_DEVICE_PORT")]
    pub device_port: u16,

    /// HTTP port the Control Server listens on.
    #[arg(long, default_value_t = 8080, env = "HAMJAB_HTTP_PORT")]
    pub http_port: u16,

    /// Path to the macro definitions JSON file.
    #[arg(long, env = "HAMJAB_MACROS_PATH")]
    pub macros_path: Option<PathBuf>,

    /// Bearer token required on the HTTP surface. If unset, auth is disabled.
    #[arg(long, env = "HAMJAB_AUTH_TOKEN")]
    pub auth_token: Option<String>,

    /// Default per-request timeout in seconds for plain Queued Line Senders.
    #[arg(long, default_value_t = 30, env = "HAMJAB_DEFAULT_TIMEOUT_SECS")]
    pub default_timeout_secs: u64,

    /// Per-request timeout in seconds for Device Sessions (slower serial hardware).
    #[arg(long, default_value_t = 60, env = "HAMJAB_DEVICE_TIMEOUT_SECS")]
    pub device_timeout_secs: u64,
}

impl HubConfig {
    pub fn default_timeout(&self) -> Duration {
        Duration::from_secs(self.default_timeout_secs)
    }

    pub fn device_timeout(&self) -> Duration {
        Duration::from_secs(self.device_timeout_secs)
    }

    pub fn device_addr(&self) -> String {
        format!("{}:{}", self.host, self.device_port)
    }

    pub fn http_addr(&self) -> String {
        format!("{}:{}", self.host, self.http_port)
    }
}
