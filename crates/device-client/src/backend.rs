// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The device-specific half of a Device Client: translates a line received from
//! the hub into a physical-device action and a response line, and separately
//! surfaces unsolicited events the physical device emits on its own schedule.
//!
//! A concrete implementation owns whatever serial port / local socket talks to
//! the real hardware; this crate ships only [`EchoBackend`], a loopback backend
//! used for local testing and as a template for real device drivers.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// Per-connection device driver. Not `Sync`: exactly one task drives a backend
/// at a time, matching the one-device-one-session invariant of the hub side.
pub trait DeviceBackend: Send {
    /// Handle one command line from the hub, returning the response line to
    /// send back. Must resolve — a backend that cannot reach the physical
    /// device should still return a line (e.g. an error sentinel understood by
    /// the caller), since the wire protocol has no room for a dropped reply.
    fn handle_command<'a>(&'a mut self, command: &'a str) -> Pin<Box<dyn Future<Output = String> + Send + 'a>>;

    /// Wait for the next unsolicited event from the device, or `None` if this
    /// backend never produces any (the default).
    fn poll_unsolicited(&mut self) -> Pin<Box<dyn Future<Output = Option<String>> + Send + '_>> {
        Box::pin(std::future::pending())
    }
}

/// Loopback backend: echoes every command back as its own response, and never
/// emits unsolicited events. Used by the binary's `--echo` mode and by tests.
#[derive(Debug, Default)]
pub struct EchoBackend;

impl DeviceBackend for EchoBackend {
    fn handle_command<'a>(&'a mut self, command: &'a str) -> Pin<Box<dyn Future<Output = String> + Send + 'a>> {
        Box::pin(async move {
            tokio::time::sleep(Duration::from_millis(1)).await;
            command.to_owned()
        })
    }
}
