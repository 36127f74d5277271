// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command Dispatcher (C6): the adaptation layer HTTP handlers call into.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::macro_def::MacroTable;
use crate::macro_executor;
use crate::registry::DeviceRegistry;
use crate::sentinel::{DispatchError, Outcome};

/// Binds the Device Registry and the loaded macro table behind a single
/// `disabled` kill switch. One instance is shared (behind an `Arc`) by every
/// Control Server handler.
pub struct Dispatcher {
    registry: Arc<DeviceRegistry>,
    macros: MacroTable,
    disabled: AtomicBool,
}

impl Dispatcher {
    pub fn new(registry: Arc<DeviceRegistry>, macros: MacroTable) -> Self {
        Self { registry, macros, disabled: AtomicBool::new(false) }
    }

    pub async fn list_devices(&self) -> Vec<String> {
        self.registry.ids().await
    }

    pub async fn send_command(&self, device_id: &str, command: &str) -> Result<Outcome, DispatchError> {
        if self.is_disabled() {
            return Ok(Outcome::Disabled);
        }
        if command.trim().is_empty() {
            return Err(DispatchError::MalformedCommand);
        }

        let Some(session) = self.registry.get(device_id).await else {
            return Ok(Outcome::NoDeviceFound);
        };

        let outcome = match session.send_command(command).await {
            Ok(crate::queued_sender::SendOutcome::Line(line)) => Outcome::Line(line),
            Ok(crate::queued_sender::SendOutcome::Timeout) => Outcome::Timeout,
            Err(crate::queued_sender::SendError::Closed) => Outcome::NoDeviceFound,
            Err(crate::queued_sender::SendError::Protocol(e)) => return Err(DispatchError::Protocol(e.to_string())),
        };

        info!(device_id, command, outcome = %outcome, "dispatch send_command");
        Ok(outcome)
    }

    pub async fn get_unsolicited(&self, device_id: &str, timeout: Option<Duration>) -> Result<Outcome, DispatchError> {
        if self.is_disabled() {
            return Ok(Outcome::Disabled);
        }

        let Some(session) = self.registry.get(device_id).await else {
            return Ok(Outcome::NoDeviceFound);
        };

        match session.get_unsolicited(timeout).await {
            Ok(crate::queued_sender::SendOutcome::Line(line)) => Ok(Outcome::Line(line)),
            Ok(crate::queued_sender::SendOutcome::Timeout) => Ok(Outcome::Timeout),
            Err(crate::queued_sender::SendError::Closed) => Ok(Outcome::NoDeviceFound),
            Err(crate::queued_sender::SendError::Protocol(e)) => Err(DispatchError::Protocol(e.to_string())),
        }
    }

    pub async fn run_macro(&self, macro_id: &str) -> Result<Outcome, DispatchError> {
        if self.is_disabled() {
            return Ok(Outcome::Disabled);
        }
        macro_executor::run_macro(&self.registry, &self.macros, macro_id).await
    }

    pub fn toggle_disabled(&self) -> bool {
        let new_state = !self.disabled.load(Ordering::SeqCst);
        self.disabled.store(new_state, Ordering::SeqCst);
        info!(disabled = new_state, "dispatcher disabled flag toggled");
        new_state
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled.load(Ordering::SeqCst)
    }
}
