// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Macro Executor (C5): runs a named sequence of device commands sequentially,
//! aborting early on the first step that comes back `NO_DEVICE_FOUND` or `TIMEOUT`.

use std::time::Duration;

use tracing::{info, warn};

use crate::macro_def::MacroTable;
use crate::registry::DeviceRegistry;
use crate::sentinel::{DispatchError, Outcome, DELAY_DEVICE};

/// Run the macro named `macro_id` against `registry`, sending each step through
/// the normal dispatch path and sleeping for `DELAY` steps.
///
/// Steps execute strictly sequentially; a step result that aborts the macro
/// (`NO_DEVICE_FOUND` or `TIMEOUT`) short-circuits the remaining steps. Reaching
/// the end of the list without an abort resolves to `Outcome::Success`.
pub async fn run_macro(registry: &DeviceRegistry, macros: &MacroTable, macro_id: &str) -> Result<Outcome, DispatchError> {
    let definition = macros.get(macro_id).ok_or_else(|| DispatchError::UnknownMacro(macro_id.to_owned()))?;

    info!(macro_id, name = %definition.name, steps = definition.commands.len(), "macro start");

    for (index, step) in definition.commands.iter().enumerate() {
        if step.device == DELAY_DEVICE {
            let seconds: u64 = step.command.parse().map_err(|_| DispatchError::MalformedCommand)?;
            info!(macro_id, index, seconds, "macro delay");
            tokio::time::sleep(Duration::from_secs(seconds)).await;
            continue;
        }

        let outcome = dispatch_step(registry, &step.device, &step.command).await?;
        info!(macro_id, index, device = %step.device, outcome = %outcome, "macro step");

        if outcome.aborts_macro() {
            warn!(macro_id, index, device = %step.device, outcome = %outcome, "macro aborted");
            return Ok(outcome);
        }
    }

    info!(macro_id, "macro finished");
    Ok(Outcome::Success)
}

async fn dispatch_step(registry: &DeviceRegistry, device_id: &str, command: &str) -> Result<Outcome, DispatchError> {
    let Some(session) = registry.get(device_id).await else {
        return Ok(Outcome::NoDeviceFound);
    };

    match session.send_command(command).await {
        Ok(crate::queued_sender::SendOutcome::Line(line)) => Ok(Outcome::Line(line)),
        Ok(crate::queued_sender::SendOutcome::Timeout) => Ok(Outcome::Timeout),
        Err(crate::queued_sender::SendError::Closed) => Ok(Outcome::NoDeviceFound),
        Err(crate::queued_sender::SendError::Protocol(e)) => Err(DispatchError::Protocol(e.to_string())),
    }
}
