// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire-level sentinels and the `Outcome` sum type that carries them.

use std::borrow::Cow;
use std::fmt;

/// Reserved pseudo-device id for a macro's timed delay step.
pub const DELAY_DEVICE: &str = "DELAY";

/// Result of a dispatched operation, as seen by the Dispatcher and the Macro Executor.
///
/// `Outcome::Line` carries a real device response or unsolicited event; the other
/// variants are the process-wide sentinel strings documented as part of the wire
/// contract and must serialize verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Line(String),
    Timeout,
    NoDeviceFound,
    Success,
    Disabled,
}

impl Outcome {
    /// True for the two outcomes that abort a running macro early.
    pub fn aborts_macro(&self) -> bool {
        matches!(self, Outcome::NoDeviceFound | Outcome::Timeout)
    }

    pub fn as_wire(&self) -> Cow<'_, str> {
        match self {
            Outcome::Line(line) => Cow::Borrowed(line.as_str()),
            Outcome::Timeout => Cow::Borrowed("TIMEOUT"),
            Outcome::NoDeviceFound => Cow::Borrowed("NO_DEVICE_FOUND"),
            Outcome::Success => Cow::Borrowed("SUCCESS"),
            Outcome::Disabled => Cow::Borrowed("DISABLED"),
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_wire())
    }
}

/// Errors the Dispatcher surfaces that are not themselves part of the sentinel
/// vocabulary (they represent a caller/config mistake, not a device-side outcome).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    MalformedCommand,
    UnknownMacro(String),
    Protocol(String),
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::MalformedCommand => write!(f, "malformed command"),
            DispatchError::UnknownMacro(name) => write!(f, "unknown macro: {name}"),
            DispatchError::Protocol(msg) => write!(f, "protocol error: {msg}"),
        }
    }
}

impl std::error::Error for DispatchError {}
