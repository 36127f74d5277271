// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! API-facing error envelope for the HTTP transport.
//!
//! Mirrors the error-code/status-code pairing convention of an axum-based proxy:
//! a small enum of machine-readable codes, each with a fixed HTTP status.

use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HubError {
    Unauthorized,
    BadRequest,
    DeviceNotFound,
    UnknownMacro,
    UpstreamTimeout,
    Internal,
}

impl HubError {
    pub fn http_status(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::BadRequest => StatusCode::BAD_REQUEST,
            Self::DeviceNotFound => StatusCode::INTERNAL_SERVER_ERROR,
            Self::UnknownMacro => StatusCode::BAD_REQUEST,
            Self::UpstreamTimeout => StatusCode::OK,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unauthorized => "UNAUTHORIZED",
            Self::BadRequest => "BAD_REQUEST",
            Self::DeviceNotFound => "NO_DEVICE_FOUND",
            Self::UnknownMacro => "UNKNOWN_MACRO",
            Self::UpstreamTimeout => "TIMEOUT",
            Self::Internal => "INTERNAL",
        }
    }

    pub fn to_http_response(&self, message: impl Into<String>) -> (StatusCode, String) {
        (self.http_status(), message.into())
    }
}

impl fmt::Display for HubError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// JSON error envelope used by routes that return structured errors (e.g. macro lookup).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

impl HubError {
    pub fn to_json_response(&self, message: impl Into<String>) -> (StatusCode, Json<ErrorBody>) {
        (self.http_status(), Json(ErrorBody { code: self.as_str().to_owned(), message: message.into() }))
    }
}
