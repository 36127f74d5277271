// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP handlers for the Control Server (C8), binding Dispatcher calls onto the
//! routes of §6 and mapping their outcomes to the documented status codes/bodies.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;

use crate::error::HubError;
use crate::sentinel::{DispatchError, Outcome};
use crate::transport::HubState;

fn outcome_response(outcome: Outcome) -> axum::response::Response {
    match outcome {
        Outcome::Line(line) => line.into_response(),
        Outcome::Success => Outcome::Success.to_string().into_response(),
        Outcome::Disabled => Outcome::Disabled.to_string().into_response(),
        Outcome::Timeout => HubError::UpstreamTimeout.to_http_response(Outcome::Timeout.to_string()).into_response(),
        Outcome::NoDeviceFound => HubError::DeviceNotFound.to_http_response(Outcome::NoDeviceFound.to_string()).into_response(),
    }
}

fn dispatch_error_response(err: DispatchError) -> axum::response::Response {
    match err {
        DispatchError::MalformedCommand => HubError::BadRequest.to_json_response("malformed command").into_response(),
        DispatchError::UnknownMacro(name) => HubError::UnknownMacro.to_json_response(format!("unknown macro: {name}")).into_response(),
        DispatchError::Protocol(msg) => HubError::Internal.to_json_response(msg).into_response(),
    }
}

/// `GET /listDevices`
pub async fn list_devices(State(state): State<Arc<HubState>>) -> impl IntoResponse {
    Json(state.dispatcher.list_devices().await)
}

/// `POST /{device_id}/sendCommand?command=...`
pub async fn send_command(
    State(state): State<Arc<HubState>>,
    Path(device_id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> axum::response::Response {
    let Some(command) = params.get("command") else {
        return HubError::BadRequest.to_json_response("missing command query parameter").into_response();
    };

    match state.dispatcher.send_command(&device_id, command).await {
        Ok(outcome) => outcome_response(outcome),
        Err(err) => dispatch_error_response(err),
    }
}

/// `GET /{device_id}/getUnsolicited`
pub async fn get_unsolicited(State(state): State<Arc<HubState>>, Path(device_id): Path<String>) -> axum::response::Response {
    match state.dispatcher.get_unsolicited(&device_id, Some(state.default_timeout)).await {
        Ok(outcome) => outcome_response(outcome),
        Err(err) => dispatch_error_response(err),
    }
}

/// `POST /macro?macroName=...`
pub async fn run_macro(State(state): State<Arc<HubState>>, Query(params): Query<HashMap<String, String>>) -> axum::response::Response {
    let Some(macro_name) = params.get("macroName") else {
        return HubError::BadRequest.to_json_response("missing macroName query parameter").into_response();
    };

    match state.dispatcher.run_macro(macro_name).await {
        Ok(outcome) => outcome_response(outcome),
        Err(err) => dispatch_error_response(err),
    }
}

/// `GET /toggleStatus`
pub async fn toggle_status(State(state): State<Arc<HubState>>) -> impl IntoResponse {
    let disabled = state.dispatcher.toggle_disabled();
    format!("disabled={disabled}")
}
