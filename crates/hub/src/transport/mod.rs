// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Control Server: HTTP transport adapting the Dispatcher onto the routes of §6 (C8).

pub mod auth;
pub mod http;

use std::sync::Arc;
use std::time::Duration;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::dispatcher::Dispatcher;

/// Shared state behind every Control Server handler.
pub struct HubState {
    pub dispatcher: Arc<Dispatcher>,
    pub auth_token: Option<String>,
    pub default_timeout: Duration,
}

/// Build the axum `Router` for the Control Server.
pub fn build_router(state: Arc<HubState>) -> Router {
    Router::new()
        .route("/listDevices", get(http::list_devices))
        .route("/{device_id}/sendCommand", post(http::send_command))
        .route("/{device_id}/getUnsolicited", get(http::get_unsolicited))
        .route("/macro", post(http::run_macro))
        .route("/toggleStatus", get(http::toggle_status))
        .layer(middleware::from_fn_with_state(state.clone(), auth::auth_layer))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
