// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Optional bearer-token auth middleware for the Control Server (C8/C9).

use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::error::HubError;
use crate::transport::HubState;

/// Constant-time string comparison to avoid leaking token length/prefix via timing.
fn constant_time_eq(a: &str, b: &str) -> bool {
    let a = a.as_bytes();
    let b = b.as_bytes();
    if a.len() != b.len() {
        return false;
    }
    let mut acc = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        acc |= x ^ y;
    }
    acc == 0
}

/// Validate a `Authorization: Bearer <token>` header against `expected`.
///
/// When `expected` is `None`, auth is disabled and every request passes.
pub fn validate_bearer(headers: &HeaderMap, expected: Option<&str>) -> Result<(), HubError> {
    let Some(expected) = expected else {
        return Ok(());
    };

    let header = headers.get("authorization").and_then(|v| v.to_str().ok()).ok_or(HubError::Unauthorized)?;
    let token = header.strip_prefix("Bearer ").ok_or(HubError::Unauthorized)?;
    if constant_time_eq(token, expected) {
        Ok(())
    } else {
        Err(HubError::Unauthorized)
    }
}

/// Axum middleware enforcing bearer auth on every route when a token is configured.
pub async fn auth_layer(state: State<Arc<HubState>>, req: Request<axum::body::Body>, next: Next) -> Response {
    if let Err(code) = validate_bearer(req.headers(), state.auth_token.as_deref()) {
        return (code.http_status(), Json(crate::error::ErrorBody { code: code.as_str().to_owned(), message: "unauthorized".to_owned() }))
            .into_response();
    }
    next.run(req).await
}
