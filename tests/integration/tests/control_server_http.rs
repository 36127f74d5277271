// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP Control Server integration tests: a live fake device wired through the
//! full router, exercising auth, command dispatch, and macro execution.

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use tokio::io::{split, AsyncReadExt as _, AsyncWriteExt as _};

use hamjab_hub::device_session::DeviceSession;
use hamjab_hub::dispatcher::Dispatcher;
use hamjab_hub::macro_def::MacroTable;
use hamjab_hub::queued_sender::identity_post_processor;
use hamjab_hub::registry::DeviceRegistry;
use hamjab_hub::transport::{build_router, HubState};

async fn connect_fake_device(registry: &Arc<DeviceRegistry>, device_id: &str) -> tokio::io::DuplexStream {
    let (a, mut peer) = tokio::io::duplex(4096);
    let (r, w) = split(a);
    peer.write_all(format!("{device_id}\r").as_bytes()).await.unwrap();
    DeviceSession::bootstrap(r, w, "\r", "\r", Duration::from_secs(1), identity_post_processor(), registry.clone(), None, None)
        .await
        .unwrap()
        .expect("bootstrap should register the fake device");
    peer
}

fn empty_macros() -> MacroTable {
    Arc::new(std::collections::HashMap::new())
}

#[tokio::test]
async fn send_command_round_trips_through_the_whole_stack() {
    let registry = Arc::new(DeviceRegistry::new());
    let mut projector = connect_fake_device(&registry, "epson5030ub").await;

    let dispatcher = Arc::new(Dispatcher::new(registry, empty_macros()));
    let state = Arc::new(HubState { dispatcher, auth_token: None, default_timeout: Duration::from_secs(1) });
    let server = axum_test::TestServer::new(build_router(state)).unwrap();

    let responder = async {
        let mut buf = [0u8; 64];
        let n = projector.read(&mut buf).await.unwrap();
        assert!(String::from_utf8_lossy(&buf[..n]).contains("PWR ON"));
        projector.write_all(b"ok\r").await.unwrap();
    };

    let (response, _) = tokio::join!(server.post("/epson5030ub/sendCommand").add_query_param("command", "PWR ON"), responder);
    response.assert_status_ok();
    response.assert_text("ok");
}

#[tokio::test]
async fn send_command_to_unregistered_device_is_500_no_device_found() {
    let registry = Arc::new(DeviceRegistry::new());
    let dispatcher = Arc::new(Dispatcher::new(registry, empty_macros()));
    let state = Arc::new(HubState { dispatcher, auth_token: None, default_timeout: Duration::from_secs(1) });
    let server = axum_test::TestServer::new(build_router(state)).unwrap();

    let response = server.post("/ghost/sendCommand").add_query_param("command", "PING").await;
    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    response.assert_text("NO_DEVICE_FOUND");
}

#[tokio::test]
async fn device_timeout_is_200_ok_with_timeout_body() {
    let registry = Arc::new(DeviceRegistry::new());
    let _silent_device = connect_fake_device(&registry, "silent").await;

    let dispatcher = Arc::new(Dispatcher::new(registry, empty_macros()));
    let state = Arc::new(HubState { dispatcher, auth_token: None, default_timeout: Duration::from_millis(30) });
    let server = axum_test::TestServer::new(build_router(state)).unwrap();

    let response = server.post("/silent/sendCommand").add_query_param("command", "PING").await;
    response.assert_status_ok();
    response.assert_text("TIMEOUT");
}

#[tokio::test]
async fn bearer_auth_gates_every_route_when_configured() {
    let registry = Arc::new(DeviceRegistry::new());
    let dispatcher = Arc::new(Dispatcher::new(registry, empty_macros()));
    let state = Arc::new(HubState { dispatcher, auth_token: Some("topsecret".to_owned()), default_timeout: Duration::from_secs(1) });
    let server = axum_test::TestServer::new(build_router(state)).unwrap();

    let unauthenticated = server.get("/listDevices").await;
    unauthenticated.assert_status(StatusCode::UNAUTHORIZED);

    let wrong_token = server.get("/listDevices").add_header(axum::http::header::AUTHORIZATION, "Bearer nope").await;
    wrong_token.assert_status(StatusCode::UNAUTHORIZED);

    let authenticated = server.get("/listDevices").add_header(axum::http::header::AUTHORIZATION, "Bearer topsecret").await;
    authenticated.assert_status_ok();
}
