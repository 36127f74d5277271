// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end macro execution against the public Dispatcher/Registry surface,
//! using a duplex-backed Device Session in place of a real TCP connection.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{split, AsyncReadExt as _, AsyncWriteExt as _};

use hamjab_hub::device_session::DeviceSession;
use hamjab_hub::dispatcher::Dispatcher;
use hamjab_hub::macro_def::{self, MacroTable};
use hamjab_hub::queued_sender::identity_post_processor;
use hamjab_hub::registry::DeviceRegistry;
use hamjab_hub::sentinel::{DispatchError, Outcome};

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

fn macros_from_file(json: &str) -> MacroTable {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("macros.json");
    std::fs::write(&path, json).unwrap();
    macro_def::load(&path).unwrap()
}

#[tokio::test]
async fn macro_runs_against_two_devices_in_order() {
    let registry = Arc::new(DeviceRegistry::new());
    let mut lights = connect_fake_device(&registry, "lutrongrx3000").await;
    let mut screen = connect_fake_device(&registry, "epson5030ub").await;

    let macros = macros_from_file(
        r#"{
            "movie_night": {
                "name": "Movie Night",
                "commands": [
                    {"device": "lutrongrx3000", "command": ":A11"},
                    {"device": "epson5030ub", "command": "PWR ON"},
                    {"device": "DELAY", "command": "1"},
                    {"device": "lutrongrx3000", "command": ":A01"}
                ]
            }
        }"#,
    );

    let dispatcher = Dispatcher::new(registry, macros);

    let responder = async {
        let mut buf = [0u8; 128];
        let n = lights.read(&mut buf).await.unwrap();
        assert!(String::from_utf8_lossy(&buf[..n]).contains(":A11"));
        lights.write_all(b"ok\r").await.unwrap();

        let n = screen.read(&mut buf).await.unwrap();
        assert!(String::from_utf8_lossy(&buf[..n]).contains("PWR ON"));
        screen.write_all(b"ok\r").await.unwrap();

        let n = lights.read(&mut buf).await.unwrap();
        assert!(String::from_utf8_lossy(&buf[..n]).contains(":A01"));
        lights.write_all(b"ok\r").await.unwrap();
    };

    let start = tokio::time::Instant::now();
    let (result, _) = tokio::join!(dispatcher.run_macro("movie_night"), responder);
    assert_eq!(result.unwrap(), Outcome::Success);
    assert!(start.elapsed() >= Duration::from_secs(1), "the DELAY step should have actually slept");
}

#[tokio::test]
async fn macro_aborts_on_first_missing_device_without_touching_later_steps() {
    let registry = Arc::new(DeviceRegistry::new());
    let mut lights = connect_fake_device(&registry, "lutrongrx3000").await;

    let macros = macros_from_file(
        r#"{
            "bad_macro": {
                "name": "Bad Macro",
                "commands": [
                    {"device": "nonexistent", "command": "PING"},
                    {"device": "lutrongrx3000", "command": ":A11"}
                ]
            }
        }"#,
    );

    let dispatcher = Dispatcher::new(registry, macros);
    let result = dispatcher.run_macro("bad_macro").await.unwrap();
    assert_eq!(result, Outcome::NoDeviceFound);

    // Confirm the second step never went out over the wire.
    let mut buf = [0u8; 32];
    let read = tokio::time::timeout(Duration::from_millis(50), lights.read(&mut buf)).await;
    assert!(read.is_err(), "lights should not have received any traffic");
}

#[tokio::test]
async fn unknown_macro_name_is_rejected() {
    let registry = Arc::new(DeviceRegistry::new());
    let macros: MacroTable = Arc::new(std::collections::HashMap::new());
    let dispatcher = Dispatcher::new(registry, macros);

    let err = dispatcher.run_macro("does_not_exist").await.unwrap_err();
    assert_eq!(err, DispatchError::UnknownMacro("does_not_exist".to_owned()));
}

#[tokio::test]
async fn disabling_the_dispatcher_short_circuits_macros_but_not_device_listing() {
    let registry = Arc::new(DeviceRegistry::new());
    let _lights = connect_fake_device(&registry, "lutrongrx3000").await;

    let macros = macros_from_file(
        r#"{"noop": {"name": "Noop", "commands": []}}"#,
    );
    let dispatcher = Dispatcher::new(registry, macros);

    assert!(dispatcher.toggle_disabled());
    assert_eq!(dispatcher.run_macro("noop").await.unwrap(), Outcome::Disabled);
    assert_eq!(dispatcher.list_devices().await, vec!["lutrongrx3000".to_owned()]);

    assert!(!dispatcher.toggle_disabled());
    assert_eq!(dispatcher.run_macro("noop").await.unwrap(), Outcome::Success);
}
