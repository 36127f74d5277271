// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-wide device id → Device Session map (C4).

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::device_session::DeviceSession;

/// Registers and looks up live Device Sessions by id.
///
/// Mutated only by `DeviceSession::register`/`unregister`; read by the Dispatcher
/// and the Macro Executor. A single instance is shared (behind an `Arc`) across
/// the whole process. Uses an async `RwLock` rather than a std one: critical
/// sections never block, but holding the lock across an await point must stay
/// safe by construction as the registry grows new call sites.
#[derive(Default)]
pub struct DeviceRegistry {
    sessions: RwLock<HashMap<String, Arc<DeviceSession>>>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `session` under its device id.
    ///
    /// Returns `false` (and registers nothing) if a session is already registered
    /// under that id — the caller is expected to disconnect the new connection.
    pub async fn register(&self, session: Arc<DeviceSession>) -> bool {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(session.device_id()) {
            return false;
        }
        sessions.insert(session.device_id().to_owned(), session);
        true
    }

    /// Remove `device_id` from the registry, but only if the entry currently
    /// installed there is `session` — a session that lost a registration race
    /// must not unregister the winner on its own way out.
    pub async fn unregister(&self, device_id: &str, session: &Arc<DeviceSession>) {
        let mut sessions = self.sessions.write().await;
        if let Some(existing) = sessions.get(device_id) {
            if Arc::ptr_eq(existing, session) {
                sessions.remove(device_id);
            }
        }
    }

    pub async fn is_registered(&self, device_id: &str) -> bool {
        self.sessions.read().await.contains_key(device_id)
    }

    pub async fn get(&self, device_id: &str) -> Option<Arc<DeviceSession>> {
        self.sessions.read().await.get(device_id).cloned()
    }

    /// Device ids currently registered, in lexicographic order.
    pub async fn ids(&self) -> Vec<String> {
        let sessions = self.sessions.read().await;
        let mut ids: Vec<String> = sessions.keys().cloned().collect();
        ids.sort();
        ids
    }
}
