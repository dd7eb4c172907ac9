// SPDX-License-Identifier: MIT

//! Shared application state, cloned into every axum handler (spec §10.5,
//! grounded on the relay server's `AppState` pattern).

use chost_engine::{ExecutorRegistry, SessionManager};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::auth::AuthProvider;

/// Executor-output-to-browser half of a remote terminal/rich splice,
/// keyed by channel id. The browser-input-to-executor half is owned by
/// `ExecutorRegistry::wait_for_terminal_channel`/`resolve_terminal_channel`;
/// this map carries traffic in the other direction, which the registry
/// doesn't model since it's a Frontdoor-local concern, not a routing one.
pub type TerminalRelays = Arc<Mutex<HashMap<String, mpsc::UnboundedSender<Vec<u8>>>>>;

#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionManager>,
    pub registry: ExecutorRegistry,
    pub auth: Arc<dyn AuthProvider>,
    pub terminal_relays: TerminalRelays,
    pub started_at: i64,
}

impl AppState {
    pub fn new(sessions: Arc<SessionManager>, registry: ExecutorRegistry, auth: Arc<dyn AuthProvider>, started_at: i64) -> Self {
        Self {
            sessions,
            registry,
            auth,
            terminal_relays: Arc::new(Mutex::new(HashMap::new())),
            started_at,
        }
    }
}
