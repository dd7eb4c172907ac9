// SPDX-License-Identifier: MIT

//! `ExecutorRegistry` (C5): the set of connected remote executors, typed RPC
//! correlation over their control channels, and terminal byte-channel
//! rendezvous (spec §4.5).

use chost_core::{ExecutorRecord, IdGen, UuidIdGen};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;

use crate::error::EngineError;

pub const RPC_TIMEOUT: Duration = Duration::from_secs(30);
pub const HEARTBEAT_TIMEOUT: Duration = Duration::from_secs(45);
pub const HEALTH_CHECK_INTERVAL: Duration = Duration::from_secs(15);
pub const TERMINAL_CHANNEL_TIMEOUT: Duration = Duration::from_secs(10);
const LOG_BUFFER_CAP: usize = 200;

/// One row of the executor's cached session liveness from its last heartbeat.
#[derive(Debug, Clone)]
pub struct SessionLiveness {
    pub name: String,
    pub alive: bool,
    pub last_activity: i64,
}

#[derive(Debug, Clone)]
pub struct LogEntry {
    pub timestamp: i64,
    pub executor_id: String,
    pub event: String,
    pub detail: Option<String>,
}

struct ExecutorConn {
    info: ExecutorRecord,
    owner_user_id: String,
    sessions: Vec<SessionLiveness>,
    control_tx: mpsc::UnboundedSender<Value>,
}

struct PendingRpc {
    executor_id: String,
    resolver: oneshot::Sender<Result<Value, EngineError>>,
}

struct PendingChannel {
    resolver: oneshot::Sender<mpsc::UnboundedSender<Vec<u8>>>,
}

/// Tracks connected remote executors and brokers RPCs/terminal channels to
/// and from them. Cheap to clone; every clone shares the same state.
#[derive(Clone)]
pub struct ExecutorRegistry {
    executors: Arc<Mutex<HashMap<String, ExecutorConn>>>,
    pending_rpcs: Arc<Mutex<HashMap<String, PendingRpc>>>,
    pending_channels: Arc<Mutex<HashMap<String, PendingChannel>>>,
    logs: Arc<Mutex<VecDeque<LogEntry>>>,
    ids: Arc<UuidIdGen>,
    rpc_timeout: Duration,
    heartbeat_timeout: Duration,
}

impl Default for ExecutorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecutorRegistry {
    pub fn new() -> Self {
        Self::with_timeouts(RPC_TIMEOUT, HEARTBEAT_TIMEOUT)
    }

    /// Build a registry with caller-supplied RPC/heartbeat timeouts (spec
    /// §10.3 live configuration overrides).
    pub fn with_timeouts(rpc_timeout: Duration, heartbeat_timeout: Duration) -> Self {
        Self {
            executors: Arc::new(Mutex::new(HashMap::new())),
            pending_rpcs: Arc::new(Mutex::new(HashMap::new())),
            pending_channels: Arc::new(Mutex::new(HashMap::new())),
            logs: Arc::new(Mutex::new(VecDeque::new())),
            ids: Arc::new(UuidIdGen),
            rpc_timeout,
            heartbeat_timeout,
        }
    }

    /// Spawn the 15 s health-check ticker that forces a disconnect on any
    /// executor whose last heartbeat is older than the configured heartbeat
    /// timeout.
    pub fn spawn_health_check(&self, now_fn: impl Fn() -> i64 + Send + Sync + 'static) {
        let this = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(HEALTH_CHECK_INTERVAL);
            let heartbeat_timeout = this.heartbeat_timeout.as_secs() as i64;
            loop {
                interval.tick().await;
                let now = now_fn();
                let stale: Vec<String> = {
                    let executors = this.executors.lock();
                    executors
                        .iter()
                        .filter(|(_, c)| {
                            c.info.status == chost_core::ExecutorStatus::Online
                                && now - c.info.last_seen > heartbeat_timeout
                        })
                        .map(|(id, _)| id.clone())
                        .collect()
                };
                for executor_id in stale {
                    this.disconnect(&executor_id, "timed_out");
                }
            }
        });
    }

    /// First frame from an executor's control socket.
    pub fn register(
        &self,
        executor_id: String,
        name: String,
        labels: std::collections::BTreeSet<String>,
        version: Option<String>,
        owner_user_id: String,
        now: i64,
        control_tx: mpsc::UnboundedSender<Value>,
    ) {
        let info = ExecutorRecord {
            id: executor_id.clone(),
            owner_user_id: owner_user_id.clone(),
            name,
            labels,
            status: chost_core::ExecutorStatus::Online,
            last_seen: now,
            version,
        };
        self.executors.lock().insert(
            executor_id.clone(),
            ExecutorConn {
                info,
                owner_user_id,
                sessions: Vec::new(),
                control_tx,
            },
        );
        self.log(&executor_id, "registered", None);
    }

    pub fn heartbeat(&self, executor_id: &str, sessions: Vec<SessionLiveness>, now: i64) {
        let mut executors = self.executors.lock();
        if let Some(conn) = executors.get_mut(executor_id) {
            conn.info.last_seen = now;
            conn.sessions = sessions;
        }
    }

    /// A `response{id, ok, data?, error?}` frame arrived; resolve the
    /// matching pending RPC. Unknown ids are silently dropped.
    pub fn handle_response(&self, id: &str, ok: bool, data: Option<Value>, error: Option<String>) {
        let pending = self.pending_rpcs.lock().remove(id);
        if let Some(pending) = pending {
            let result = if ok {
                Ok(data.unwrap_or(Value::Null))
            } else {
                Err(EngineError::ExecutorOffline(error.unwrap_or_else(|| "rpc error".into())))
            };
            let _ = pending.resolver.send(result);
        }
    }

    pub fn info(&self, executor_id: &str) -> Option<ExecutorRecord> {
        self.executors.lock().get(executor_id).map(|c| c.info.clone())
    }

    /// Every executor this process has seen register this lifetime, online
    /// or offline, for overlaying onto the persisted store (spec §4.3).
    pub fn all(&self) -> Vec<ExecutorRecord> {
        self.executors.lock().values().map(|c| c.info.clone()).collect()
    }

    pub fn is_owned_by(&self, executor_id: &str, user_id: &str) -> bool {
        self.executors
            .lock()
            .get(executor_id)
            .map(|c| c.owner_user_id == user_id)
            .unwrap_or(false)
    }

    pub fn sessions(&self, executor_id: &str) -> Vec<SessionLiveness> {
        self.executors
            .lock()
            .get(executor_id)
            .map(|c| c.sessions.clone())
            .unwrap_or_default()
    }

    /// Send a typed RPC to the executor's control channel and await the
    /// matching `response`, or time out after `RPC_TIMEOUT`.
    pub async fn call(&self, executor_id: &str, op: &str, mut params: Value) -> Result<Value, EngineError> {
        let control_tx = {
            let executors = self.executors.lock();
            executors
                .get(executor_id)
                .map(|c| c.control_tx.clone())
                .ok_or_else(|| EngineError::ExecutorOffline(executor_id.to_string()))?
        };

        let id = self.ids.next_128();
        if let Some(obj) = params.as_object_mut() {
            obj.insert("type".into(), Value::String(op.to_string()));
            obj.insert("id".into(), Value::String(id.clone()));
        }

        let (resolver, receiver) = oneshot::channel();
        self.pending_rpcs.lock().insert(
            id.clone(),
            PendingRpc {
                executor_id: executor_id.to_string(),
                resolver,
            },
        );

        if control_tx.send(params).is_err() {
            self.pending_rpcs.lock().remove(&id);
            return Err(EngineError::ExecutorOffline(executor_id.to_string()));
        }

        match timeout(self.rpc_timeout, receiver).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(EngineError::RpcTimeout),
            Err(_) => {
                self.pending_rpcs.lock().remove(&id);
                Err(EngineError::RpcTimeout)
            }
        }
    }

    /// Push a one-way `upgrade` frame telling the executor to restart on a
    /// new binary (spec §4.7). No response is awaited; the executor closes
    /// its own control socket once it has drained in-flight work.
    pub fn upgrade(&self, executor_id: &str, reason: &str) -> Result<(), EngineError> {
        let control_tx = {
            let executors = self.executors.lock();
            executors
                .get(executor_id)
                .map(|c| c.control_tx.clone())
                .ok_or_else(|| EngineError::ExecutorOffline(executor_id.to_string()))?
        };
        control_tx
            .send(serde_json::json!({"type": "upgrade", "reason": reason}))
            .map_err(|_| EngineError::ExecutorOffline(executor_id.to_string()))
    }

    /// Register interest in a terminal channel that the executor is about
    /// to dial back with. Times out after `TERMINAL_CHANNEL_TIMEOUT`.
    pub async fn wait_for_terminal_channel(
        &self,
        channel_id: &str,
    ) -> Result<mpsc::UnboundedSender<Vec<u8>>, EngineError> {
        let (resolver, receiver) = oneshot::channel();
        self.pending_channels
            .lock()
            .insert(channel_id.to_string(), PendingChannel { resolver });

        match timeout(TERMINAL_CHANNEL_TIMEOUT, receiver).await {
            Ok(Ok(channel)) => Ok(channel),
            _ => {
                self.pending_channels.lock().remove(channel_id);
                Err(EngineError::RpcTimeout)
            }
        }
    }

    /// The executor dialed back for `channel_id`; fulfil the waiting
    /// attach. Returns `Err` (refuse with code 1008) if nothing is waiting.
    pub fn resolve_terminal_channel(
        &self,
        channel_id: &str,
        channel: mpsc::UnboundedSender<Vec<u8>>,
    ) -> Result<(), EngineError> {
        let pending = self.pending_channels.lock().remove(channel_id);
        match pending {
            Some(p) => {
                let _ = p.resolver.send(channel);
                Ok(())
            }
            None => Err(EngineError::Host(chost_core::HostError::NotFound(channel_id.to_string()))),
        }
    }

    /// Disconnect an executor: mark it offline and fail every pending RPC
    /// for it. The record is kept (not removed) so `SessionManager::list`
    /// can still see when it was last seen and prune its sessions only
    /// after they've been abandoned long enough (spec §8).
    pub fn disconnect(&self, executor_id: &str, reason: &str) {
        {
            let mut executors = self.executors.lock();
            if let Some(conn) = executors.get_mut(executor_id) {
                conn.info.status = chost_core::ExecutorStatus::Offline;
                conn.info.last_seen = chost_core::time::now_secs();
            }
        }

        let stale_ids: Vec<String> = {
            let pending = self.pending_rpcs.lock();
            pending
                .iter()
                .filter(|(_, p)| p.executor_id == executor_id)
                .map(|(id, _)| id.clone())
                .collect()
        };
        for id in stale_ids {
            if let Some(pending) = self.pending_rpcs.lock().remove(&id) {
                let _ = pending
                    .resolver
                    .send(Err(EngineError::ExecutorOffline(executor_id.to_string())));
            }
        }

        self.log(executor_id, reason, None);
    }

    fn log(&self, executor_id: &str, event: &str, detail: Option<String>) {
        let mut logs = self.logs.lock();
        if logs.len() >= LOG_BUFFER_CAP {
            logs.pop_front();
        }
        logs.push_back(LogEntry {
            timestamp: chost_core::time::now_secs(),
            executor_id: executor_id.to_string(),
            event: event.to_string(),
            detail,
        });
    }

    /// Log entries with timestamp >= `since`, oldest first.
    pub fn logs_since(&self, since: i64) -> Vec<LogEntry> {
        self.logs.lock().iter().filter(|e| e.timestamp >= since).cloned().collect()
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
