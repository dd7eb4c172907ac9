// SPDX-License-Identifier: MIT

//! `ExecutorInterface` (C4): the polymorphic facade with `Local` and
//! `Remote` variants, both performing the same operations against either an
//! in-process `TmuxRunner` or a remote executor over the control channel
//! (spec §4.4).
//!
//! Attach is deliberately not part of this trait: local attach is direct
//! object access to an in-process bridge, remote attach is an async
//! rendezvous through the `ExecutorRegistry`. The two don't share a call
//! shape, so `SessionManager` dispatches attach itself rather than forcing
//! a lowest-common-denominator signature here.

use async_trait::async_trait;
use chost_adapters::{CreatedWindow, ForkRequest, TmuxRunner, WindowLiveness};
use chost_adapters::probe::ProbeResult;
use chost_storage::RichEventLog;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::EngineError;
use crate::registry::ExecutorRegistry;
use crate::rich_bridge::RichBridgeHandle;
use crate::terminal_bridge::TerminalBridge;

#[async_trait]
pub trait ExecutorInterface: Send + Sync {
    async fn create_session(
        &self,
        name: &str,
        cwd: &Path,
        command: &str,
        env: &[(String, String)],
    ) -> Result<CreatedWindow, EngineError>;

    async fn create_rich_session(&self, name: &str, cwd: &Path, command: &str) -> Result<CreatedWindow, EngineError>;

    async fn create_job(
        &self,
        name: &str,
        cwd: &Path,
        agent_command: &str,
        prompt: &str,
        max_iterations: u32,
        env: &[(String, String)],
    ) -> Result<CreatedWindow, EngineError>;

    async fn delete_session(&self, name: &str) -> Result<(), EngineError>;

    async fn delete_rich_session(&self, name: &str) -> Result<(), EngineError>;

    async fn fork_session(&self, request: ForkRequest) -> Result<CreatedWindow, EngineError>;

    async fn list_sessions(&self) -> Result<Vec<WindowLiveness>, EngineError>;

    async fn snapshot_session(&self, name: &str, lines: u32) -> Result<String, EngineError>;

    async fn snapshot_rich_session(&self, name: &str) -> Result<String, EngineError>;

    async fn summarize_session(&self, agent_command: &str, prompt: &str) -> Result<ProbeResult, EngineError>;

    async fn analyze_session(&self, agent_command: &str, prompt: &str) -> Result<ProbeResult, EngineError>;
}

/// Render a rich session's persisted events as plain text, newest last —
/// used for both the local and (after RPC) remote snapshot responses.
pub fn render_rich_snapshot(events: &[Value]) -> String {
    events
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

/// In-process executor: drives `TmuxRunner` directly and owns the live
/// `RichBridgeHandle`/`RichEventLog` pairs for every rich session running
/// in this address space.
pub struct LocalExecutor {
    runner: Arc<dyn TmuxRunner>,
    terminal_bridge: Arc<TerminalBridge>,
    rich_dir: PathBuf,
    rich: Mutex<HashMap<String, (RichBridgeHandle, Arc<RichEventLog>)>>,
}

impl LocalExecutor {
    pub fn new(runner: Arc<dyn TmuxRunner>, terminal_bridge: Arc<TerminalBridge>, rich_dir: PathBuf) -> Self {
        Self {
            runner,
            terminal_bridge,
            rich_dir,
            rich: Mutex::new(HashMap::new()),
        }
    }

    pub fn terminal_bridge(&self) -> Arc<TerminalBridge> {
        Arc::clone(&self.terminal_bridge)
    }

    /// Look up a running rich session's bridge handle, for attach.
    pub fn rich_bridge(&self, name: &str) -> Option<RichBridgeHandle> {
        self.rich.lock().get(name).map(|(h, _)| h.clone())
    }

    /// Look up a running rich session's bridge handle, lazily reconstructing
    /// it from the durable event log and `command` when this process has no
    /// live handle for it — e.g. every pre-existing rich session the first
    /// time it's attached after a control-plane restart (spec §3 "restored
    /// from store on control-plane start").
    pub fn rich_bridge_or_restore(&self, name: &str, command: &str) -> Option<RichBridgeHandle> {
        if let Some(handle) = self.rich_bridge(name) {
            return Some(handle);
        }
        let log = Arc::new(RichEventLog::open(&self.rich_dir, name).ok()?);
        log.spawn_flush_task();
        let state = restore_rich_state(command, &log.events());
        let handle = RichBridgeHandle::spawn(command.to_string(), Arc::clone(&log), state);
        self.rich.lock().insert(name.to_string(), (handle.clone(), log));
        Some(handle)
    }
}

/// Rebuild a session's in-memory state from its persisted event log: the
/// agent session id is whatever the first replayed event's `session_id`
/// was, mirroring `RichSessionState::persist_event`'s "first wins" rule.
fn restore_rich_state(command: &str, events: &[Value]) -> chost_core::RichSessionState {
    let mut state = chost_core::RichSessionState::new(command);
    state.agent_session_id = events
        .iter()
        .find_map(|e| e.get("session_id").and_then(Value::as_str))
        .map(str::to_string);
    state
}

#[async_trait]
impl ExecutorInterface for LocalExecutor {
    async fn create_session(
        &self,
        name: &str,
        cwd: &Path,
        command: &str,
        env: &[(String, String)],
    ) -> Result<CreatedWindow, EngineError> {
        Ok(self.runner.create_window(name, cwd, command, env).await?)
    }

    async fn create_rich_session(&self, name: &str, cwd: &Path, command: &str) -> Result<CreatedWindow, EngineError> {
        let created = self.runner.create_window(name, cwd, command, &[]).await?;
        let log = Arc::new(chost_storage::RichEventLog::open(&self.rich_dir, name)?);
        log.spawn_flush_task();
        let mut state = chost_core::RichSessionState::new(command);
        state.agent_session_id = created.agent_session_id.clone();
        let handle = RichBridgeHandle::spawn(command.to_string(), Arc::clone(&log), state);
        self.rich.lock().insert(name.to_string(), (handle, log));
        Ok(created)
    }

    async fn create_job(
        &self,
        name: &str,
        cwd: &Path,
        agent_command: &str,
        prompt: &str,
        max_iterations: u32,
        env: &[(String, String)],
    ) -> Result<CreatedWindow, EngineError> {
        Ok(self
            .runner
            .create_job_window(name, cwd, agent_command, prompt, max_iterations, env)
            .await?)
    }

    async fn delete_session(&self, name: &str) -> Result<(), EngineError> {
        self.terminal_bridge.force_close(name);
        Ok(self.runner.delete_window(name).await?)
    }

    async fn delete_rich_session(&self, name: &str) -> Result<(), EngineError> {
        if let Some((handle, log)) = self.rich.lock().remove(name) {
            handle.shutdown().await;
            log.delete()?;
        }
        match self.runner.delete_window(name).await {
            Ok(()) | Err(chost_adapters::AdapterError::NotFound(_)) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn fork_session(&self, request: ForkRequest) -> Result<CreatedWindow, EngineError> {
        Ok(self.runner.fork_window(request).await?)
    }

    async fn list_sessions(&self) -> Result<Vec<WindowLiveness>, EngineError> {
        Ok(self.runner.list_windows().await?)
    }

    async fn snapshot_session(&self, name: &str, lines: u32) -> Result<String, EngineError> {
        Ok(self.runner.capture_pane(name, lines).await?)
    }

    async fn snapshot_rich_session(&self, name: &str) -> Result<String, EngineError> {
        let log = self.rich.lock().get(name).map(|(_, l)| Arc::clone(l));
        match log {
            Some(log) => Ok(render_rich_snapshot(&log.events())),
            None => {
                let log = chost_storage::RichEventLog::open(&self.rich_dir, name)?;
                Ok(render_rich_snapshot(&log.events()))
            }
        }
    }

    async fn summarize_session(&self, agent_command: &str, prompt: &str) -> Result<ProbeResult, EngineError> {
        Ok(chost_adapters::probe::run_probe(agent_command, prompt).await)
    }

    async fn analyze_session(&self, agent_command: &str, prompt: &str) -> Result<ProbeResult, EngineError> {
        Ok(chost_adapters::probe::run_probe(agent_command, prompt).await)
    }
}

/// Remote executor: every operation is an RPC over the control channel to
/// `executor_id` (spec §4.4, §4.5.1).
pub struct RemoteExecutor {
    registry: ExecutorRegistry,
    executor_id: String,
}

impl RemoteExecutor {
    pub fn new(registry: ExecutorRegistry, executor_id: impl Into<String>) -> Self {
        Self {
            registry,
            executor_id: executor_id.into(),
        }
    }
}

fn window_from_rpc(data: Value) -> CreatedWindow {
    CreatedWindow {
        name: data.get("name").and_then(Value::as_str).unwrap_or_default().to_string(),
        agent_session_id: data.get("agent_session_id").and_then(Value::as_str).map(str::to_string),
    }
}

#[async_trait]
impl ExecutorInterface for RemoteExecutor {
    async fn create_session(
        &self,
        name: &str,
        cwd: &Path,
        command: &str,
        env: &[(String, String)],
    ) -> Result<CreatedWindow, EngineError> {
        let params = serde_json::json!({
            "name": name,
            "cwd": cwd.to_string_lossy(),
            "command": command,
            "env": env,
        });
        let data = self.registry.call(&self.executor_id, "create_session", params).await?;
        Ok(window_from_rpc(data))
    }

    async fn create_rich_session(&self, name: &str, cwd: &Path, command: &str) -> Result<CreatedWindow, EngineError> {
        let params = serde_json::json!({"name": name, "cwd": cwd.to_string_lossy(), "command": command});
        let data = self.registry.call(&self.executor_id, "create_rich_session", params).await?;
        Ok(window_from_rpc(data))
    }

    async fn create_job(
        &self,
        name: &str,
        cwd: &Path,
        agent_command: &str,
        prompt: &str,
        max_iterations: u32,
        env: &[(String, String)],
    ) -> Result<CreatedWindow, EngineError> {
        let params = serde_json::json!({
            "name": name,
            "cwd": cwd.to_string_lossy(),
            "agent_command": agent_command,
            "prompt": prompt,
            "max_iterations": max_iterations,
            "env": env,
        });
        let data = self.registry.call(&self.executor_id, "create_job", params).await?;
        Ok(window_from_rpc(data))
    }

    async fn delete_session(&self, name: &str) -> Result<(), EngineError> {
        self.registry
            .call(&self.executor_id, "delete_session", serde_json::json!({"name": name}))
            .await?;
        Ok(())
    }

    async fn delete_rich_session(&self, name: &str) -> Result<(), EngineError> {
        self.registry
            .call(&self.executor_id, "delete_rich_session", serde_json::json!({"name": name}))
            .await?;
        Ok(())
    }

    async fn fork_session(&self, request: ForkRequest) -> Result<CreatedWindow, EngineError> {
        let params = serde_json::json!({
            "source_name": request.source_name,
            "new_name": request.new_name,
            "fork_hooks": request.fork_hooks,
        });
        let data = self.registry.call(&self.executor_id, "fork_session", params).await?;
        Ok(window_from_rpc(data))
    }

    async fn list_sessions(&self) -> Result<Vec<WindowLiveness>, EngineError> {
        let data = self
            .registry
            .call(&self.executor_id, "list_sessions", serde_json::json!({}))
            .await?;
        let rows = data.get("sessions").and_then(Value::as_array).cloned().unwrap_or_default();
        Ok(rows
            .into_iter()
            .map(|row| WindowLiveness {
                name: row.get("name").and_then(Value::as_str).unwrap_or_default().to_string(),
                alive: row.get("alive").and_then(Value::as_bool).unwrap_or(false),
                last_activity: row.get("last_activity").and_then(Value::as_i64).unwrap_or(0),
            })
            .collect())
    }

    async fn snapshot_session(&self, name: &str, lines: u32) -> Result<String, EngineError> {
        let data = self
            .registry
            .call(&self.executor_id, "snapshot_session", serde_json::json!({"name": name, "lines": lines}))
            .await?;
        Ok(data.get("text").and_then(Value::as_str).unwrap_or_default().to_string())
    }

    async fn snapshot_rich_session(&self, name: &str) -> Result<String, EngineError> {
        let data = self
            .registry
            .call(&self.executor_id, "snapshot_rich_session", serde_json::json!({"name": name}))
            .await?;
        Ok(data.get("text").and_then(Value::as_str).unwrap_or_default().to_string())
    }

    async fn summarize_session(&self, agent_command: &str, prompt: &str) -> Result<ProbeResult, EngineError> {
        let data = self
            .registry
            .call(
                &self.executor_id,
                "summarize_session",
                serde_json::json!({"agent_command": agent_command, "prompt": prompt}),
            )
            .await?;
        Ok(probe_from_rpc(data))
    }

    async fn analyze_session(&self, agent_command: &str, prompt: &str) -> Result<ProbeResult, EngineError> {
        let data = self
            .registry
            .call(
                &self.executor_id,
                "analyze_session",
                serde_json::json!({"agent_command": agent_command, "prompt": prompt}),
            )
            .await?;
        Ok(probe_from_rpc(data))
    }
}

fn probe_from_rpc(data: Value) -> ProbeResult {
    ProbeResult {
        summary: data.get("summary").and_then(Value::as_str).unwrap_or_default().to_string(),
        needs_attention: data.get("needs_attention").and_then(Value::as_bool).unwrap_or(false),
    }
}

#[cfg(test)]
#[path = "executor_interface_tests.rs"]
mod tests;
