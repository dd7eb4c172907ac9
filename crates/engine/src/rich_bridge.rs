// SPDX-License-Identifier: MIT

//! `RichBridge` (C3): owns the agent subprocess for a rich-mode session and
//! bridges it to a single connected client, with durable replay for
//! reconnects and control-plane restarts (spec §4.3).
//!
//! The bridge runs as a single cooperative task per session (an actor
//! driven by an internal message queue) so that state transitions never
//! race: attach, client messages, and agent stdout lines are all handled
//! one at a time by the same task.

use chost_core::{AgentEvent, RichSessionState};
use chost_storage::RichEventLog;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tokio::sync::{mpsc, oneshot};

use crate::error::EngineError;

/// Flag appended to the agent command on respawn once a session id has
/// been captured, so the agent resumes its prior conversation.
pub const RESUME_FLAG: &str = "--resume";

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientToBridge {
    Prompt { text: String },
    Interrupt,
    Restart,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BridgeToClient {
    Event { event: Value },
    TurnComplete,
    Error { message: String },
    SessionState {
        streaming: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        process_alive: Option<bool>,
    },
}

enum Internal {
    Attach(mpsc::UnboundedSender<BridgeToClient>),
    Client(ClientToBridge),
    AgentLine(String),
    AgentExited(Option<i32>),
    Shutdown(oneshot::Sender<()>),
}

/// Handle to a running bridge actor. Cloning is cheap; every clone talks to
/// the same session task.
#[derive(Clone)]
pub struct RichBridgeHandle {
    tx: mpsc::UnboundedSender<Internal>,
}

impl RichBridgeHandle {
    /// Spawn the actor task for one session. `agent_binary` is the launcher
    /// command without respawn flags; those are added per spawn from
    /// `initial_state.agent_session_id` once known.
    pub fn spawn(agent_binary: String, log: Arc<RichEventLog>, initial_state: RichSessionState) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let actor = RichBridgeActor {
            agent_binary,
            log,
            state: initial_state,
            client: None,
            agent_pid: None,
            stdin: None,
            self_tx: tx.clone(),
        };
        tokio::spawn(actor.run(rx));
        RichBridgeHandle { tx }
    }

    /// Install a fresh client; any previous client is implicitly dropped
    /// (spec §4.3.5 "duplicate client connect").
    pub fn attach(&self, client_tx: mpsc::UnboundedSender<BridgeToClient>) {
        let _ = self.tx.send(Internal::Attach(client_tx));
    }

    pub fn send(&self, msg: ClientToBridge) {
        let _ = self.tx.send(Internal::Client(msg));
    }

    /// Flush and stop the subprocess, used on session delete and
    /// control-plane shutdown.
    pub async fn shutdown(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        let _ = self.tx.send(Internal::Shutdown(done_tx));
        let _ = done_rx.await;
    }
}

struct RichBridgeActor {
    agent_binary: String,
    log: Arc<RichEventLog>,
    state: RichSessionState,
    client: Option<mpsc::UnboundedSender<BridgeToClient>>,
    agent_pid: Option<u32>,
    stdin: Option<tokio::process::ChildStdin>,
    self_tx: mpsc::UnboundedSender<Internal>,
}

impl RichBridgeActor {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Internal>) {
        while let Some(msg) = rx.recv().await {
            match msg {
                Internal::Attach(client_tx) => self.on_attach(client_tx),
                Internal::Client(m) => self.on_client_message(m).await,
                Internal::AgentLine(line) => self.on_agent_line(line),
                Internal::AgentExited(code) => self.on_agent_exited(code),
                Internal::Shutdown(done) => {
                    self.on_shutdown();
                    let _ = done.send(());
                    break;
                }
            }
        }
    }

    fn emit(&self, msg: BridgeToClient) {
        if let Some(tx) = &self.client {
            let _ = tx.send(msg);
        }
    }

    fn on_attach(&mut self, client_tx: mpsc::UnboundedSender<BridgeToClient>) {
        self.client = Some(client_tx);
        for event in self.log.events() {
            self.emit(BridgeToClient::Event { event });
        }
        self.emit(BridgeToClient::SessionState {
            streaming: self.state.turning,
            process_alive: Some(self.agent_pid.is_some()),
        });
    }

    async fn on_client_message(&mut self, msg: ClientToBridge) {
        match msg {
            ClientToBridge::Prompt { text } => self.on_prompt(text).await,
            ClientToBridge::Interrupt => self.on_interrupt().await,
            ClientToBridge::Restart => self.on_restart().await,
        }
    }

    async fn on_prompt(&mut self, text: String) {
        if self.state.turning {
            self.emit(BridgeToClient::Error {
                message: "a turn is already in progress".into(),
            });
            return;
        }

        if self.agent_pid.is_none() {
            if let Err(e) = self.spawn_agent().await {
                self.emit(BridgeToClient::Error { message: e.to_string() });
                return;
            }
        }

        let line = serde_json::json!({"type": "prompt", "text": text}).to_string();
        let Some(stdin) = self.stdin.as_mut() else {
            self.emit(BridgeToClient::Error {
                message: "agent process has no stdin".into(),
            });
            return;
        };
        if let Err(e) = stdin.write_all(format!("{line}\n").as_bytes()).await {
            self.state.turning = false;
            self.emit(BridgeToClient::Error {
                message: format!("stdin write failed: {e}"),
            });
            return;
        }
        self.state.turning = true;
    }

    /// Forward SIGINT to the agent process without taking ownership of the
    /// `Child` away from its exit-watcher task.
    async fn on_interrupt(&mut self) {
        if let Some(pid) = self.agent_pid {
            let _ = Command::new("kill")
                .args(["-INT", &pid.to_string()])
                .output()
                .await;
        }
    }

    async fn on_restart(&mut self) {
        if let Some(pid) = self.agent_pid.take() {
            let _ = Command::new("kill").args(["-KILL", &pid.to_string()]).output().await;
        }
        self.stdin = None;
        self.state.turning = false;
        self.state.reset_for_new_spawn();
    }

    async fn spawn_agent(&mut self) -> Result<(), EngineError> {
        let mut command_line = self.agent_binary.clone();
        if let Some(ref sid) = self.state.agent_session_id {
            command_line = format!("{command_line} {RESUME_FLAG} {sid}");
        }
        let mut parts = command_line.split_whitespace();
        let program = parts
            .next()
            .ok_or_else(|| EngineError::Host(chost_core::HostError::SpawnFailure("empty agent command".into())))?
            .to_string();
        let args: Vec<String> = parts.map(str::to_string).collect();

        let mut child = Command::new(&program)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| EngineError::Host(chost_core::HostError::SpawnFailure(e.to_string())))?;

        self.agent_pid = child.id();
        self.stdin = child.stdin.take();
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| EngineError::Host(chost_core::HostError::SpawnFailure("no stdout pipe".into())))?;
        self.state.reset_for_new_spawn();

        let line_tx = self.self_tx.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        if line_tx.send(Internal::AgentLine(line)).is_err() {
                            break;
                        }
                    }
                    _ => break,
                }
            }
        });

        let exit_tx = self.self_tx.clone();
        tokio::spawn(async move {
            let status = child.wait().await;
            let code = status.ok().and_then(|s| s.code());
            let _ = exit_tx.send(Internal::AgentExited(code));
        });

        Ok(())
    }

    fn on_agent_line(&mut self, line: String) {
        let event = AgentEvent::from_line(&line);

        if event.is_sub_agent_event() {
            self.emit(BridgeToClient::Event { event: event.0 });
            return;
        }

        if self.state.should_suppress_init(&event) {
            return;
        }
        self.state.note_init_seen(&event);

        if event.is_stream_event() {
            self.emit(BridgeToClient::Event { event: event.0 });
            return;
        }

        let is_result = event.is_result();
        self.state.persist_event(event.clone());
        self.log.append(event.0.clone());
        if is_result {
            let _ = self.log.flush_now();
        } else {
            // debounced background flush task (spawned by the owner) will
            // pick this up within FLUSH_DEBOUNCE
        }

        self.emit(BridgeToClient::Event { event: event.0 });

        if is_result {
            self.state.turning = false;
            self.emit(BridgeToClient::TurnComplete);
        }
    }

    fn on_agent_exited(&mut self, code: Option<i32>) {
        let was_turning = self.state.turning;
        self.agent_pid = None;
        self.stdin = None;
        self.state.turning = false;

        match code {
            Some(0) if !was_turning => {}
            Some(0) => {
                self.emit(BridgeToClient::Error {
                    message: "Agent process exited unexpectedly".into(),
                });
                self.emit(BridgeToClient::TurnComplete);
            }
            Some(n) => {
                self.emit(BridgeToClient::Error {
                    message: format!("Process exited (code {n})"),
                });
                if was_turning {
                    self.emit(BridgeToClient::TurnComplete);
                }
            }
            None => {
                self.emit(BridgeToClient::Error {
                    message: "Agent process exited unexpectedly".into(),
                });
                if was_turning {
                    self.emit(BridgeToClient::TurnComplete);
                }
            }
        }
    }

    fn on_shutdown(&mut self) {
        if let Some(pid) = self.agent_pid.take() {
            let pid = pid.to_string();
            tokio::spawn(async move {
                let _ = Command::new("kill").args(["-TERM", &pid]).output().await;
            });
        }
        let _ = self.log.flush_now();
    }
}

#[cfg(test)]
#[path = "rich_bridge_tests.rs"]
mod tests;
