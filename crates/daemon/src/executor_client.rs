// SPDX-License-Identifier: MIT

//! The `claude-host executor` side of the control protocol (spec §4.5,
//! §6): dials a control plane's `/ws/executor/control`, registers,
//! heartbeats, and serves RPCs against a local `LocalExecutor` backed by
//! the real tmux runner. Attach RPCs open a second socket to
//! `/ws/executor/terminal/{channelId}` and splice it to the in-process
//! terminal/rich bridges.

use chost_engine::{ClientId, ExecutorInterface, LocalExecutor, TerminalBridge};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::Message;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum ExecutorClientError {
    #[error("connect failed: {0}")]
    Connect(String),
    #[error("control socket closed")]
    Closed,
}

pub struct ExecutorConfig {
    pub url: String,
    pub token: String,
    pub id: String,
    pub name: String,
    pub labels: BTreeSet<String>,
}

/// Run the executor client until the control plane sends `upgrade` or the
/// socket closes. Callers (main.rs) loop this for restart-on-disconnect.
pub async fn run(config: ExecutorConfig, state_dir: &Path) -> Result<(), ExecutorClientError> {
    let local = Arc::new(LocalExecutor::new(
        Arc::new(chost_adapters::RealTmuxRunner::new()),
        Arc::new(TerminalBridge::new()),
        state_dir.join("rich"),
    ));

    let mut request = config
        .url
        .clone()
        .into_client_request()
        .map_err(|e| ExecutorClientError::Connect(e.to_string()))?;
    request
        .headers_mut()
        .insert("x-executor-token", config.token.parse().map_err(|_| ExecutorClientError::Connect("bad token".into()))?);

    let (ws, _resp) = tokio_tungstenite::connect_async(request)
        .await
        .map_err(|e| ExecutorClientError::Connect(e.to_string()))?;
    let (mut sink, mut stream) = ws.split();

    let register = serde_json::json!({
        "type": "register",
        "executorId": config.id,
        "name": config.name,
        "labels": config.labels,
        "version": env!("CARGO_PKG_VERSION"),
    });
    sink.send(Message::Text(register.to_string().into()))
        .await
        .map_err(|e| ExecutorClientError::Connect(e.to_string()))?;

    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Value>();
    let heartbeat_tx = out_tx.clone();
    let heartbeat_local = Arc::clone(&local);
    let heartbeat_task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(HEARTBEAT_INTERVAL);
        loop {
            interval.tick().await;
            let sessions = heartbeat_local.list_sessions().await.unwrap_or_default();
            let frame = serde_json::json!({
                "type": "heartbeat",
                "sessions": sessions.iter().map(|s| serde_json::json!({
                    "name": s.name,
                    "alive": s.alive,
                    "last_activity": s.last_activity,
                })).collect::<Vec<_>>(),
            });
            if heartbeat_tx.send(frame).is_err() {
                break;
            }
        }
    });

    let outbound_task = tokio::spawn(async move {
        while let Some(frame) = out_rx.recv().await {
            if sink.send(Message::Text(frame.to_string().into())).await.is_err() {
                break;
            }
        }
    });

    let mut upgrade_requested = false;
    while let Some(Ok(msg)) = stream.next().await {
        let Message::Text(text) = msg else {
            if matches!(msg, Message::Close(_)) {
                break;
            }
            continue;
        };
        let Ok(frame) = serde_json::from_str::<Value>(&text) else { continue };
        let Some(op) = frame.get("type").and_then(Value::as_str) else { continue };

        if op == "upgrade" {
            upgrade_requested = true;
            break;
        }
        if op == "ping" {
            if let Some(id) = frame.get("id").and_then(Value::as_str) {
                let _ = out_tx.send(serde_json::json!({"type": "response", "id": id, "ok": true}));
            }
            continue;
        }

        let Some(id) = frame.get("id").and_then(Value::as_str).map(str::to_string) else { continue };
        let local = Arc::clone(&local);
        let config_url = config.url.clone();
        let config_token = config.token.clone();
        let reply_tx = out_tx.clone();
        let op = op.to_string();
        tokio::spawn(async move {
            let result = dispatch(&local, &op, frame, &config_url, &config_token).await;
            let reply = match result {
                Ok(data) => serde_json::json!({"type": "response", "id": id, "ok": true, "data": data}),
                Err(e) => serde_json::json!({"type": "response", "id": id, "ok": false, "error": e.to_string()}),
            };
            let _ = reply_tx.send(reply);
        });
    }

    heartbeat_task.abort();
    outbound_task.abort();
    if upgrade_requested {
        tracing::info!("control plane requested upgrade, exiting");
    }
    Ok(())
}

async fn dispatch(
    local: &Arc<LocalExecutor>,
    op: &str,
    frame: Value,
    control_url: &str,
    token: &str,
) -> Result<Value, chost_engine::EngineError> {
    let s = |key: &str| frame.get(key).and_then(Value::as_str).unwrap_or_default().to_string();

    match op {
        "create_session" => {
            let created = local.create_session(&s("name"), Path::new(&s("cwd")), &s("command"), &[]).await?;
            Ok(window_json(&created))
        }
        "create_rich_session" => {
            let created = local.create_rich_session(&s("name"), Path::new(&s("cwd")), &s("command")).await?;
            Ok(window_json(&created))
        }
        "create_job" => {
            let max_iterations = frame.get("max_iterations").and_then(Value::as_u64).unwrap_or(1) as u32;
            let created = local
                .create_job(&s("name"), Path::new(&s("cwd")), &s("agent_command"), &s("prompt"), max_iterations, &[])
                .await?;
            Ok(window_json(&created))
        }
        "delete_session" => {
            local.delete_session(&s("name")).await?;
            Ok(Value::Null)
        }
        "delete_rich_session" => {
            local.delete_rich_session(&s("name")).await?;
            Ok(Value::Null)
        }
        "fork_session" => {
            let fork_hooks = frame
                .get("fork_hooks")
                .and_then(Value::as_object)
                .map(|m| m.iter().filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string()))).collect())
                .unwrap_or_default();
            let created = local
                .fork_session(chost_adapters::ForkRequest {
                    source_name: s("source_name"),
                    new_name: s("new_name"),
                    fork_hooks,
                })
                .await?;
            Ok(window_json(&created))
        }
        "list_sessions" => {
            let rows = local.list_sessions().await?;
            Ok(serde_json::json!({"sessions": rows.iter().map(|r| serde_json::json!({
                "name": r.name, "alive": r.alive, "last_activity": r.last_activity,
            })).collect::<Vec<_>>()}))
        }
        "snapshot_session" => {
            let lines = frame.get("lines").and_then(Value::as_u64).unwrap_or(200) as u32;
            let text = local.snapshot_session(&s("name"), lines).await?;
            Ok(serde_json::json!({"text": text}))
        }
        "snapshot_rich_session" => {
            let text = local.snapshot_rich_session(&s("name")).await?;
            Ok(serde_json::json!({"text": text}))
        }
        "summarize_session" => {
            let result = local.summarize_session(&s("agent_command"), &s("prompt")).await?;
            Ok(serde_json::json!({"summary": result.summary, "needs_attention": result.needs_attention}))
        }
        "analyze_session" => {
            let result = local.analyze_session(&s("agent_command"), &s("prompt")).await?;
            Ok(serde_json::json!({"summary": result.summary, "needs_attention": result.needs_attention}))
        }
        "attach_session" => {
            let name = s("name");
            let channel_id = s("channel_id");
            let cols = frame.get("cols").and_then(Value::as_u64).unwrap_or(80) as u16;
            let rows = frame.get("rows").and_then(Value::as_u64).unwrap_or(24) as u16;
            spawn_terminal_splice(Arc::clone(local), control_url.to_string(), token.to_string(), channel_id, name, cols, rows);
            Ok(Value::Null)
        }
        "attach_rich_session" => {
            let name = s("name");
            let channel_id = s("channel_id");
            spawn_rich_splice(Arc::clone(local), control_url.to_string(), token.to_string(), channel_id, name);
            Ok(Value::Null)
        }
        _ => Err(chost_engine::EngineError::Host(chost_core::HostError::InvalidArgument(format!(
            "unknown op {op}"
        )))),
    }
}

fn window_json(created: &chost_adapters::CreatedWindow) -> Value {
    serde_json::json!({"name": created.name, "agent_session_id": created.agent_session_id})
}

fn terminal_channel_url(control_url: &str, channel_id: &str) -> String {
    control_url.replacen("/ws/executor/control", &format!("/ws/executor/terminal/{channel_id}"), 1)
}

fn spawn_terminal_splice(local: Arc<LocalExecutor>, control_url: String, token: String, channel_id: String, name: String, cols: u16, rows: u16) {
    tokio::spawn(async move {
        let url = terminal_channel_url(&control_url, &channel_id);
        let Ok(mut request) = url.into_client_request() else { return };
        let Ok(header_value) = token.parse() else { return };
        request.headers_mut().insert("x-executor-token", header_value);
        let Ok((ws, _)) = tokio_tungstenite::connect_async(request).await else { return };
        let (mut sink, mut stream) = ws.split();

        let bridge = local.terminal_bridge();
        let client_id = ClientId::next();
        let attach_command = format!("tmux attach -t {name}");
        let Ok(mut output) = bridge.attach(&name, client_id, cols, rows, &attach_command) else { return };

        let outbound = tokio::spawn(async move {
            loop {
                match output.recv().await {
                    Ok(bytes) => {
                        if sink.send(Message::Binary(bytes.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                }
            }
        });

        while let Some(Ok(msg)) = stream.next().await {
            match msg {
                Message::Binary(data) => {
                    let _ = bridge.write_input(&name, &data);
                }
                Message::Text(text) => {
                    let _ = bridge.write_input(&name, text.as_bytes());
                }
                Message::Close(_) => break,
                _ => {}
            }
        }

        outbound.abort();
        let _ = bridge.detach(&name, client_id);
    });
}

fn spawn_rich_splice(local: Arc<LocalExecutor>, control_url: String, token: String, channel_id: String, name: String) {
    tokio::spawn(async move {
        let Some(handle) = local.rich_bridge(&name) else { return };
        let url = terminal_channel_url(&control_url, &channel_id);
        let Ok(mut request) = url.into_client_request() else { return };
        let Ok(header_value) = token.parse() else { return };
        request.headers_mut().insert("x-executor-token", header_value);
        let Ok((ws, _)) = tokio_tungstenite::connect_async(request).await else { return };
        let (mut sink, mut stream) = ws.split();

        let (client_tx, mut client_rx) = mpsc::unbounded_channel::<chost_engine::BridgeToClient>();
        handle.attach(client_tx);

        let outbound = tokio::spawn(async move {
            while let Some(msg) = client_rx.recv().await {
                let Ok(text) = serde_json::to_string(&msg) else { continue };
                if sink.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
        });

        while let Some(Ok(msg)) = stream.next().await {
            match msg {
                Message::Text(text) => {
                    if let Ok(client_msg) = serde_json::from_str::<chost_engine::ClientToBridge>(&text) {
                        handle.send(client_msg);
                    }
                }
                Message::Close(_) => break,
                _ => {}
            }
        }

        outbound.abort();
    });
}
