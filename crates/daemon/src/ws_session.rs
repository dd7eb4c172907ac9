// SPDX-License-Identifier: MIT

//! Browser-facing attach sockets: `/ws/sessions/{name}` (terminal) and
//! `/ws/rich/{name}` (rich), grounded on the relay server's
//! split-socket/outbound-task connection lifecycle (spec §4.2, §4.3).
//!
//! Each dispatches to one of two paths depending on the session's
//! `executor_id`: local sessions talk straight to the in-process
//! `TerminalBridge`/`RichBridgeHandle`; remote sessions splice this socket
//! to a byte-channel carried over the executor's control connection via
//! `AppState::terminal_relays` (see `state.rs`).

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Path, Query, State, WebSocketUpgrade};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use chost_core::{Mode, LOCAL_EXECUTOR_ID};
use chost_engine::ClientId;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct TerminalQuery {
    executor_id: Option<String>,
    #[serde(default = "default_cols")]
    cols: u16,
    #[serde(default = "default_rows")]
    rows: u16,
}

fn default_cols() -> u16 {
    80
}

fn default_rows() -> u16 {
    24
}

pub async fn terminal_attach(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(name): Path<String>,
    Query(q): Query<TerminalQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let principal = state.auth.authenticate(&headers).await?;
    let session = state.sessions.get_owned_session(&principal.user_id, &name).await?;
    let executor_id = q.executor_id.unwrap_or(session.executor_id.clone());

    Ok(ws.on_upgrade(move |socket| async move {
        if executor_id == LOCAL_EXECUTOR_ID {
            local_terminal_session(socket, state, name, q.cols, q.rows).await;
        } else {
            remote_byte_splice(socket, state, &executor_id, "attach_session", &name, q.cols, q.rows).await;
        }
    }))
}

#[derive(Deserialize)]
pub struct RichQuery {
    executor_id: Option<String>,
}

pub async fn rich_attach(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(name): Path<String>,
    Query(q): Query<RichQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let principal = state.auth.authenticate(&headers).await?;
    let session = state.sessions.get_owned_session(&principal.user_id, &name).await?;
    if session.mode != Mode::Rich {
        return Err(ApiError::from(chost_core::HostError::InvalidArgument(
            "not a rich session".into(),
        )));
    }
    let executor_id = q.executor_id.unwrap_or(session.executor_id.clone());

    Ok(ws.on_upgrade(move |socket| async move {
        if executor_id == LOCAL_EXECUTOR_ID {
            local_rich_session(socket, state, name, session.command).await;
        } else {
            remote_byte_splice(socket, state, &executor_id, "attach_rich_session", &name, 0, 0).await;
        }
    }))
}

/// Inbound control frame a terminal client may send instead of raw bytes.
#[derive(Deserialize)]
#[serde(rename_all = "snake_case")]
enum TerminalControl {
    Resize(u16, u16),
}

async fn local_terminal_session(socket: WebSocket, state: AppState, name: String, cols: u16, rows: u16) {
    let bridge = state.sessions.local_executor().terminal_bridge();
    let client_id = ClientId::next();
    let attach_command = format!("tmux attach -t {name}");
    let mut output = match bridge.attach(&name, client_id, cols, rows, &attach_command) {
        Ok(rx) => rx,
        Err(e) => {
            tracing::warn!(error = %e, session = %name, "local terminal attach failed");
            return;
        }
    };

    let (mut sink, mut stream) = socket.split();
    let outbound = tokio::spawn(async move {
        loop {
            match output.recv().await {
                Ok(bytes) => {
                    if sink.send(Message::Binary(bytes.into())).await.is_err() {
                        break;
                    }
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                    let _ = sink.send(Message::Close(None)).await;
                    break;
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
            }
        }
    });

    while let Some(Ok(msg)) = stream.next().await {
        match msg {
            Message::Text(text) => {
                if let Ok(TerminalControl::Resize(cols, rows)) = serde_json::from_str(&text) {
                    let _ = bridge.resize(&name, client_id, cols, rows);
                } else {
                    let _ = bridge.write_input(&name, text.as_bytes());
                }
            }
            Message::Binary(data) => {
                let _ = bridge.write_input(&name, &data);
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    outbound.abort();
    let _ = bridge.detach(&name, client_id);
}

async fn local_rich_session(socket: WebSocket, state: AppState, name: String, command: String) {
    let Some(handle) = state.sessions.local_executor().rich_bridge_or_restore(&name, &command) else {
        return;
    };

    let (mut sink, mut stream) = socket.split();
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
}

/// Remote splice: call the executor over RPC to ask it to attach, wait for
/// it to dial back on `/ws/executor/terminal/{channel_id}`, and shuttle
/// bytes in both directions once both halves are live.
async fn remote_byte_splice(
    socket: WebSocket,
    state: AppState,
    executor_id: &str,
    op: &str,
    name: &str,
    cols: u16,
    rows: u16,
) {
    let channel_id = uuid::Uuid::new_v4().to_string();
    let (to_browser_tx, mut to_browser_rx) = mpsc::unbounded_channel::<Vec<u8>>();
    state.terminal_relays.lock().insert(channel_id.clone(), to_browser_tx);

    let params = serde_json::json!({
        "name": name,
        "channel_id": channel_id,
        "cols": cols,
        "rows": rows,
    });
    let registry = state.registry.clone();
    let executor_id = executor_id.to_string();
    let op = op.to_string();
    tokio::spawn(async move {
        if let Err(e) = registry.call(&executor_id, &op, params).await {
            tracing::warn!(error = %e, "remote attach RPC failed");
        }
    });

    let (mut sink, mut stream) = socket.split();
    let to_executor = match state.registry.wait_for_terminal_channel(&channel_id).await {
        Ok(tx) => tx,
        Err(e) => {
            tracing::warn!(error = %e, channel_id = %channel_id, "executor never dialed back");
            state.terminal_relays.lock().remove(&channel_id);
            return;
        }
    };

    let outbound = tokio::spawn(async move {
        while let Some(bytes) = to_browser_rx.recv().await {
            if sink.send(Message::Binary(bytes.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(msg)) = stream.next().await {
        match msg {
            Message::Text(text) => {
                let _ = to_executor.send(text.into_bytes());
            }
            Message::Binary(data) => {
                let _ = to_executor.send(data.into());
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    outbound.abort();
    state.terminal_relays.lock().remove(&channel_id);
}
