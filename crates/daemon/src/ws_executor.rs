// SPDX-License-Identifier: MIT

//! Executor-facing sockets: `/ws/executor/control` (register/heartbeat/RPC
//! responses) and `/ws/executor/terminal/{channelId}` (the byte-channel
//! dial-back for remote attach splices), grounded on the relay server's
//! split-socket connection lifecycle (spec §4.5, §6).
//!
//! Both require `x-executor-token`, an executor key minted by
//! `createExecutorKey`; validating it resolves the `owner_user_id` an
//! executor registers under, since the wire protocol's `register` frame
//! carries only `executorId`/`name`/`labels`, not an owner (spec §9 leaves
//! this unspecified — see DESIGN.md).

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Path, State, WebSocketUpgrade};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use chost_core::ExecutorKey;
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::sync::mpsc;

use crate::state::AppState;

fn bearer_executor_key_header(headers: &HeaderMap) -> Option<&str> {
    headers.get("x-executor-token").and_then(|v| v.to_str().ok())
}

async fn authenticate_executor(state: &AppState, headers: &HeaderMap) -> Option<ExecutorKey> {
    let token = bearer_executor_key_header(headers)?;
    state.sessions.validate_executor_key(token).await.ok().flatten()
}

pub async fn control(ws: WebSocketUpgrade, State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    let Some(key) = authenticate_executor(&state, &headers).await else {
        return (StatusCode::UNAUTHORIZED, "invalid or missing x-executor-token").into_response();
    };
    ws.on_upgrade(move |socket| control_session(socket, state, key.owner_user_id)).into_response()
}

async fn control_session(socket: WebSocket, state: AppState, owner_user_id: String) {
    let (mut sink, mut stream) = socket.split();
    let (control_tx, mut control_rx) = mpsc::unbounded_channel::<Value>();

    let outbound = tokio::spawn(async move {
        while let Some(frame) = control_rx.recv().await {
            let Ok(text) = serde_json::to_string(&frame) else { continue };
            if sink.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    let mut executor_id: Option<String> = None;

    while let Some(Ok(msg)) = stream.next().await {
        let Message::Text(text) = msg else {
            if matches!(msg, Message::Close(_)) {
                break;
            }
            continue;
        };
        let Ok(frame) = serde_json::from_str::<Value>(&text) else { continue };
        let Some(frame_type) = frame.get("type").and_then(Value::as_str) else { continue };

        match frame_type {
            "register" if executor_id.is_none() => {
                let id = frame.get("executorId").and_then(Value::as_str).unwrap_or_default().to_string();
                let name = frame.get("name").and_then(Value::as_str).unwrap_or_default().to_string();
                let labels = frame
                    .get("labels")
                    .and_then(Value::as_array)
                    .map(|a| a.iter().filter_map(Value::as_str).map(str::to_string).collect())
                    .unwrap_or_default();
                let version = frame.get("version").and_then(Value::as_str).map(str::to_string);
                state.registry.register(
                    id.clone(),
                    name,
                    labels,
                    version,
                    owner_user_id.clone(),
                    chost_core::time::now_secs(),
                    control_tx.clone(),
                );
                executor_id = Some(id);
            }
            "heartbeat" => {
                let Some(id) = executor_id.as_deref() else { continue };
                let sessions = frame
                    .get("sessions")
                    .and_then(Value::as_array)
                    .map(|rows| {
                        rows.iter()
                            .map(|row| chost_engine::registry::SessionLiveness {
                                name: row.get("name").and_then(Value::as_str).unwrap_or_default().to_string(),
                                alive: row.get("alive").and_then(Value::as_bool).unwrap_or(false),
                                last_activity: row.get("last_activity").and_then(Value::as_i64).unwrap_or(0),
                            })
                            .collect::<Vec<_>>()
                    })
                    .unwrap_or_default();
                state.registry.heartbeat(id, sessions.clone(), chost_core::time::now_secs());
                if let Err(e) = state.sessions.adopt_orphaned_sessions(id, &owner_user_id, &sessions).await {
                    tracing::warn!(error = %e, executor_id = id, "orphan adoption failed");
                }
            }
            "response" => {
                let Some(id) = frame.get("id").and_then(Value::as_str) else { continue };
                let ok = frame.get("ok").and_then(Value::as_bool).unwrap_or(false);
                let data = frame.get("data").cloned();
                let error = frame.get("error").and_then(Value::as_str).map(str::to_string);
                state.registry.handle_response(id, ok, data, error);
            }
            _ => {}
        }
    }

    outbound.abort();
    if let Some(id) = executor_id {
        state.registry.disconnect(&id, "disconnected");
    }
}

pub async fn terminal_channel(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(channel_id): Path<String>,
) -> impl IntoResponse {
    if authenticate_executor(&state, &headers).await.is_none() {
        return (StatusCode::UNAUTHORIZED, "invalid or missing x-executor-token").into_response();
    }
    ws.on_upgrade(move |socket| terminal_channel_session(socket, state, channel_id)).into_response()
}

/// Splice this socket to the waiting browser-side half: bytes the executor
/// sends go to `state.terminal_relays`'s sender for this channel; bytes
/// queued for the executor (the browser-input direction resolved by
/// `resolve_terminal_channel`) are drained back out over this socket.
async fn terminal_channel_session(socket: WebSocket, state: AppState, channel_id: String) {
    let (mut sink, mut stream) = socket.split();
    let (to_executor_tx, mut to_executor_rx) = mpsc::unbounded_channel::<Vec<u8>>();

    if state.registry.resolve_terminal_channel(&channel_id, to_executor_tx).is_err() {
        // No pending attach waiting for this channel id: refuse per spec
        // §4.5.3 (code 1008 would be ideal; axum's WebSocketUpgrade doesn't
        // expose the close-code path pre-upgrade, so a silent close is the
        // asking-forgiveness fallback).
        let _ = sink.close().await;
        return;
    }

    let Some(to_browser_tx) = state.terminal_relays.lock().get(&channel_id).cloned() else {
        let _ = sink.close().await;
        return;
    };

    let outbound = tokio::spawn(async move {
        while let Some(bytes) = to_executor_rx.recv().await {
            if sink.send(Message::Binary(bytes.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(msg)) = stream.next().await {
        match msg {
            Message::Text(text) => {
                let _ = to_browser_tx.send(text.into_bytes());
            }
            Message::Binary(data) => {
                let _ = to_browser_tx.send(data.into());
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    outbound.abort();
}
