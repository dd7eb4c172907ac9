// SPDX-License-Identifier: MIT

//! REST endpoints for session, config, executor, and executor-key
//! management (spec §4.1, §4.6, §6), grounded on the relay server's
//! `api.rs` handler style.

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use chost_core::{Mode, Session, LOCAL_EXECUTOR_ID};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::ApiError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/sessions", get(list_sessions).post(create_session))
        .route("/api/sessions/fork", post(fork_session))
        .route("/api/sessions/job", post(create_job))
        .route("/api/sessions/{name}", delete(delete_session))
        .route("/api/sessions/{name}/snapshot", get(snapshot_session))
        .route("/api/sessions/{name}/summarize", post(summarize_session))
        .route("/api/sessions/{name}/analyze", post(analyze_session))
        .route("/api/config/{key}", get(get_config).put(put_config))
        .route("/api/executors", get(list_executors))
        .route("/api/executors/upgrade", post(upgrade_executor))
        .route("/api/executor-keys", get(list_executor_keys).post(create_executor_key))
        .route("/api/executor-keys/{id}", delete(revoke_executor_key))
}

#[derive(Serialize)]
struct Health {
    status: &'static str,
    uptime_secs: i64,
}

async fn healthz(State(state): State<AppState>) -> Json<Health> {
    let now = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs() as i64).unwrap_or(0);
    Json(Health {
        status: "ok",
        uptime_secs: now - state.started_at,
    })
}

#[derive(Deserialize)]
struct CreateSessionBody {
    description: String,
    command: String,
    #[serde(default)]
    mode: Mode,
    executor_id: Option<String>,
}

async fn create_session(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CreateSessionBody>,
) -> Result<Json<Session>, ApiError> {
    let principal = state.auth.authenticate(&headers).await?;
    let session = state
        .sessions
        .create(&principal.user_id, &body.description, &body.command, body.mode, body.executor_id.as_deref())
        .await?;
    Ok(Json(session))
}

async fn list_sessions(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<Vec<Session>>, ApiError> {
    let principal = state.auth.authenticate(&headers).await?;
    Ok(Json(state.sessions.list(&principal.user_id).await?))
}

#[derive(Deserialize)]
struct ExecutorIdQuery {
    executor_id: Option<String>,
}

async fn delete_session(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(name): Path<String>,
    Query(q): Query<ExecutorIdQuery>,
) -> Result<(), ApiError> {
    let principal = state.auth.authenticate(&headers).await?;
    let executor_id = q.executor_id.as_deref().unwrap_or(LOCAL_EXECUTOR_ID);
    state.sessions.delete(&principal.user_id, &name, executor_id).await?;
    Ok(())
}

#[derive(Deserialize)]
struct ForkBody {
    source_name: String,
    executor_id: Option<String>,
}

async fn fork_session(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<ForkBody>,
) -> Result<Json<Session>, ApiError> {
    let principal = state.auth.authenticate(&headers).await?;
    let session = state
        .sessions
        .fork(&principal.user_id, &body.source_name, body.executor_id.as_deref())
        .await?;
    Ok(Json(session))
}

#[derive(Deserialize)]
struct JobBody {
    prompt: String,
    max_iterations: u32,
    agent_command: String,
    executor_id: Option<String>,
}

async fn create_job(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<JobBody>,
) -> Result<Json<Session>, ApiError> {
    let principal = state.auth.authenticate(&headers).await?;
    let session = state
        .sessions
        .create_job(&principal.user_id, &body.prompt, body.max_iterations, body.executor_id.as_deref(), &body.agent_command)
        .await?;
    Ok(Json(session))
}

#[derive(Serialize)]
struct SnapshotBody {
    text: String,
}

async fn snapshot_session(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(name): Path<String>,
    Query(q): Query<ExecutorIdQuery>,
) -> Result<Json<SnapshotBody>, ApiError> {
    let principal = state.auth.authenticate(&headers).await?;
    let executor_id = q.executor_id.as_deref().unwrap_or(LOCAL_EXECUTOR_ID);
    let text = state.sessions.snapshot(&principal.user_id, &name, executor_id).await?;
    Ok(Json(SnapshotBody { text }))
}

#[derive(Deserialize)]
struct ProbeBody {
    prompt: String,
    executor_id: Option<String>,
}

#[derive(Serialize)]
struct ProbeBodyOut {
    summary: String,
    needs_attention: bool,
}

async fn summarize_session(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(name): Path<String>,
    Json(body): Json<ProbeBody>,
) -> Result<Json<ProbeBodyOut>, ApiError> {
    let principal = state.auth.authenticate(&headers).await?;
    let executor_id = body.executor_id.as_deref().unwrap_or(LOCAL_EXECUTOR_ID);
    let result = state.sessions.summarize(&principal.user_id, &name, executor_id, &body.prompt).await?;
    Ok(Json(ProbeBodyOut {
        summary: result.summary,
        needs_attention: result.needs_attention,
    }))
}

async fn analyze_session(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(name): Path<String>,
    Json(body): Json<ProbeBody>,
) -> Result<Json<ProbeBodyOut>, ApiError> {
    let principal = state.auth.authenticate(&headers).await?;
    let executor_id = body.executor_id.as_deref().unwrap_or(LOCAL_EXECUTOR_ID);
    let result = state.sessions.analyze(&principal.user_id, &name, executor_id, &body.prompt).await?;
    Ok(Json(ProbeBodyOut {
        summary: result.summary,
        needs_attention: result.needs_attention,
    }))
}

async fn get_config(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(key): Path<String>,
) -> Result<Json<Option<serde_json::Value>>, ApiError> {
    let principal = state.auth.authenticate(&headers).await?;
    Ok(Json(state.sessions.get_config(&principal.user_id, &key).await?))
}

#[derive(Deserialize)]
struct ConfigValueBody {
    value: serde_json::Value,
}

async fn put_config(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(key): Path<String>,
    Json(body): Json<ConfigValueBody>,
) -> Result<(), ApiError> {
    let principal = state.auth.authenticate(&headers).await?;
    state
        .sessions
        .put_config(&principal.user_id, &key, body.value)
        .await?;
    Ok(())
}

async fn list_executors(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<chost_core::ExecutorRecord>>, ApiError> {
    let _principal = state.auth.authenticate(&headers).await?;
    Ok(Json(state.sessions.list_executors().await?))
}

#[derive(Deserialize)]
struct UpgradeBody {
    executor_id: String,
    #[serde(default)]
    reason: Option<String>,
}

async fn upgrade_executor(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<UpgradeBody>,
) -> Result<(), ApiError> {
    let principal = state.auth.authenticate(&headers).await?;
    if state.registry.info(&body.executor_id).is_none() {
        return Err(ApiError::from(chost_core::HostError::NotFound(body.executor_id.clone())));
    }
    if !state.registry.is_owned_by(&body.executor_id, &principal.user_id) {
        return Err(ApiError::from(chost_core::HostError::NotFound(body.executor_id.clone())));
    }
    state
        .registry
        .upgrade(&body.executor_id, body.reason.as_deref().unwrap_or("upgrade requested"))?;
    Ok(())
}

#[derive(Deserialize)]
struct CreateKeyBody {
    name: String,
    expires_at: Option<i64>,
}

#[derive(Serialize)]
struct CreatedKeyBody {
    id: String,
    name: String,
    key_prefix: String,
    token: String,
}

async fn create_executor_key(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CreateKeyBody>,
) -> Result<Json<CreatedKeyBody>, ApiError> {
    let principal = state.auth.authenticate(&headers).await?;
    let (key, token) = state.sessions.create_executor_key(&principal.user_id, &body.name, body.expires_at).await?;
    Ok(Json(CreatedKeyBody {
        id: key.id,
        name: key.name,
        key_prefix: key.key_prefix,
        token,
    }))
}

/// Display listing: never serializes `key_hash`.
#[derive(Serialize)]
struct KeyListItem {
    id: String,
    name: String,
    key_prefix: String,
    created_at: i64,
    expires_at: Option<i64>,
    last_used: Option<i64>,
    revoked: bool,
}

async fn list_executor_keys(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<Vec<KeyListItem>>, ApiError> {
    let principal = state.auth.authenticate(&headers).await?;
    let keys = state.sessions.list_executor_keys(&principal.user_id).await?;
    Ok(Json(
        keys.into_iter()
            .map(|k| KeyListItem {
                id: k.id,
                name: k.name,
                key_prefix: k.key_prefix,
                created_at: k.created_at,
                expires_at: k.expires_at,
                last_used: k.last_used,
                revoked: k.revoked,
            })
            .collect(),
    ))
}

async fn revoke_executor_key(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<(), ApiError> {
    let principal = state.auth.authenticate(&headers).await?;
    state.sessions.revoke_executor_key(&principal.user_id, &id).await?;
    Ok(())
}
