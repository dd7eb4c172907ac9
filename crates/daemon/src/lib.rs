// SPDX-License-Identifier: MIT

//! The Frontdoor (C7): request authentication and URL routing for HTTP
//! endpoints and WebSocket upgrades (spec §4.7, §6).

pub mod auth;
pub mod env;
pub mod error;
pub mod executor_client;
pub mod http;
pub mod state;
pub mod ws_executor;
pub mod ws_session;

use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

pub use state::AppState;

/// Assemble the full route table, grounded on the relay server's
/// `Router::new().route(...).with_state(state)` composition.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(http::router())
        .route("/ws/sessions/{name}", get(ws_session::terminal_attach))
        .route("/ws/rich/{name}", get(ws_session::rich_attach))
        .route("/ws/executor/control", get(ws_executor::control))
        .route("/ws/executor/terminal/{channelId}", get(ws_executor::terminal_channel))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
