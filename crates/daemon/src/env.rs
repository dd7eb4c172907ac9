// SPDX-License-Identifier: MIT

//! Centralized environment variable access for the daemon crate (spec §10.3).

use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_PORT: u16 = 4317;

/// Resolve the state directory: `CLAUDE_HOST_STATE_DIR` > `XDG_STATE_HOME/claude-host` >
/// `~/.local/state/claude-host`.
pub fn state_dir() -> Result<PathBuf, ConfigError> {
    if let Ok(dir) = std::env::var("CLAUDE_HOST_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("claude-host"));
    }
    let home = std::env::var("HOME").map_err(|_| ConfigError::NoStateDir)?;
    Ok(PathBuf::from(home).join(".local/state/claude-host"))
}

pub fn port(override_port: Option<u16>) -> u16 {
    override_port
        .or_else(|| std::env::var("CLAUDE_HOST_PORT").ok().and_then(|s| s.parse().ok()))
        .unwrap_or(DEFAULT_PORT)
}

pub fn admin_email() -> Option<String> {
    std::env::var("CLAUDE_HOST_ADMIN_EMAIL").ok().filter(|s| !s.is_empty())
}

fn duration_ms_override(var: &str) -> Option<Duration> {
    std::env::var(var).ok().and_then(|s| s.parse::<u64>().ok()).map(Duration::from_millis)
}

pub fn rpc_timeout() -> Duration {
    duration_ms_override("CLAUDE_HOST_RPC_TIMEOUT_MS").unwrap_or(chost_engine::registry::RPC_TIMEOUT)
}

pub fn heartbeat_timeout() -> Duration {
    duration_ms_override("CLAUDE_HOST_HEARTBEAT_TIMEOUT_MS").unwrap_or(chost_engine::registry::HEARTBEAT_TIMEOUT)
}

pub fn abandon_threshold_secs() -> i64 {
    std::env::var("CLAUDE_HOST_ABANDON_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(chost_engine::session_manager::ABANDON_THRESHOLD_SECS)
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not determine a state directory (set CLAUDE_HOST_STATE_DIR or HOME)")]
    NoStateDir,
}
