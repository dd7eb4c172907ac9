// SPDX-License-Identifier: MIT

//! Fork-hook resolution (spec §4.1 "Forking").
//!
//! Forking a window means deriving the new window's launch command from the
//! source window's command. A configured hook (a small executable) decides
//! the new command; if no hook file exists for the source's base token but
//! the token is still listed in the fork-hooks map, a built-in rule applies:
//! wait for the agent to write a new on-disk session file under its project
//! directory and resume from it.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;
use tokio::time::{sleep, timeout};

use crate::agent_session::base_token;
use crate::error::AdapterError;

/// Time budget for an external fork-hook process (spec §5 constant).
pub const FORK_HOOK_TIMEOUT: Duration = Duration::from_secs(5);

/// How long to wait for the agent to write its new session file before
/// giving up and forking as a plain shell window instead.
const SESSION_FILE_POLL_TIMEOUT: Duration = Duration::from_secs(5);
const SESSION_FILE_POLL_INTERVAL: Duration = Duration::from_millis(100);

pub struct ForkContext<'a> {
    pub source_command: &'a str,
    pub source_cwd: &'a Path,
    pub source_name: &'a str,
    pub fork_hooks: &'a HashMap<String, String>,
    /// Directory the agent writes session transcripts under, keyed by the
    /// base token (e.g. `claude`'s `~/.claude/projects/<cwd-slug>/`).
    pub agent_project_dir: Option<&'a Path>,
}

/// Resolve the command line the forked window should launch.
pub async fn resolve_forked_command(ctx: ForkContext<'_>) -> Result<String, AdapterError> {
    let token = base_token(ctx.source_command);

    if let Some(hook_path) = ctx.fork_hooks.get(token) {
        if tokio::fs::try_exists(hook_path).await.unwrap_or(false) {
            return run_hook(hook_path, &ctx).await;
        }
    }

    if ctx.agent_project_dir.is_some() {
        if let Some(resumed) = wait_for_new_session_file(&ctx).await? {
            return Ok(resumed);
        }
    }

    Ok(ctx.source_command.to_string())
}

async fn run_hook(hook_path: &str, ctx: &ForkContext<'_>) -> Result<String, AdapterError> {
    let mut cmd = Command::new(hook_path);
    cmd.env("SOURCE_SESSION", ctx.source_name)
        .env("SOURCE_CWD", ctx.source_cwd)
        .env("SOURCE_COMMAND", ctx.source_command)
        .kill_on_drop(true);

    let output = timeout(FORK_HOOK_TIMEOUT, cmd.output())
        .await
        .map_err(|_| AdapterError::CommandFailed(format!("fork hook {hook_path} timed out")))?
        .map_err(|e| AdapterError::CommandFailed(format!("fork hook {hook_path}: {e}")))?;

    if !output.status.success() {
        return Err(AdapterError::CommandFailed(format!(
            "fork hook {hook_path} exited with {:?}",
            output.status.code()
        )));
    }

    let command = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if command.is_empty() {
        return Err(AdapterError::CommandFailed(format!(
            "fork hook {hook_path} produced no command"
        )));
    }
    Ok(command)
}

/// Poll the agent's project directory for a session file newer than `since`,
/// returning a resume command for it. Built-in fallback when a base token
/// is registered in the fork-hooks map with no corresponding hook file.
async fn wait_for_new_session_file(ctx: &ForkContext<'_>) -> Result<Option<String>, AdapterError> {
    let dir = match ctx.agent_project_dir {
        Some(d) => d,
        None => return Ok(None),
    };
    let baseline = newest_session_file(dir).await?;
    let deadline = tokio::time::Instant::now() + SESSION_FILE_POLL_TIMEOUT;

    loop {
        if tokio::time::Instant::now() >= deadline {
            return Ok(None);
        }
        if let Some(found) = newest_session_file(dir).await? {
            if baseline.as_deref() != Some(found.as_path()) {
                let session_id = found
                    .file_stem()
                    .map(|s| s.to_string_lossy().to_string())
                    .unwrap_or_default();
                let token = base_token(ctx.source_command);
                return Ok(Some(format!("{token} --resume {session_id}")));
            }
        }
        sleep(SESSION_FILE_POLL_INTERVAL).await;
    }
}

async fn newest_session_file(dir: &Path) -> Result<Option<PathBuf>, AdapterError> {
    let mut read = match tokio::fs::read_dir(dir).await {
        Ok(r) => r,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let mut newest: Option<(PathBuf, std::time::SystemTime)> = None;
    while let Some(entry) = read.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("jsonl") {
            continue;
        }
        let modified = entry.metadata().await?.modified()?;
        if newest.as_ref().map(|(_, t)| modified > *t).unwrap_or(true) {
            newest = Some((path, modified));
        }
    }
    Ok(newest.map(|(p, _)| p))
}

#[cfg(test)]
#[path = "fork_tests.rs"]
mod tests;
