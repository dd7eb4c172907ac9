// SPDX-License-Identifier: MIT

//! `TmuxRunner` (C1): the sole module that invokes the shell-multiplexer
//! binary. Every other component drives windows only through this trait.

use crate::error::AdapterError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// New window opened at 200x50 (spec §4.1 "Initial geometry") so clients
/// have headroom before they resize on attach.
pub const INITIAL_COLS: u16 = 200;
pub const INITIAL_ROWS: u16 = 50;

/// Result of creating, forking, or spawning a job window.
#[derive(Debug, Clone, PartialEq)]
pub struct CreatedWindow {
    pub name: String,
    /// Present when the launched command's first token is an agent binary:
    /// a freshly generated 128-bit id injected into the window environment
    /// and appended to the command line as a session-id flag.
    pub agent_session_id: Option<String>,
}

/// One row of `list windows with liveness`.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowLiveness {
    pub name: String,
    pub alive: bool,
    pub last_activity: i64,
}

/// Request to fork a window, mirroring the fields the caller (SessionManager)
/// supplies per spec §4.5.1 attach/fork RPC params.
#[derive(Debug, Clone)]
pub struct ForkRequest {
    pub source_name: String,
    pub new_name: String,
    pub fork_hooks: HashMap<String, String>,
}

#[async_trait]
pub trait TmuxRunner: Send + Sync {
    /// Create a plain window. Fails with `AlreadyExists` if `name` is
    /// already a live window — never clobbers (spec §4.1 "Existence check").
    async fn create_window(
        &self,
        name: &str,
        cwd: &Path,
        command: &str,
        env: &[(String, String)],
    ) -> Result<CreatedWindow, AdapterError>;

    /// Create a job window: writes the prompt to a temp file and a looping
    /// launcher script (spec §4.1 "Jobs").
    async fn create_job_window(
        &self,
        name: &str,
        cwd: &Path,
        agent_command: &str,
        prompt: &str,
        max_iterations: u32,
        env: &[(String, String)],
    ) -> Result<CreatedWindow, AdapterError>;

    /// Fork `request.source_name` into `request.new_name`, resolving the
    /// new command via fork hooks (spec §4.1 "Forking").
    async fn fork_window(&self, request: ForkRequest) -> Result<CreatedWindow, AdapterError>;

    async fn delete_window(&self, name: &str) -> Result<(), AdapterError>;

    async fn list_windows(&self) -> Result<Vec<WindowLiveness>, AdapterError>;

    async fn capture_pane(&self, name: &str, lines: u32) -> Result<String, AdapterError>;

    async fn pane_activity(&self, name: &str) -> Result<i64, AdapterError>;

    async fn pane_cwd(&self, name: &str) -> Result<PathBuf, AdapterError>;

    /// Stored command line a window was created with (used by fork/resume
    /// logic and by the rich bridge to decide respawn flags).
    async fn pane_command(&self, name: &str) -> Result<String, AdapterError>;
}
