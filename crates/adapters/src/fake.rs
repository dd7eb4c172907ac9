// SPDX-License-Identifier: MIT

//! In-memory `TmuxRunner` double for tests that don't need a real shell
//! multiplexer. Gated behind `test-support` so other crates can depend on
//! it for their own tests without pulling it into release builds.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::agent_session::prepare_agent_launch;
use crate::error::AdapterError;
use crate::jobs::build_launcher_script;
use crate::runner::{CreatedWindow, ForkRequest, TmuxRunner, WindowLiveness};

struct FakeWindow {
    command: String,
    cwd: PathBuf,
    alive: bool,
    last_activity: i64,
    pane: String,
}

/// In-memory stand-in for a tmux server. Each call to `next_id` advances a
/// counter used both for `next_128`-shaped agent session ids and for pane
/// activity timestamps, so tests get deterministic, strictly increasing
/// values without touching the clock.
pub struct FakeTmuxRunner {
    windows: Mutex<HashMap<String, FakeWindow>>,
    clock: Mutex<i64>,
}

impl Default for FakeTmuxRunner {
    fn default() -> Self {
        FakeTmuxRunner {
            windows: Mutex::new(HashMap::new()),
            clock: Mutex::new(0),
        }
    }
}

impl FakeTmuxRunner {
    pub fn new() -> Self {
        Self::default()
    }

    fn tick(&self) -> i64 {
        let mut clock = self.clock.lock();
        *clock += 1;
        *clock
    }

    /// Test hook: set the captured pane text for a window.
    pub fn set_pane(&self, name: &str, text: &str) {
        if let Some(window) = self.windows.lock().get_mut(name) {
            window.pane = text.to_string();
        }
    }

    /// Test hook: mark a window dead without deleting it, simulating the
    /// underlying process having exited on its own.
    pub fn kill_silently(&self, name: &str) {
        if let Some(window) = self.windows.lock().get_mut(name) {
            window.alive = false;
        }
    }
}

#[async_trait]
impl TmuxRunner for FakeTmuxRunner {
    async fn create_window(
        &self,
        name: &str,
        cwd: &Path,
        command: &str,
        _env: &[(String, String)],
    ) -> Result<CreatedWindow, AdapterError> {
        let mut windows = self.windows.lock();
        if windows.contains_key(name) {
            return Err(AdapterError::AlreadyExists(name.to_string()));
        }
        let counter = self.tick();
        let (resolved, agent_session_id) =
            prepare_agent_launch(command, || format!("{counter:032x}"));
        windows.insert(
            name.to_string(),
            FakeWindow {
                command: resolved,
                cwd: cwd.to_path_buf(),
                alive: true,
                last_activity: counter,
                pane: String::new(),
            },
        );
        Ok(CreatedWindow {
            name: name.to_string(),
            agent_session_id,
        })
    }

    async fn create_job_window(
        &self,
        name: &str,
        cwd: &Path,
        agent_command: &str,
        prompt: &str,
        max_iterations: u32,
        env: &[(String, String)],
    ) -> Result<CreatedWindow, AdapterError> {
        let prompt_path = cwd.join(format!(".{name}-prompt.txt"));
        let script = build_launcher_script(&prompt_path, agent_command, max_iterations, "{command}");
        self.create_window(name, cwd, &script, env).await
    }

    async fn fork_window(&self, request: ForkRequest) -> Result<CreatedWindow, AdapterError> {
        let (source_command, cwd) = {
            let windows = self.windows.lock();
            let source = windows
                .get(&request.source_name)
                .ok_or_else(|| AdapterError::NotFound(request.source_name.clone()))?;
            (source.command.clone(), source.cwd.clone())
        };
        let token = crate::agent_session::base_token(&source_command);
        let command = request
            .fork_hooks
            .get(token)
            .cloned()
            .unwrap_or(source_command);
        self.create_window(&request.new_name, &cwd, &command, &[]).await
    }

    async fn delete_window(&self, name: &str) -> Result<(), AdapterError> {
        self.windows
            .lock()
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| AdapterError::NotFound(name.to_string()))
    }

    async fn list_windows(&self) -> Result<Vec<WindowLiveness>, AdapterError> {
        Ok(self
            .windows
            .lock()
            .iter()
            .map(|(name, window)| WindowLiveness {
                name: name.clone(),
                alive: window.alive,
                last_activity: window.last_activity,
            })
            .collect())
    }

    async fn capture_pane(&self, name: &str, lines: u32) -> Result<String, AdapterError> {
        let windows = self.windows.lock();
        let window = windows
            .get(name)
            .ok_or_else(|| AdapterError::NotFound(name.to_string()))?;
        let tail: Vec<&str> = window
            .pane
            .lines()
            .rev()
            .take(lines as usize)
            .collect();
        Ok(tail.into_iter().rev().collect::<Vec<_>>().join("\n"))
    }

    async fn pane_activity(&self, name: &str) -> Result<i64, AdapterError> {
        self.windows
            .lock()
            .get(name)
            .map(|w| w.last_activity)
            .ok_or_else(|| AdapterError::NotFound(name.to_string()))
    }

    async fn pane_cwd(&self, name: &str) -> Result<PathBuf, AdapterError> {
        self.windows
            .lock()
            .get(name)
            .map(|w| w.cwd.clone())
            .ok_or_else(|| AdapterError::NotFound(name.to_string()))
    }

    async fn pane_command(&self, name: &str) -> Result<String, AdapterError> {
        self.windows
            .lock()
            .get(name)
            .map(|w| w.command.clone())
            .ok_or_else(|| AdapterError::NotFound(name.to_string()))
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
