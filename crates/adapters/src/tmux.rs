// SPDX-License-Identifier: MIT

//! Real `TmuxRunner` backed by the `tmux` binary. Each window is a detached
//! tmux session named after it directly — callers already hand us
//! collision-checked, validated names (spec §4.1 "Naming").

use async_trait::async_trait;
use chost_core::IdGen;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::process::Command;

use crate::agent_session::prepare_agent_launch;
use crate::error::AdapterError;
use crate::jobs::build_launcher_script;
use crate::runner::{CreatedWindow, ForkRequest, TmuxRunner, WindowLiveness, INITIAL_COLS, INITIAL_ROWS};

#[derive(Clone, Default)]
pub struct RealTmuxRunner;

impl RealTmuxRunner {
    pub fn new() -> Self {
        Self
    }

    async fn has_session(&self, name: &str) -> bool {
        Command::new("tmux")
            .args(["has-session", "-t", name])
            .output()
            .await
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    async fn spawn_session(
        &self,
        name: &str,
        cwd: &Path,
        command: &str,
        env: &[(String, String)],
    ) -> Result<(), AdapterError> {
        if self.has_session(name).await {
            return Err(AdapterError::AlreadyExists(name.to_string()));
        }

        let mut cmd = Command::new("tmux");
        cmd.args(["new-session", "-d", "-s", name, "-x"])
            .arg(INITIAL_COLS.to_string())
            .arg("-y")
            .arg(INITIAL_ROWS.to_string())
            .arg("-c")
            .arg(cwd);
        for (key, value) in env {
            cmd.arg("-e").arg(format!("{key}={value}"));
        }
        cmd.arg(command);

        let output = cmd
            .output()
            .await
            .map_err(|e| AdapterError::SpawnFailed(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::error!(name, stderr = %stderr, "tmux spawn failed");
            return Err(AdapterError::SpawnFailed(stderr.to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl TmuxRunner for RealTmuxRunner {
    async fn create_window(
        &self,
        name: &str,
        cwd: &Path,
        command: &str,
        env: &[(String, String)],
    ) -> Result<CreatedWindow, AdapterError> {
        let ids = chost_core::UuidIdGen;
        let (resolved, agent_session_id) = prepare_agent_launch(command, || ids.next_128());
        self.spawn_session(name, cwd, &resolved, env).await?;
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
        fs::write(&prompt_path, prompt).await?;

        let ids = chost_core::UuidIdGen;
        let (launch_command, agent_session_id) = prepare_agent_launch(agent_command, || ids.next_128());

        // The resume line must carry `--resume <id>`, not another
        // `--session-id` — build it from the original command, so there's
        // no `{command}` placeholder left for `build_launcher_script` to
        // substitute and stack the two flags together.
        let resume_command = match &agent_session_id {
            Some(session_id) => format!("{agent_command} --resume {session_id}"),
            None => agent_command.to_string(),
        };

        let script = build_launcher_script(&prompt_path, &launch_command, max_iterations, &resume_command);
        let script_path = cwd.join(format!(".{name}-launch.sh"));
        fs::write(&script_path, &script).await?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = fs::metadata(&script_path).await?.permissions();
            perms.set_mode(0o755);
            fs::set_permissions(&script_path, perms).await?;
        }

        let launch = format!("sh {}", script_path.display());
        self.spawn_session(name, cwd, &launch, env).await?;
        Ok(CreatedWindow {
            name: name.to_string(),
            agent_session_id,
        })
    }

    async fn fork_window(&self, request: ForkRequest) -> Result<CreatedWindow, AdapterError> {
        let source_command = self.pane_command(&request.source_name).await?;
        let source_cwd = self.pane_cwd(&request.source_name).await?;

        let resolved = crate::fork::resolve_forked_command(crate::fork::ForkContext {
            source_command: &source_command,
            source_cwd: &source_cwd,
            source_name: &request.source_name,
            fork_hooks: &request.fork_hooks,
            agent_project_dir: None,
        })
        .await?;

        self.create_window(&request.new_name, &source_cwd, &resolved, &[]).await
    }

    async fn delete_window(&self, name: &str) -> Result<(), AdapterError> {
        let _ = Command::new("tmux")
            .args(["kill-session", "-t", name])
            .output()
            .await
            .map_err(|e| AdapterError::CommandFailed(e.to_string()))?;
        Ok(())
    }

    async fn list_windows(&self) -> Result<Vec<WindowLiveness>, AdapterError> {
        let output = Command::new("tmux")
            .args(["list-sessions", "-F", "#{session_name}"])
            .output()
            .await
            .map_err(|e| AdapterError::CommandFailed(e.to_string()))?;

        if !output.status.success() {
            return Ok(Vec::new());
        }

        let names: Vec<String> = String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .collect();

        let mut result = Vec::with_capacity(names.len());
        for name in names {
            let last_activity = self.pane_activity(&name).await.unwrap_or(0);
            result.push(WindowLiveness {
                name,
                alive: true,
                last_activity,
            });
        }
        Ok(result)
    }

    async fn capture_pane(&self, name: &str, lines: u32) -> Result<String, AdapterError> {
        let output = Command::new("tmux")
            .args(["capture-pane", "-t", name, "-p", "-S"])
            .arg(format!("-{lines}"))
            .output()
            .await
            .map_err(|e| AdapterError::CommandFailed(e.to_string()))?;

        if !output.status.success() {
            return Err(AdapterError::NotFound(name.to_string()));
        }
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    async fn pane_activity(&self, name: &str) -> Result<i64, AdapterError> {
        let output = Command::new("tmux")
            .args(["display-message", "-t", name, "-p", "#{window_activity}"])
            .output()
            .await
            .map_err(|e| AdapterError::CommandFailed(e.to_string()))?;

        if !output.status.success() {
            return Err(AdapterError::NotFound(name.to_string()));
        }
        String::from_utf8_lossy(&output.stdout)
            .trim()
            .parse::<i64>()
            .map_err(|_| AdapterError::CommandFailed("unparseable activity timestamp".into()))
    }

    async fn pane_cwd(&self, name: &str) -> Result<PathBuf, AdapterError> {
        let output = Command::new("tmux")
            .args(["display-message", "-t", name, "-p", "#{pane_current_path}"])
            .output()
            .await
            .map_err(|e| AdapterError::CommandFailed(e.to_string()))?;

        if !output.status.success() {
            return Err(AdapterError::NotFound(name.to_string()));
        }
        Ok(PathBuf::from(
            String::from_utf8_lossy(&output.stdout).trim().to_string(),
        ))
    }

    async fn pane_command(&self, name: &str) -> Result<String, AdapterError> {
        let output = Command::new("tmux")
            .args(["display-message", "-t", name, "-p", "#{pane_start_command}"])
            .output()
            .await
            .map_err(|e| AdapterError::CommandFailed(e.to_string()))?;

        if !output.status.success() {
            return Err(AdapterError::NotFound(name.to_string()));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

#[cfg(test)]
#[path = "tmux_tests.rs"]
mod tests;
