// SPDX-License-Identifier: MIT

//! The `Session` entity (spec §3) and its construction invariants.

use crate::error::HostError;
use crate::validate::is_valid_name;
use serde::{Deserialize, Serialize};

/// Driver for a session: a raw shell under a multiplexer, or an agent
/// subprocess emitting structured events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    #[default]
    Terminal,
    Rich,
}

/// The special executor id owned by the control-plane process itself.
pub const LOCAL_EXECUTOR_ID: &str = "local";

/// A session's metadata row, as tracked by `SessionManager`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub name: String,
    pub owner_user_id: String,
    pub executor_id: String,
    pub mode: Mode,
    pub command: String,
    pub description: String,
    pub parent_name: Option<String>,
    pub created_at: i64,
    pub last_activity: i64,
    pub job_prompt: Option<String>,
    pub job_max_iterations: Option<u32>,
    pub needs_input: bool,
}

impl Session {
    /// Build a new session row, enforcing the invariants from spec §3:
    /// `mode=rich ⇒ job_prompt=None`; `job_prompt.is_some() ⇒ job_max_iterations >= 1`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: impl Into<String>,
        owner_user_id: impl Into<String>,
        executor_id: impl Into<String>,
        mode: Mode,
        command: impl Into<String>,
        description: impl Into<String>,
        parent_name: Option<String>,
        created_at: i64,
        job_prompt: Option<String>,
        job_max_iterations: Option<u32>,
    ) -> Result<Self, HostError> {
        let name = name.into();
        if !is_valid_name(&name) {
            return Err(HostError::InvalidName(name));
        }
        if mode == Mode::Rich && job_prompt.is_some() {
            return Err(HostError::InvalidArgument(
                "rich sessions cannot carry a job prompt".into(),
            ));
        }
        if let Some(ref prompt) = job_prompt {
            if prompt.is_empty() {
                return Err(HostError::InvalidArgument("job prompt is empty".into()));
            }
            if job_max_iterations.unwrap_or(0) < 1 {
                return Err(HostError::InvalidArgument(
                    "job_max_iterations must be >= 1 when a job prompt is set".into(),
                ));
            }
        }

        Ok(Self {
            name,
            owner_user_id: owner_user_id.into(),
            executor_id: executor_id.into(),
            mode,
            command: command.into(),
            description: description.into(),
            parent_name,
            created_at,
            last_activity: created_at,
            job_prompt,
            job_max_iterations,
            needs_input: false,
        })
    }

    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.owner_user_id == user_id
    }

    pub fn is_job(&self) -> bool {
        self.job_prompt.is_some()
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
