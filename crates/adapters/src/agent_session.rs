// SPDX-License-Identifier: MIT

//! Agent session id generation and injection (spec §4.1 "Agent session id").

/// Binaries recognized as agent CLIs. The first whitespace-delimited token
/// of a launched command is checked against this list.
const AGENT_BINARIES: &[&str] = &["claude", "claude-code"];

/// Environment variable carrying the generated session id into the window.
pub const AGENT_SESSION_ENV: &str = "CLAUDE_HOST_AGENT_SESSION_ID";

/// The basename of the first whitespace-delimited token of `command`.
pub fn base_token(command: &str) -> &str {
    command
        .split_whitespace()
        .next()
        .map(|first| first.rsplit('/').next().unwrap_or(first))
        .unwrap_or("")
}

pub fn is_agent_command(command: &str) -> bool {
    AGENT_BINARIES.contains(&base_token(command))
}

/// If `command` launches an agent binary, generate a fresh 128-bit id,
/// return it alongside the command line with `--session-id <id>` appended
/// and the env var to inject. Otherwise returns `command` unchanged.
pub fn prepare_agent_launch(
    command: &str,
    id_128_hex: impl FnOnce() -> String,
) -> (String, Option<String>) {
    if !is_agent_command(command) {
        return (command.to_string(), None);
    }
    let session_id = id_128_hex();
    (
        format!("{command} --session-id {session_id}"),
        Some(session_id),
    )
}

#[cfg(test)]
#[path = "agent_session_tests.rs"]
mod tests;
