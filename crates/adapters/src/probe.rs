// SPDX-License-Identifier: MIT

//! Analyze / summarize probes (spec §4.1 "Analyze / summarize").
//!
//! A probe captures the tail of a pane, invokes the agent once in
//! non-interactive mode with an analysis prompt, and tolerantly parses the
//! response as JSON — the agent is free to wrap it in a fenced code block,
//! add leading prose, or fail outright. Any failure degrades to an empty or
//! `false` result rather than propagating, since probes are best-effort.

use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

/// Time budget for a probe subprocess (spec §5 constant).
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(60);

/// Number of trailing pane lines captured for probe context.
pub const PROBE_CAPTURE_LINES: u32 = 200;

#[derive(Debug, Clone, PartialEq)]
pub struct ProbeResult {
    pub summary: String,
    pub needs_attention: bool,
}

impl Default for ProbeResult {
    fn default() -> Self {
        ProbeResult {
            summary: String::new(),
            needs_attention: false,
        }
    }
}

/// Run `agent_command` once, feeding it `prompt` on stdin, and parse its
/// stdout as a probe result. Never errors: any failure yields the default.
pub async fn run_probe(agent_command: &str, prompt: &str) -> ProbeResult {
    match run_probe_inner(agent_command, prompt).await {
        Ok(result) => result,
        Err(_) => ProbeResult::default(),
    }
}

async fn run_probe_inner(agent_command: &str, prompt: &str) -> Result<ProbeResult, String> {
    let mut parts = agent_command.split_whitespace();
    let program = parts.next().ok_or("empty agent command")?;
    let args: Vec<&str> = parts.collect();

    let mut cmd = Command::new(program);
    cmd.args(&args)
        .arg(prompt)
        .kill_on_drop(true)
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::null());

    let output = timeout(PROBE_TIMEOUT, cmd.output())
        .await
        .map_err(|_| "probe timed out".to_string())?
        .map_err(|e| e.to_string())?;

    if !output.status.success() {
        return Err(format!("probe exited with {:?}", output.status.code()));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    parse_probe_output(&stdout).ok_or_else(|| "could not parse probe output".to_string())
}

/// Extract a JSON object from `text`, tolerating ```json fences and
/// surrounding prose by scanning for the first `{` / last matching `}`.
pub fn parse_probe_output(text: &str) -> Option<ProbeResult> {
    let stripped = strip_fences(text);
    let start = stripped.find('{')?;
    let end = stripped.rfind('}')?;
    if end < start {
        return None;
    }
    let candidate = &stripped[start..=end];
    let value: serde_json::Value = serde_json::from_str(candidate).ok()?;

    Some(ProbeResult {
        summary: value
            .get("summary")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string(),
        needs_attention: value
            .get("needsAttention")
            .and_then(|v| v.as_bool())
            .unwrap_or(false),
    })
}

fn strip_fences(text: &str) -> String {
    let trimmed = text.trim();
    if let Some(rest) = trimmed.strip_prefix("```json") {
        rest.trim_end_matches("```").trim().to_string()
    } else if let Some(rest) = trimmed.strip_prefix("```") {
        rest.trim_end_matches("```").trim().to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
#[path = "probe_tests.rs"]
mod tests;
