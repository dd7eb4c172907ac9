// SPDX-License-Identifier: MIT

//! Job launcher script generation (spec §4.1 "Jobs").
//!
//! A job repeatedly invokes the agent binary: the first invocation starts a
//! session with the prompt, subsequent invocations resume it and ask it to
//! continue. The loop stops early once the agent's output contains the
//! literal token `<promise>DONE</promise>`, or after `max_iterations`.

use std::path::Path;

/// Sentinel the agent emits to signal the job is complete.
pub const DONE_TOKEN: &str = "<promise>DONE</promise>";

/// Build the launcher script body. `prompt_path` holds the initial prompt;
/// the script removes it (and itself) on exit and exits quietly on
/// INT/TERM so killing the window doesn't leave a stack trace on screen.
pub fn build_launcher_script(
    prompt_path: &Path,
    agent_command: &str,
    max_iterations: u32,
    resume_flag_template: &str,
) -> String {
    let prompt_path = shell_quote(&prompt_path.to_string_lossy());
    let resume_cmd = resume_flag_template.replace("{command}", agent_command);

    format!(
        r#"#!/bin/sh
set -u
SELF="$0"
PROMPT_FILE={prompt_path}
cleanup() {{
    rm -f "$PROMPT_FILE" "$SELF" 2>/dev/null || true
}}
trap 'cleanup; exit 0' INT TERM
trap cleanup EXIT

PROMPT="$(cat "$PROMPT_FILE" 2>/dev/null || true)"
DONE_TOKEN={done_token}
i=1
while [ "$i" -le {max_iterations} ]; do
    if [ "$i" -eq 1 ]; then
        OUTPUT="$({agent_command} "$PROMPT" 2>&1)"
    else
        OUTPUT="$({resume_cmd} "continue" 2>&1)"
    fi
    printf '%s\n' "$OUTPUT"
    case "$OUTPUT" in
        *"$DONE_TOKEN"*) break ;;
    esac
    i=$((i + 1))
done
"#,
        prompt_path = prompt_path,
        done_token = shell_quote(DONE_TOKEN),
        max_iterations = max_iterations.max(1),
        agent_command = agent_command,
        resume_cmd = resume_cmd,
    )
}

fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "'\\''"))
}

#[cfg(test)]
#[path = "jobs_tests.rs"]
mod tests;
