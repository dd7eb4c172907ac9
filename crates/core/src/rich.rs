// SPDX-License-Identifier: MIT

//! Opaque agent event representation and the `RichSessionState` entity
//! (spec §3, §4.3.3, §9 "Dynamic event shapes").
//!
//! The agent's event stream is schemaless from the bridge's perspective:
//! we only recognize a handful of reserved keys and otherwise treat each
//! line as an opaque JSON value, falling back to `{"type":"raw","text":…}`
//! when a line fails to parse.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One event from the agent's NDJSON stream, or a `raw` wrapper around a
/// line that failed to parse as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentEvent(pub Value);

impl AgentEvent {
    /// Parse one line of the agent's stdout. Never fails: an unparsable
    /// line becomes `{"type":"raw","text":<line>}` per spec §4.3.3.
    pub fn from_line(line: &str) -> Self {
        match serde_json::from_str::<Value>(line) {
            Ok(value) if value.is_object() => AgentEvent(value),
            _ => AgentEvent(serde_json::json!({ "type": "raw", "text": line })),
        }
    }

    pub fn type_tag(&self) -> Option<&str> {
        self.0.get("type").and_then(Value::as_str)
    }

    pub fn subtype(&self) -> Option<&str> {
        self.0.get("subtype").and_then(Value::as_str)
    }

    pub fn session_id(&self) -> Option<&str> {
        self.0.get("session_id").and_then(Value::as_str)
    }

    /// Present when the event belongs to a sub-agent spawned via a tool
    /// call; such events are forwarded to the client but never persisted.
    pub fn is_sub_agent_event(&self) -> bool {
        self.0.get("parent_tool_use_id").is_some()
    }

    pub fn is_system_init(&self) -> bool {
        self.type_tag() == Some("system") && self.subtype() == Some("init")
    }

    pub fn is_result(&self) -> bool {
        self.type_tag() == Some("result")
    }

    pub fn is_stream_event(&self) -> bool {
        self.type_tag() == Some("stream_event")
    }

    pub fn is_raw(&self) -> bool {
        self.type_tag() == Some("raw")
    }
}

/// Mutable per-session state for a rich (agent) session (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RichSessionState {
    /// Assigned from the agent's first `session_id` sighting; used to
    /// `--resume` after a respawn.
    pub agent_session_id: Option<String>,
    /// Durable, insertion-ordered event log. Stream deltas are never here.
    pub events: Vec<AgentEvent>,
    pub turning: bool,
    /// Whether the `system`/`init` event has been seen for the current
    /// subprocess lifetime (only the first per spawn is kept).
    pub init_received: bool,
    #[serde(skip, default)]
    pub dirty: bool,
    /// Launcher command string, used to decide which flags to pass on
    /// respawn (e.g. whether to add `--resume`).
    pub command: String,
}

impl RichSessionState {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            agent_session_id: None,
            events: Vec::new(),
            turning: false,
            init_received: false,
            dirty: false,
            command: command.into(),
        }
    }

    /// Record an event to the durable log (only call for persistable
    /// events — stream deltas and sub-agent events never reach here).
    pub fn persist_event(&mut self, event: AgentEvent) {
        if let Some(sid) = event.session_id() {
            if self.agent_session_id.is_none() {
                self.agent_session_id = Some(sid.to_string());
            }
        }
        self.events.push(event);
        self.dirty = true;
    }

    /// Per spec §4.3.3: only the first `system`/`init` event per spawn is
    /// persisted and forwarded.
    pub fn should_suppress_init(&self, event: &AgentEvent) -> bool {
        event.is_system_init() && self.init_received
    }

    pub fn note_init_seen(&mut self, event: &AgentEvent) {
        if event.is_system_init() {
            self.init_received = true;
        }
    }

    /// Reset per-spawn state (called when a fresh subprocess starts, e.g.
    /// after a respawn) without discarding the durable event log.
    pub fn reset_for_new_spawn(&mut self) {
        self.init_received = false;
    }
}

#[cfg(test)]
#[path = "rich_tests.rs"]
mod tests;
