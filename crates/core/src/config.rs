// SPDX-License-Identifier: MIT

//! Per-user configuration keys recognized by the control plane (spec §3, §6).

/// Reserved per-user configuration keys. Any other key is stored and
/// returned verbatim but has no built-in meaning.
pub const RESERVED_KEYS: &[&str] = &[
    "defaultCommand",
    "mode",
    "theme",
    "font",
    "richFont",
    "prefixTimeout",
    "showHints",
    "forkHooks",
    "shortcuts",
];

pub fn is_reserved_key(key: &str) -> bool {
    RESERVED_KEYS.contains(&key)
}

/// Parse the `forkHooks` config value: a JSON object mapping a command's
/// base token to a hook script path.
pub fn parse_fork_hooks(value: &str) -> Result<std::collections::HashMap<String, String>, serde_json::Error> {
    if value.trim().is_empty() {
        return Ok(std::collections::HashMap::new());
    }
    serde_json::from_str(value)
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
