// SPDX-License-Identifier: MIT

//! Session/executor name grammar: `[A-Za-z0-9_-]+`, bounded to 128 bytes.

/// Maximum length in bytes for a session or executor name.
pub const MAX_NAME_LEN: usize = 128;

/// Validate a session or executor name against the URL-safe grammar.
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_NAME_LEN
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

#[cfg(test)]
#[path = "validate_tests.rs"]
mod tests;
