// SPDX-License-Identifier: MIT

//! The `ExecutorKey` entity, token format, and constant-time validation
//! primitives (spec §3, §6).

use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Fixed prefix for every executor token.
pub const TOKEN_PREFIX: &str = "chk_";

/// Number of random bytes in a token's secret portion (-> 64 hex chars).
const TOKEN_SECRET_BYTES: usize = 32;

/// Number of hex characters of the secret kept for display (`key_prefix`).
const DISPLAY_PREFIX_HEX: usize = 8;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutorKey {
    pub id: String,
    pub owner_user_id: String,
    pub name: String,
    pub key_hash: String,
    pub key_prefix: String,
    pub created_at: i64,
    pub expires_at: Option<i64>,
    pub last_used: Option<i64>,
    pub revoked: bool,
}

impl ExecutorKey {
    pub fn is_usable_at(&self, now: i64) -> bool {
        if self.revoked {
            return false;
        }
        match self.expires_at {
            Some(exp) => now < exp,
            None => true,
        }
    }
}

/// Generate a fresh `chk_` + 64 lowercase hex secret. Returned exactly once.
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_SECRET_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    format!("{TOKEN_PREFIX}{}", hex_encode(&bytes))
}

/// Sha-256 hash of a presented token, stored as `key_hash`.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex_encode(&hasher.finalize())
}

/// The first 8 hex characters of a token's secret, for display purposes only.
pub fn display_prefix(token: &str) -> String {
    token
        .strip_prefix(TOKEN_PREFIX)
        .unwrap_or(token)
        .chars()
        .take(DISPLAY_PREFIX_HEX)
        .collect()
}

/// Whether `token` has the right shape (`chk_` + 64 hex chars) to even be
/// worth hashing and looking up. This is a cheap pre-filter, not a security
/// boundary — `constant_time_eq` on the hash is what actually authenticates.
pub fn looks_like_token(token: &str) -> bool {
    match token.strip_prefix(TOKEN_PREFIX) {
        Some(rest) => rest.len() == TOKEN_SECRET_BYTES * 2 && rest.bytes().all(|b| b.is_ascii_hexdigit()),
        None => false,
    }
}

/// Constant-time byte comparison, used to compare presented-token hashes
/// against stored hashes without leaking timing information.
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    let mut diff: u8 = 0;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

fn hex_encode(bytes: &[u8]) -> String {
    use std::fmt::Write;
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(out, "{b:02x}");
    }
    out
}

#[cfg(test)]
#[path = "executor_key_tests.rs"]
mod tests;
