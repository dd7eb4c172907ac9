// SPDX-License-Identifier: MIT

//! The error taxonomy surfaced to callers over HTTP/WS (spec §7).

use thiserror::Error;

/// Tagged error values carried across every component boundary.
///
/// Each variant maps to an HTTP status class at the Frontdoor; components
/// below the Frontdoor only ever construct `HostError`, never raw strings,
/// so the mapping stays centralized.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HostError {
    #[error("invalid name: {0}")]
    InvalidName(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("not owned by caller")]
    NotOwned,

    #[error("unauthenticated")]
    Unauthenticated,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("executor offline: {0}")]
    ExecutorOffline(String),

    #[error("rpc timed out")]
    RpcTimeout,

    #[error("spawn failed: {0}")]
    SpawnFailure(String),

    #[error("io failure: {0}")]
    IoFailure(String),

    #[error("agent crashed: {0}")]
    AgentCrashed(String),

    #[error("transient failure: {0}")]
    Transient(String),
}

impl HostError {
    /// HTTP-status-class this error maps to, per spec §7.
    pub fn status_code(&self) -> u16 {
        match self {
            HostError::InvalidName(_) | HostError::InvalidArgument(_) => 400,
            HostError::Unauthenticated => 401,
            HostError::NotOwned => 403,
            HostError::NotFound(_) => 404,
            HostError::AlreadyExists(_) => 409,
            HostError::ExecutorOffline(_) => 503,
            HostError::RpcTimeout => 504,
            HostError::SpawnFailure(_)
            | HostError::IoFailure(_)
            | HostError::AgentCrashed(_)
            | HostError::Transient(_) => 500,
        }
    }

    /// A short machine-readable tag matching the variant name, used as the
    /// `error` field on WS/RPC error frames.
    pub fn tag(&self) -> &'static str {
        match self {
            HostError::InvalidName(_) => "InvalidName",
            HostError::InvalidArgument(_) => "InvalidArgument",
            HostError::NotOwned => "NotOwned",
            HostError::Unauthenticated => "Unauthenticated",
            HostError::NotFound(_) => "NotFound",
            HostError::AlreadyExists(_) => "AlreadyExists",
            HostError::ExecutorOffline(_) => "ExecutorOffline",
            HostError::RpcTimeout => "RpcTimeout",
            HostError::SpawnFailure(_) => "SpawnFailure",
            HostError::IoFailure(_) => "IoFailure",
            HostError::AgentCrashed(_) => "AgentCrashed",
            HostError::Transient(_) => "Transient",
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
