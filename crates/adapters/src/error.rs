// SPDX-License-Identifier: MIT

use chost_core::HostError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum AdapterError {
    #[error("invalid name: {0}")]
    InvalidName(String),
    #[error("already exists: {0}")]
    AlreadyExists(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("spawn failed: {0}")]
    SpawnFailed(String),
    #[error("command failed: {0}")]
    CommandFailed(String),
    #[error("io error: {0}")]
    Io(String),
}

impl From<AdapterError> for HostError {
    fn from(e: AdapterError) -> Self {
        match e {
            AdapterError::InvalidName(n) => HostError::InvalidName(n),
            AdapterError::AlreadyExists(n) => HostError::AlreadyExists(n),
            AdapterError::NotFound(n) => HostError::NotFound(n),
            AdapterError::SpawnFailed(m) => HostError::SpawnFailure(m),
            AdapterError::CommandFailed(m) => HostError::IoFailure(m),
            AdapterError::Io(m) => HostError::IoFailure(m),
        }
    }
}

impl From<std::io::Error> for AdapterError {
    fn from(e: std::io::Error) -> Self {
        AdapterError::Io(e.to_string())
    }
}
