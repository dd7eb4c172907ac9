// SPDX-License-Identifier: MIT

use chost_core::HostError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("already exists: {0}")]
    AlreadyExists(String),
}

impl From<StorageError> for HostError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::NotFound(n) => HostError::NotFound(n),
            StorageError::AlreadyExists(n) => HostError::AlreadyExists(n),
            other => HostError::IoFailure(other.to_string()),
        }
    }
}
