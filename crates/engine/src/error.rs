// SPDX-License-Identifier: MIT

use chost_core::HostError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Host(#[from] HostError),
    #[error(transparent)]
    Adapter(#[from] chost_adapters::AdapterError),
    #[error(transparent)]
    Storage(#[from] chost_storage::StorageError),
    #[error("rpc timed out")]
    RpcTimeout,
    #[error("executor offline: {0}")]
    ExecutorOffline(String),
}

impl From<EngineError> for HostError {
    fn from(e: EngineError) -> Self {
        match e {
            EngineError::Host(h) => h,
            EngineError::Adapter(a) => a.into(),
            EngineError::Storage(s) => s.into(),
            EngineError::RpcTimeout => HostError::RpcTimeout,
            EngineError::ExecutorOffline(id) => HostError::ExecutorOffline(id),
        }
    }
}
