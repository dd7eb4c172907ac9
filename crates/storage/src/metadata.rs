// SPDX-License-Identifier: MIT

//! `MetadataStore` (spec §10.5): async CRUD over `Session`, `ExecutorRecord`,
//! `ExecutorKey`, and per-user config KV. The reference implementation keeps
//! an in-memory [`MaterializedState`] behind a `parking_lot::RwLock` and
//! persists it via [`crate::snapshot`], debounced the same way the
//! rich-session event log is.

use async_trait::async_trait;
use chost_core::{ExecutorKey, ExecutorRecord, Session};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

use crate::error::StorageError;

/// Interval between debounced snapshot flushes (spec §9 constant: 2s).
pub const FLUSH_DEBOUNCE: Duration = Duration::from_secs(2);

/// The complete state of the control plane's metadata, serialized whole on
/// every flush (small enough in practice that a full rewrite is cheap, and
/// it keeps the file format trivially inspectable).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MaterializedState {
    pub sessions: HashMap<String, Session>,
    pub executors: HashMap<String, ExecutorRecord>,
    pub executor_keys: HashMap<String, ExecutorKey>,
    /// Keyed by `"{user_id}\u{0}{key}"`.
    pub config: HashMap<String, serde_json::Value>,
}

fn config_key(user_id: &str, key: &str) -> String {
    format!("{user_id}\u{0}{key}")
}

#[async_trait]
pub trait MetadataStore: Send + Sync {
    async fn get_session(&self, name: &str) -> Result<Option<Session>, StorageError>;
    async fn put_session(&self, session: Session) -> Result<(), StorageError>;
    async fn delete_session(&self, name: &str) -> Result<(), StorageError>;
    async fn list_sessions(&self) -> Result<Vec<Session>, StorageError>;

    async fn get_executor(&self, id: &str) -> Result<Option<ExecutorRecord>, StorageError>;
    async fn put_executor(&self, executor: ExecutorRecord) -> Result<(), StorageError>;
    async fn list_executors(&self) -> Result<Vec<ExecutorRecord>, StorageError>;

    async fn get_executor_key(&self, id: &str) -> Result<Option<ExecutorKey>, StorageError>;
    async fn put_executor_key(&self, key: ExecutorKey) -> Result<(), StorageError>;
    async fn delete_executor_key(&self, id: &str) -> Result<(), StorageError>;
    async fn list_executor_keys(&self) -> Result<Vec<ExecutorKey>, StorageError>;

    async fn get_config(
        &self,
        user_id: &str,
        key: &str,
    ) -> Result<Option<serde_json::Value>, StorageError>;
    async fn put_config(
        &self,
        user_id: &str,
        key: &str,
        value: serde_json::Value,
    ) -> Result<(), StorageError>;

    /// Flush immediately regardless of the debounce window, used on
    /// graceful shutdown (spec §11).
    async fn flush_now(&self) -> Result<(), StorageError>;
}

/// File-backed reference implementation.
pub struct FileMetadataStore {
    state: Arc<RwLock<MaterializedState>>,
    path: PathBuf,
    dirty: Arc<AtomicBool>,
    wake: Arc<Notify>,
}

impl FileMetadataStore {
    /// Load existing state from `path` if present, and spawn the debounced
    /// flush task. Requires a running tokio runtime.
    pub fn open(path: PathBuf) -> Result<Self, StorageError> {
        let loaded: MaterializedState = crate::snapshot::load(&path)?.unwrap_or_default();
        let store = FileMetadataStore {
            state: Arc::new(RwLock::new(loaded)),
            path,
            dirty: Arc::new(AtomicBool::new(false)),
            wake: Arc::new(Notify::new()),
        };
        store.spawn_flush_task();
        Ok(store)
    }

    fn spawn_flush_task(&self) {
        let state = Arc::clone(&self.state);
        let path = self.path.clone();
        let dirty = Arc::clone(&self.dirty);
        let wake = Arc::clone(&self.wake);

        tokio::spawn(async move {
            loop {
                wake.notified().await;
                tokio::time::sleep(FLUSH_DEBOUNCE).await;
                if dirty.swap(false, Ordering::SeqCst) {
                    let snapshot = state.read().clone();
                    if let Err(e) = crate::snapshot::save(&path, &snapshot) {
                        tracing::error!(error = %e, "metadata snapshot flush failed");
                    }
                }
            }
        });
    }

    fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::SeqCst);
        self.wake.notify_one();
    }
}

#[async_trait]
impl MetadataStore for FileMetadataStore {
    async fn get_session(&self, name: &str) -> Result<Option<Session>, StorageError> {
        Ok(self.state.read().sessions.get(name).cloned())
    }

    async fn put_session(&self, session: Session) -> Result<(), StorageError> {
        self.state.write().sessions.insert(session.name.clone(), session);
        self.mark_dirty();
        Ok(())
    }

    async fn delete_session(&self, name: &str) -> Result<(), StorageError> {
        self.state.write().sessions.remove(name);
        self.mark_dirty();
        Ok(())
    }

    async fn list_sessions(&self) -> Result<Vec<Session>, StorageError> {
        Ok(self.state.read().sessions.values().cloned().collect())
    }

    async fn get_executor(&self, id: &str) -> Result<Option<ExecutorRecord>, StorageError> {
        Ok(self.state.read().executors.get(id).cloned())
    }

    async fn put_executor(&self, executor: ExecutorRecord) -> Result<(), StorageError> {
        self.state
            .write()
            .executors
            .insert(executor.id.clone(), executor);
        self.mark_dirty();
        Ok(())
    }

    async fn list_executors(&self) -> Result<Vec<ExecutorRecord>, StorageError> {
        Ok(self.state.read().executors.values().cloned().collect())
    }

    async fn get_executor_key(&self, id: &str) -> Result<Option<ExecutorKey>, StorageError> {
        Ok(self.state.read().executor_keys.get(id).cloned())
    }

    async fn put_executor_key(&self, key: ExecutorKey) -> Result<(), StorageError> {
        self.state.write().executor_keys.insert(key.id.clone(), key);
        self.mark_dirty();
        Ok(())
    }

    async fn delete_executor_key(&self, id: &str) -> Result<(), StorageError> {
        self.state.write().executor_keys.remove(id);
        self.mark_dirty();
        Ok(())
    }

    async fn list_executor_keys(&self) -> Result<Vec<ExecutorKey>, StorageError> {
        Ok(self.state.read().executor_keys.values().cloned().collect())
    }

    async fn get_config(
        &self,
        user_id: &str,
        key: &str,
    ) -> Result<Option<serde_json::Value>, StorageError> {
        Ok(self.state.read().config.get(&config_key(user_id, key)).cloned())
    }

    async fn put_config(
        &self,
        user_id: &str,
        key: &str,
        value: serde_json::Value,
    ) -> Result<(), StorageError> {
        self.state
            .write()
            .config
            .insert(config_key(user_id, key), value);
        self.mark_dirty();
        Ok(())
    }

    async fn flush_now(&self) -> Result<(), StorageError> {
        self.dirty.store(false, Ordering::SeqCst);
        let snapshot = self.state.read().clone();
        crate::snapshot::save(&self.path, &snapshot)
    }
}

#[cfg(test)]
#[path = "metadata_tests.rs"]
mod tests;
