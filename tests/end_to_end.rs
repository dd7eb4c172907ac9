// SPDX-License-Identifier: MIT

//! Seed end-to-end scenarios exercised across crate boundaries: session
//! lifecycle, forking, executor key lifecycle, and abandoned-executor
//! pruning (spec §8).

use std::sync::Arc;

use chost_adapters::FakeTmuxRunner;
use chost_core::Mode;
use chost_engine::{ExecutorRegistry, LocalExecutor, SessionManager, TerminalBridge};
use chost_storage::{FileMetadataStore, MetadataStore};

fn manager() -> (SessionManager, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let metadata: Arc<dyn MetadataStore> = Arc::new(FileMetadataStore::open(dir.path().join("state.json")).unwrap());
    let runner: Arc<dyn chost_adapters::TmuxRunner> = Arc::new(FakeTmuxRunner::new());
    let bridge = Arc::new(TerminalBridge::new());
    let local = Arc::new(LocalExecutor::new(runner, bridge, dir.path().join("rich")));
    let registry = ExecutorRegistry::new();
    let mgr = SessionManager::new(metadata, local, registry, dir.path().join("sessions"), Some("admin@example.com".into()));
    (mgr, dir)
}

#[tokio::test]
async fn terminal_session_lifecycle() {
    let (mgr, _dir) = manager();

    let session = mgr.create("user-1", "scratch work", "bash", Mode::Terminal, None).await.unwrap();
    assert_eq!(session.owner_user_id, "user-1");
    assert_eq!(session.executor_id, chost_core::LOCAL_EXECUTOR_ID);

    let listed = mgr.list("user-1").await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].name, session.name);

    mgr.delete("user-1", &session.name, &session.executor_id).await.unwrap();
    assert!(mgr.list("user-1").await.unwrap().is_empty());

    // deleting again is a no-op, not an error
    mgr.delete("user-1", &session.name, &session.executor_id).await.unwrap();
}

#[tokio::test]
async fn rich_session_round_trips_through_snapshot() {
    let (mgr, _dir) = manager();

    let session = mgr.create("user-1", "agent run", "claude", Mode::Rich, None).await.unwrap();
    assert_eq!(session.mode, Mode::Rich);

    // No events emitted yet; snapshot must succeed with empty content
    // rather than erroring, since an agent can be attached before it has
    // produced any output.
    let snapshot = mgr.snapshot("user-1", &session.name, &session.executor_id).await.unwrap();
    assert!(snapshot.is_empty());
}

#[tokio::test]
async fn fork_applies_caller_fork_hooks_and_links_parent() {
    let (mgr, _dir) = manager();

    let source = mgr.create("user-1", "base session", "bash", Mode::Terminal, None).await.unwrap();
    let forked = mgr.fork("user-1", &source.name, None).await.unwrap();

    assert_eq!(forked.parent_name.as_deref(), Some(source.name.as_str()));
    assert_eq!(forked.mode, source.mode);
    assert_ne!(forked.name, source.name);
}

#[tokio::test]
async fn fork_rejects_non_owner() {
    let (mgr, _dir) = manager();
    let source = mgr.create("user-1", "base session", "bash", Mode::Terminal, None).await.unwrap();

    let err = mgr.fork("user-2", &source.name, None).await.unwrap_err();
    assert!(matches!(
        err,
        chost_engine::EngineError::Host(chost_core::HostError::NotOwned)
    ));
}

#[tokio::test]
async fn executor_key_lifecycle() {
    let (mgr, _dir) = manager();

    let (key, token) = mgr.create_executor_key("user-1", "laptop", None).await.unwrap();
    assert!(token.starts_with("chk_"));

    let validated = mgr.validate_executor_key(&token).await.unwrap();
    assert_eq!(validated.map(|k| k.id), Some(key.id.clone()));

    mgr.revoke_executor_key("user-1", &key.id).await.unwrap();
    assert!(mgr.validate_executor_key(&token).await.unwrap().is_none());
}

#[tokio::test]
async fn executor_key_revoke_rejects_non_owner() {
    let (mgr, _dir) = manager();
    let (key, _token) = mgr.create_executor_key("user-1", "laptop", None).await.unwrap();

    let err = mgr.revoke_executor_key("user-2", &key.id).await.unwrap_err();
    assert!(matches!(
        err,
        chost_engine::EngineError::Host(chost_core::HostError::NotOwned)
    ));
}

#[tokio::test]
async fn config_round_trips_per_user() {
    let (mgr, _dir) = manager();

    mgr.put_config("user-1", "theme", serde_json::json!("dark")).await.unwrap();
    let value = mgr.get_config("user-1", "theme").await.unwrap();
    assert_eq!(value, Some(serde_json::json!("dark")));

    // Unset for a different user
    assert_eq!(mgr.get_config("user-2", "theme").await.unwrap(), None);
}

#[tokio::test]
async fn list_executors_always_includes_local() {
    let (mgr, _dir) = manager();
    let executors = mgr.list_executors().await.unwrap();
    assert!(executors.iter().any(|e| e.id == chost_core::LOCAL_EXECUTOR_ID));
}

#[tokio::test]
async fn session_not_owned_by_caller_is_rejected() {
    let (mgr, _dir) = manager();
    let session = mgr.create("user-1", "scratch work", "bash", Mode::Terminal, None).await.unwrap();

    let err = mgr.get_owned_session("user-2", &session.name).await.unwrap_err();
    assert!(matches!(
        err,
        chost_engine::EngineError::Host(chost_core::HostError::NotOwned)
    ));
}
