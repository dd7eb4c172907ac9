use super::*;
use chost_adapters::FakeTmuxRunner;
use chost_storage::FileMetadataStore;

fn manager() -> (SessionManager, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let metadata: Arc<dyn MetadataStore> = Arc::new(FileMetadataStore::open(dir.path().join("state.json")).unwrap());
    let runner: Arc<dyn chost_adapters::TmuxRunner> = Arc::new(FakeTmuxRunner::new());
    let bridge = Arc::new(crate::terminal_bridge::TerminalBridge::new());
    let local = Arc::new(LocalExecutor::new(runner, bridge, dir.path().join("rich")));
    let registry = ExecutorRegistry::new();
    let mgr = SessionManager::new(metadata, local, registry, dir.path().join("sessions"), Some("admin@example.com".into()));
    (mgr, dir)
}

#[tokio::test]
async fn create_persists_row_owned_by_caller() {
    let (mgr, _dir) = manager();
    let session = mgr.create("user-1", "desc", "bash", Mode::Terminal, None).await.unwrap();
    assert_eq!(session.owner_user_id, "user-1");
    let listed = mgr.list("user-1").await.unwrap();
    assert_eq!(listed.len(), 1);
}

#[tokio::test]
async fn list_is_scoped_to_owner() {
    let (mgr, _dir) = manager();
    mgr.create("user-1", "desc", "bash", Mode::Terminal, None).await.unwrap();
    mgr.create("user-2", "desc", "bash", Mode::Terminal, None).await.unwrap();
    assert_eq!(mgr.list("user-1").await.unwrap().len(), 1);
    assert_eq!(mgr.list("user-2").await.unwrap().len(), 1);
}

#[tokio::test]
async fn fork_rejects_non_owner() {
    let (mgr, _dir) = manager();
    let session = mgr.create("user-1", "desc", "bash", Mode::Terminal, None).await.unwrap();
    let err = mgr.fork("user-2", &session.name, None).await.unwrap_err();
    assert!(matches!(err, EngineError::Host(HostError::NotOwned)));
}

#[tokio::test]
async fn fork_creates_child_row_with_parent_name() {
    let (mgr, _dir) = manager();
    let session = mgr.create("user-1", "desc", "bash", Mode::Terminal, None).await.unwrap();
    let forked = mgr.fork("user-1", &session.name, None).await.unwrap();
    assert_eq!(forked.parent_name.as_deref(), Some(session.name.as_str()));
    assert!(forked.description.contains(&session.name));
}

#[tokio::test]
async fn delete_is_idempotent_and_removes_row() {
    let (mgr, _dir) = manager();
    let session = mgr.create("user-1", "desc", "bash", Mode::Terminal, None).await.unwrap();
    mgr.delete("user-1", &session.name, "local").await.unwrap();
    assert_eq!(mgr.list("user-1").await.unwrap().len(), 0);
    mgr.delete("user-1", &session.name, "local").await.unwrap();
}

#[tokio::test]
async fn delete_rejects_non_owner() {
    let (mgr, _dir) = manager();
    let session = mgr.create("user-1", "desc", "bash", Mode::Terminal, None).await.unwrap();
    let err = mgr.delete("user-2", &session.name, "local").await.unwrap_err();
    assert!(matches!(err, EngineError::Host(HostError::NotOwned)));
}

#[tokio::test]
async fn executor_key_lifecycle() {
    let (mgr, _dir) = manager();
    let (key, token) = mgr.create_executor_key("user-1", "laptop", None).await.unwrap();
    assert!(token.starts_with("chk_"));

    let validated = mgr.validate_executor_key(&token).await.unwrap().unwrap();
    assert_eq!(validated.id, key.id);
    assert!(validated.last_used.is_some());

    mgr.revoke_executor_key("user-1", &key.id).await.unwrap();
    assert!(mgr.validate_executor_key(&token).await.unwrap().is_none());
}

#[tokio::test]
async fn validate_executor_key_rejects_garbage_tokens() {
    let (mgr, _dir) = manager();
    assert!(mgr.validate_executor_key("not-a-token").await.unwrap().is_none());
}

#[tokio::test]
async fn adopt_unowned_resources_only_triggers_for_admin_email() {
    let (mgr, _dir) = manager();
    let session = mgr.create("", "desc", "bash", Mode::Terminal, None).await.unwrap();
    assert_eq!(session.owner_user_id, "");

    mgr.adopt_unowned_resources("user-1", "someone-else@example.com").await.unwrap();
    let still_unowned = mgr.metadata.get_session(&session.name).await.unwrap().unwrap();
    assert_eq!(still_unowned.owner_user_id, "");

    mgr.adopt_unowned_resources("user-1", "admin@example.com").await.unwrap();
    let adopted = mgr.metadata.get_session(&session.name).await.unwrap().unwrap();
    assert_eq!(adopted.owner_user_id, "user-1");
}

#[tokio::test]
async fn summarize_delegates_to_the_resolved_executor() {
    let (mgr, _dir) = manager();
    let session = mgr.create("user-1", "desc", "bash", Mode::Terminal, None).await.unwrap();
    let result = mgr.summarize("user-1", &session.name, "local", "what's going on?").await.unwrap();
    assert_eq!(result.summary, "");
}

#[tokio::test]
async fn get_owned_session_rejects_non_owner() {
    let (mgr, _dir) = manager();
    let session = mgr.create("user-1", "desc", "bash", Mode::Terminal, None).await.unwrap();
    let err = mgr.get_owned_session("user-2", &session.name).await.unwrap_err();
    assert!(matches!(err, EngineError::Host(HostError::NotOwned)));
}

#[tokio::test]
async fn adopt_orphaned_sessions_creates_and_prunes_rows() {
    let (mgr, _dir) = manager();
    let registry = mgr.registry.clone();
    let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
    registry.register(
        "exec-1".into(),
        "runner".into(),
        Default::default(),
        None,
        "user-1".into(),
        now_secs(),
        tx,
    );

    mgr.adopt_orphaned_sessions(
        "exec-1",
        "user-1",
        &[SessionLiveness { name: "adopted-1".into(), alive: true, last_activity: 1 }],
    )
    .await
    .unwrap();
    let rows = mgr.metadata.list_sessions().await.unwrap();
    assert!(rows.iter().any(|s| s.name == "adopted-1"));

    mgr.adopt_orphaned_sessions("exec-1", "user-1", &[]).await.unwrap();
    let rows = mgr.metadata.list_sessions().await.unwrap();
    assert!(!rows.iter().any(|s| s.name == "adopted-1"));
}
