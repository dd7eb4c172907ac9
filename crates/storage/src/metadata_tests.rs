use super::*;
use chost_core::{ExecutorRecord, Mode, Session};

fn sample_session(name: &str) -> Session {
    Session::new(name, "user-1", "local", Mode::Terminal, "bash", "", None, 1000, None, None).unwrap()
}

#[tokio::test]
async fn put_then_get_session_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileMetadataStore::open(dir.path().join("state.json")).unwrap();

    store.put_session(sample_session("a")).await.unwrap();
    let fetched = store.get_session("a").await.unwrap();
    assert_eq!(fetched.map(|s| s.name), Some("a".to_string()));
}

#[tokio::test]
async fn delete_session_removes_it() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileMetadataStore::open(dir.path().join("state.json")).unwrap();

    store.put_session(sample_session("a")).await.unwrap();
    store.delete_session("a").await.unwrap();
    assert_eq!(store.get_session("a").await.unwrap(), None);
}

#[tokio::test]
async fn list_sessions_returns_all_rows() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileMetadataStore::open(dir.path().join("state.json")).unwrap();

    store.put_session(sample_session("a")).await.unwrap();
    store.put_session(sample_session("b")).await.unwrap();
    let mut names: Vec<String> = store
        .list_sessions()
        .await
        .unwrap()
        .into_iter()
        .map(|s| s.name)
        .collect();
    names.sort();
    assert_eq!(names, vec!["a".to_string(), "b".to_string()]);
}

#[tokio::test]
async fn executor_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileMetadataStore::open(dir.path().join("state.json")).unwrap();

    store.put_executor(ExecutorRecord::local(1000)).await.unwrap();
    let fetched = store.get_executor("local").await.unwrap();
    assert!(fetched.is_some());
}

#[tokio::test]
async fn config_is_scoped_per_user() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileMetadataStore::open(dir.path().join("state.json")).unwrap();

    store
        .put_config("user-1", "theme", serde_json::json!("dark"))
        .await
        .unwrap();
    store
        .put_config("user-2", "theme", serde_json::json!("light"))
        .await
        .unwrap();

    assert_eq!(
        store.get_config("user-1", "theme").await.unwrap(),
        Some(serde_json::json!("dark"))
    );
    assert_eq!(
        store.get_config("user-2", "theme").await.unwrap(),
        Some(serde_json::json!("light"))
    );
}

#[tokio::test]
async fn flush_now_persists_immediately_and_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");

    {
        let store = FileMetadataStore::open(path.clone()).unwrap();
        store.put_session(sample_session("a")).await.unwrap();
        store.flush_now().await.unwrap();
    }

    let reopened = FileMetadataStore::open(path).unwrap();
    assert!(reopened.get_session("a").await.unwrap().is_some());
}
