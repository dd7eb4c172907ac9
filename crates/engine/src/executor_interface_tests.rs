use super::*;
use chost_adapters::FakeTmuxRunner;

fn local_executor() -> (LocalExecutor, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let runner: Arc<dyn TmuxRunner> = Arc::new(FakeTmuxRunner::new());
    let bridge = Arc::new(TerminalBridge::new());
    let exec = LocalExecutor::new(runner, bridge, dir.path().to_path_buf());
    (exec, dir)
}

#[tokio::test]
async fn create_session_delegates_to_runner() {
    let (exec, _dir) = local_executor();
    let created = exec
        .create_session("sess-1", std::path::Path::new("/tmp"), "bash", &[])
        .await
        .unwrap();
    assert_eq!(created.name, "sess-1");
}

#[tokio::test]
async fn create_rich_session_registers_an_in_process_bridge() {
    let (exec, _dir) = local_executor();
    exec.create_rich_session("rich-1", std::path::Path::new("/tmp"), "claude")
        .await
        .unwrap();
    assert!(exec.rich_bridge("rich-1").is_some());
}

#[tokio::test]
async fn delete_rich_session_tears_down_bridge_and_log() {
    let (exec, dir) = local_executor();
    exec.create_rich_session("rich-2", std::path::Path::new("/tmp"), "claude")
        .await
        .unwrap();
    exec.delete_rich_session("rich-2").await.unwrap();
    assert!(exec.rich_bridge("rich-2").is_none());
    assert!(!dir.path().join("rich-2.jsonl").exists());
}

#[tokio::test]
async fn snapshot_rich_session_on_unknown_name_reads_disk_and_returns_empty() {
    let (exec, _dir) = local_executor();
    let text = exec.snapshot_rich_session("never-created").await.unwrap();
    assert_eq!(text, "");
}

#[test]
fn render_rich_snapshot_joins_events_with_newlines() {
    let events = vec![serde_json::json!({"a": 1}), serde_json::json!({"b": 2})];
    let text = render_rich_snapshot(&events);
    assert_eq!(text, "{\"a\":1}\n{\"b\":2}");
}
