use super::*;

#[test]
fn append_then_flush_then_reopen_replays_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let log = RichEventLog::open(dir.path(), "sess-1").unwrap();
    log.append(serde_json::json!({"type": "system", "subtype": "init"}));
    log.append(serde_json::json!({"type": "result", "ok": true}));
    log.flush_now().unwrap();

    let reopened = RichEventLog::open(dir.path(), "sess-1").unwrap();
    let events = reopened.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0]["type"], "system");
    assert_eq!(events[1]["type"], "result");
}

#[test]
fn open_on_missing_file_starts_empty() {
    let dir = tempfile::tempdir().unwrap();
    let log = RichEventLog::open(dir.path(), "nonexistent").unwrap();
    assert!(log.events().is_empty());
}

#[test]
fn open_tolerates_truncated_trailing_line() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sess-2.jsonl");
    std::fs::write(&path, "{\"type\":\"a\"}\n{\"type\":\"b\"}\n{\"type\":\"trunc").unwrap();

    let log = RichEventLog::open(dir.path(), "sess-2").unwrap();
    let events = log.events();
    assert_eq!(events.len(), 2);
}

#[test]
fn delete_removes_file() {
    let dir = tempfile::tempdir().unwrap();
    let log = RichEventLog::open(dir.path(), "sess-3").unwrap();
    log.append(serde_json::json!({"type": "x"}));
    log.flush_now().unwrap();
    assert!(dir.path().join("sess-3.jsonl").exists());

    log.delete().unwrap();
    assert!(!dir.path().join("sess-3.jsonl").exists());
}

#[tokio::test]
async fn debounced_flush_eventually_persists() {
    let dir = tempfile::tempdir().unwrap();
    let log = Arc::new(RichEventLog::open(dir.path(), "sess-4").unwrap());
    log.spawn_flush_task();

    log.append(serde_json::json!({"type": "a"}));
    tokio::time::sleep(FLUSH_DEBOUNCE + Duration::from_millis(200)).await;

    let reopened = RichEventLog::open(dir.path(), "sess-4").unwrap();
    assert_eq!(reopened.events().len(), 1);
}
