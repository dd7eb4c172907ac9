use super::*;
use std::collections::BTreeSet;
use tokio::sync::mpsc::unbounded_channel;

fn register_test_executor(registry: &ExecutorRegistry, id: &str) -> mpsc::UnboundedReceiver<Value> {
    let (tx, rx) = unbounded_channel();
    registry.register(id.to_string(), "runner-1".into(), BTreeSet::new(), None, "user-1".into(), 1000, tx);
    rx
}

#[tokio::test]
async fn call_sends_frame_with_id_and_resolves_on_matching_response() {
    let registry = ExecutorRegistry::new();
    let mut rx = register_test_executor(&registry, "exec-1");

    let registry2 = registry.clone();
    let call = tokio::spawn(async move { registry2.call("exec-1", "list_sessions", serde_json::json!({})).await });

    let frame = rx.recv().await.unwrap();
    let id = frame.get("id").and_then(Value::as_str).unwrap().to_string();
    assert_eq!(frame.get("type").and_then(Value::as_str), Some("list_sessions"));

    registry.handle_response(&id, true, Some(serde_json::json!({"ok": true})), None);
    let result = call.await.unwrap().unwrap();
    assert_eq!(result, serde_json::json!({"ok": true}));
}

#[tokio::test]
async fn call_against_unknown_executor_is_offline() {
    let registry = ExecutorRegistry::new();
    let err = registry.call("nope", "list_sessions", serde_json::json!({})).await.unwrap_err();
    assert!(matches!(err, EngineError::ExecutorOffline(_)));
}

#[tokio::test]
async fn unknown_response_id_is_silently_dropped() {
    let registry = ExecutorRegistry::new();
    registry.handle_response("ghost", true, None, None);
}

#[tokio::test]
async fn disconnect_fails_pending_rpcs_for_that_executor() {
    let registry = ExecutorRegistry::new();
    let mut rx = register_test_executor(&registry, "exec-2");

    let registry2 = registry.clone();
    let call = tokio::spawn(async move { registry2.call("exec-2", "list_sessions", serde_json::json!({})).await });
    let _frame = rx.recv().await.unwrap();

    registry.disconnect("exec-2", "disconnected");
    let err = call.await.unwrap().unwrap_err();
    assert!(matches!(err, EngineError::ExecutorOffline(_)));

    // the record survives disconnect, marked offline, so callers can still
    // tell when it was last seen rather than it vanishing outright
    let info = registry.info("exec-2").unwrap();
    assert_eq!(info.status, chost_core::ExecutorStatus::Offline);
}

#[tokio::test]
async fn disconnect_of_unknown_executor_is_a_no_op() {
    let registry = ExecutorRegistry::new();
    registry.disconnect("ghost", "timed_out");
    assert!(registry.info("ghost").is_none());
}

#[tokio::test]
async fn terminal_channel_resolves_waiter() {
    let registry = ExecutorRegistry::new();
    let registry2 = registry.clone();
    let waiter = tokio::spawn(async move { registry2.wait_for_terminal_channel("chan-1").await });

    tokio::time::sleep(Duration::from_millis(20)).await;
    let (tx, _rx) = unbounded_channel();
    registry.resolve_terminal_channel("chan-1", tx).unwrap();

    assert!(waiter.await.unwrap().is_ok());
}

#[test]
fn resolve_terminal_channel_without_waiter_is_not_found() {
    let registry = ExecutorRegistry::new();
    let (tx, _rx) = unbounded_channel();
    let err = registry.resolve_terminal_channel("orphan", tx).unwrap_err();
    assert!(matches!(err, EngineError::Host(chost_core::HostError::NotFound(_))));
}

#[test]
fn heartbeat_updates_last_seen_and_sessions() {
    let registry = ExecutorRegistry::new();
    let _rx = register_test_executor(&registry, "exec-3");
    registry.heartbeat(
        "exec-3",
        vec![SessionLiveness { name: "s1".into(), alive: true, last_activity: 42 }],
        2000,
    );
    let info = registry.info("exec-3").unwrap();
    assert_eq!(info.last_seen, 2000);
    assert_eq!(registry.sessions("exec-3").len(), 1);
}
