use super::*;

#[tokio::test]
async fn create_window_rejects_duplicate_name() {
    let runner = FakeTmuxRunner::new();
    runner
        .create_window("a", Path::new("/tmp"), "bash", &[])
        .await
        .unwrap();
    let err = runner
        .create_window("a", Path::new("/tmp"), "bash", &[])
        .await
        .unwrap_err();
    assert!(matches!(err, AdapterError::AlreadyExists(_)));
}

#[tokio::test]
async fn create_window_with_agent_command_assigns_session_id() {
    let runner = FakeTmuxRunner::new();
    let created = runner
        .create_window("a", Path::new("/tmp"), "claude", &[])
        .await
        .unwrap();
    assert!(created.agent_session_id.is_some());
    let stored = runner.pane_command("a").await.unwrap();
    assert!(stored.starts_with("claude --session-id"));
}

#[tokio::test]
async fn delete_then_list_no_longer_shows_window() {
    let runner = FakeTmuxRunner::new();
    runner
        .create_window("a", Path::new("/tmp"), "bash", &[])
        .await
        .unwrap();
    runner.delete_window("a").await.unwrap();
    assert!(runner.list_windows().await.unwrap().is_empty());
}

#[tokio::test]
async fn capture_pane_returns_requested_tail() {
    let runner = FakeTmuxRunner::new();
    runner
        .create_window("a", Path::new("/tmp"), "bash", &[])
        .await
        .unwrap();
    runner.set_pane("a", "line1\nline2\nline3");
    let captured = runner.capture_pane("a", 2).await.unwrap();
    assert_eq!(captured, "line2\nline3");
}

#[tokio::test]
async fn kill_silently_marks_dead_without_removing() {
    let runner = FakeTmuxRunner::new();
    runner
        .create_window("a", Path::new("/tmp"), "bash", &[])
        .await
        .unwrap();
    runner.kill_silently("a");
    let windows = runner.list_windows().await.unwrap();
    assert_eq!(windows.len(), 1);
    assert!(!windows[0].alive);
}

#[tokio::test]
async fn fork_window_uses_hook_override() {
    let runner = FakeTmuxRunner::new();
    runner
        .create_window("src", Path::new("/tmp"), "claude", &[])
        .await
        .unwrap();
    let mut hooks = std::collections::HashMap::new();
    hooks.insert("claude".to_string(), "claude --resume forked-id".to_string());
    let request = ForkRequest {
        source_name: "src".to_string(),
        new_name: "fork-1".to_string(),
        fork_hooks: hooks,
    };
    runner.fork_window(request).await.unwrap();
    let command = runner.pane_command("fork-1").await.unwrap();
    assert_eq!(command, "claude --resume forked-id");
}
