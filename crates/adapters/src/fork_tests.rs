use super::*;
use std::collections::HashMap;

#[tokio::test]
async fn no_hook_and_no_project_dir_passes_source_command_through() {
    let hooks = HashMap::new();
    let ctx = ForkContext {
        source_command: "bash",
        source_cwd: Path::new("/tmp"),
        source_name: "win-1",
        fork_hooks: &hooks,
        agent_project_dir: None,
    };
    let resolved = resolve_forked_command(ctx).await.unwrap();
    assert_eq!(resolved, "bash");
}

#[tokio::test]
async fn hook_script_output_becomes_new_command() {
    let dir = tempfile::tempdir().unwrap();
    let hook_path = dir.path().join("hook.sh");
    tokio::fs::write(
        &hook_path,
        "#!/bin/sh\necho \"claude --resume $SOURCE_SESSION-forked\"\n",
    )
    .await
    .unwrap();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = tokio::fs::metadata(&hook_path).await.unwrap().permissions();
        perms.set_mode(0o755);
        tokio::fs::set_permissions(&hook_path, perms).await.unwrap();
    }

    let mut hooks = HashMap::new();
    hooks.insert("claude".to_string(), hook_path.to_string_lossy().to_string());

    let ctx = ForkContext {
        source_command: "claude",
        source_cwd: dir.path(),
        source_name: "win-1",
        fork_hooks: &hooks,
        agent_project_dir: None,
    };
    let resolved = resolve_forked_command(ctx).await.unwrap();
    assert_eq!(resolved, "claude --resume win-1-forked");
}

#[tokio::test]
async fn listed_hook_with_no_file_on_disk_falls_back_to_builtin_rule() {
    let mut hooks = HashMap::new();
    hooks.insert("claude".to_string(), "/nonexistent/hook.sh".to_string());

    let ctx = ForkContext {
        source_command: "claude",
        source_cwd: Path::new("/tmp"),
        source_name: "win-1",
        fork_hooks: &hooks,
        agent_project_dir: None,
    };
    // token is registered but the hook binary isn't on disk; this must not
    // be treated as a hard failure, it should fall through to the
    // built-in rule (and, with no project dir to poll, pass the source
    // command through unchanged).
    let resolved = resolve_forked_command(ctx).await.unwrap();
    assert_eq!(resolved, "claude");
}

#[tokio::test]
async fn missing_project_dir_falls_back_to_source_command() {
    let hooks = HashMap::new();
    let ctx = ForkContext {
        source_command: "claude",
        source_cwd: Path::new("/tmp"),
        source_name: "win-1",
        fork_hooks: &hooks,
        agent_project_dir: Some(Path::new("/nonexistent/does/not/exist")),
    };
    let resolved = resolve_forked_command(ctx).await.unwrap();
    assert_eq!(resolved, "claude");
}
