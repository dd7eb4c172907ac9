use super::*;

#[test]
fn base_token_strips_path_and_args() {
    assert_eq!(base_token("/usr/bin/claude --flag"), "claude");
    assert_eq!(base_token("./claude"), "claude");
    assert_eq!(base_token("bash -lc true"), "bash");
    assert_eq!(base_token(""), "");
}

#[test]
fn non_agent_command_is_untouched() {
    let (cmd, id) = prepare_agent_launch("bash", || "deadbeef".into());
    assert_eq!(cmd, "bash");
    assert!(id.is_none());
}

#[test]
fn agent_command_gets_session_id_appended() {
    let (cmd, id) = prepare_agent_launch("claude", || "0123456789abcdef0123456789abcdef".into());
    assert_eq!(cmd, "claude --session-id 0123456789abcdef0123456789abcdef");
    assert_eq!(id.as_deref(), Some("0123456789abcdef0123456789abcdef"));
}
