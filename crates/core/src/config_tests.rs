use super::*;

#[test]
fn reserved_keys_recognized() {
    assert!(is_reserved_key("forkHooks"));
    assert!(!is_reserved_key("somethingCustom"));
}

#[test]
fn empty_fork_hooks_parses_to_empty_map() {
    let map = parse_fork_hooks("").unwrap();
    assert!(map.is_empty());
}

#[test]
fn fork_hooks_parses_base_command_map() {
    let map = parse_fork_hooks(r#"{"claude": "/home/u/.claude-host/hooks/claude.sh"}"#).unwrap();
    assert_eq!(
        map.get("claude").map(String::as_str),
        Some("/home/u/.claude-host/hooks/claude.sh")
    );
}
