use super::*;
use std::path::PathBuf;

#[test]
fn script_embeds_prompt_path_and_done_token() {
    let script = build_launcher_script(
        &PathBuf::from("/tmp/prompt-1.txt"),
        "claude --resume abc",
        5,
        "{command}",
    );
    assert!(script.contains("/tmp/prompt-1.txt"));
    assert!(script.contains(DONE_TOKEN));
    assert!(script.contains("trap 'cleanup; exit 0' INT TERM"));
    assert!(script.contains("-le 5"));
}

#[test]
fn zero_iterations_floors_to_one() {
    let script = build_launcher_script(&PathBuf::from("/tmp/p"), "claude", 0, "{command}");
    assert!(script.contains("-le 1"));
}

#[test]
fn literal_resume_template_is_used_unmodified() {
    // a complete resume command with no `{command}` placeholder must pass
    // through untouched, rather than being substituted into again — this
    // is how a caller avoids stacking `--session-id` and `--resume` on the
    // same resumed invocation.
    let script = build_launcher_script(
        &PathBuf::from("/tmp/p"),
        "claude --session-id abc123",
        3,
        "claude --resume abc123",
    );
    assert!(script.contains(r#"OUTPUT="$(claude --resume abc123 "continue" 2>&1)""#));
    assert!(!script.contains("--session-id abc123 --resume"));
}

#[test]
fn quoting_escapes_single_quotes_in_path() {
    let script = build_launcher_script(&PathBuf::from("/tmp/o'neil/p.txt"), "claude", 1, "{command}");
    assert!(script.contains(r#"'/tmp/o'\''neil/p.txt'"#));
}
