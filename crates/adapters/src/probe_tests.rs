use super::*;

#[test]
fn parses_plain_json() {
    let parsed = parse_probe_output(r#"{"summary": "all good", "needsAttention": false}"#).unwrap();
    assert_eq!(parsed.summary, "all good");
    assert!(!parsed.needs_attention);
}

#[test]
fn parses_fenced_json_with_leading_prose() {
    let text = "Here is my analysis:\n```json\n{\"summary\": \"build failed\", \"needsAttention\": true}\n```\n";
    let parsed = parse_probe_output(text).unwrap();
    assert_eq!(parsed.summary, "build failed");
    assert!(parsed.needs_attention);
}

#[test]
fn missing_needs_attention_defaults_false() {
    let parsed = parse_probe_output(r#"{"summary": "ok"}"#).unwrap();
    assert!(!parsed.needs_attention);
}

#[test]
fn garbage_input_yields_none() {
    assert!(parse_probe_output("not json at all").is_none());
}

#[tokio::test]
async fn probe_never_errors_on_missing_binary() {
    let result = run_probe("/nonexistent/definitely-not-a-binary", "analyze this").await;
    assert_eq!(result, ProbeResult::default());
}
