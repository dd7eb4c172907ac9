use super::*;

fn base(mode: Mode, job_prompt: Option<&str>, job_max: Option<u32>) -> Result<Session, HostError> {
    Session::new(
        "alpha",
        "u1",
        LOCAL_EXECUTOR_ID,
        mode,
        "bash",
        "",
        None,
        0,
        job_prompt.map(String::from),
        job_max,
    )
}

#[test]
fn rejects_invalid_name() {
    let err = Session::new(
        "bad name!",
        "u1",
        LOCAL_EXECUTOR_ID,
        Mode::Terminal,
        "bash",
        "",
        None,
        0,
        None,
        None,
    )
    .unwrap_err();
    assert_eq!(err, HostError::InvalidName("bad name!".into()));
}

#[test]
fn rich_session_cannot_carry_job_prompt() {
    let err = base(Mode::Rich, Some("do the thing"), Some(1)).unwrap_err();
    assert!(matches!(err, HostError::InvalidArgument(_)));
}

#[test]
fn job_prompt_requires_positive_max_iterations() {
    let err = base(Mode::Terminal, Some("do the thing"), Some(0)).unwrap_err();
    assert!(matches!(err, HostError::InvalidArgument(_)));
    let err = base(Mode::Terminal, Some("do the thing"), None).unwrap_err();
    assert!(matches!(err, HostError::InvalidArgument(_)));
}

#[test]
fn valid_job_session_constructs() {
    let s = base(Mode::Terminal, Some("do the thing"), Some(3)).unwrap();
    assert!(s.is_job());
    assert_eq!(s.last_activity, s.created_at);
}

#[test]
fn ownership_check() {
    let s = base(Mode::Terminal, None, None).unwrap();
    assert!(s.is_owned_by("u1"));
    assert!(!s.is_owned_by("u2"));
}
