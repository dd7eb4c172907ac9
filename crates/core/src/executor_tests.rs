use super::*;

#[test]
fn local_record_is_always_online_and_owned_by_anyone() {
    let local = ExecutorRecord::local(100);
    assert_eq!(local.status, ExecutorStatus::Online);
    assert!(local.is_owned_by("anyone"));
}

#[test]
fn remote_record_requires_matching_owner() {
    let rec = ExecutorRecord {
        id: "e1".into(),
        owner_user_id: "u1".into(),
        name: "workstation".into(),
        labels: Default::default(),
        status: ExecutorStatus::Online,
        last_seen: 0,
        version: None,
    };
    assert!(rec.is_owned_by("u1"));
    assert!(!rec.is_owned_by("u2"));
}
