use super::*;
use serde::Deserialize;

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct Demo {
    value: u32,
}

#[test]
fn save_then_load_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    save(&path, &Demo { value: 7 }).unwrap();
    let loaded: Option<Demo> = load(&path).unwrap();
    assert_eq!(loaded, Some(Demo { value: 7 }));
}

#[test]
fn load_missing_file_returns_none() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing.json");
    let loaded: Option<Demo> = load(&path).unwrap();
    assert_eq!(loaded, None);
}

#[test]
fn load_corrupt_file_moves_to_bak_and_returns_none() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    std::fs::write(&path, b"not json").unwrap();

    let loaded: Option<Demo> = load(&path).unwrap();
    assert_eq!(loaded, None);
    assert!(path.with_extension("bak").exists());
    assert!(!path.exists());
}

#[test]
fn save_creates_parent_directories() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested/deeper/state.json");
    save(&path, &Demo { value: 1 }).unwrap();
    assert!(path.exists());
}
