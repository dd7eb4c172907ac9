use super::*;
use yare::parameterized;

#[parameterized(
    plain = {"alpha", true},
    mixed = {"Alpha-Beta_9", true},
    empty = {"", false},
    space = {"has space", false},
    slash = {"a/b", false},
    dot = {"a.b", false},
    unicode = {"caf\u{e9}", false},
)]
fn name_validity(name: &str, expected: bool) {
    assert_eq!(is_valid_name(name), expected);
}

#[test]
fn name_exactly_at_limit_is_valid() {
    let name = "a".repeat(MAX_NAME_LEN);
    assert!(is_valid_name(&name));
}

#[test]
fn name_over_limit_is_invalid() {
    let name = "a".repeat(MAX_NAME_LEN + 1);
    assert!(!is_valid_name(&name));
}
