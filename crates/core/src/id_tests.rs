use super::*;

define_id! {
    pub struct TestId;
}

#[test]
fn display_matches_inner_string() {
    let id = TestId::new("abc");
    assert_eq!(id.to_string(), "abc");
    assert_eq!(id.as_str(), "abc");
}

#[test]
fn sequential_gen_is_deterministic_and_unique() {
    let gen = SequentialIdGen::new("sess");
    let a = gen.next();
    let b = gen.next();
    assert_ne!(a, b);
    assert_eq!(a, "sess-1");
    assert_eq!(b, "sess-2");
}

#[test]
fn sequential_next_128_is_32_hex_chars() {
    let gen = SequentialIdGen::default();
    let id = gen.next_128();
    assert_eq!(id.len(), 32);
    assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn uuid_gen_next_128_is_32_hex_chars() {
    let gen = UuidIdGen;
    let id = gen.next_128();
    assert_eq!(id.len(), 32);
    assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
}
