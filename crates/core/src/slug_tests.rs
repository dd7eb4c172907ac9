use super::*;
use crate::id::SequentialIdGen;
use crate::validate::is_valid_name;

#[test]
fn generated_slug_is_a_valid_session_name() {
    let gen = SequentialIdGen::new("sess");
    let slug = generate_slug(&gen);
    assert!(is_valid_name(&slug));
    assert!(slug.contains('-'));
}

#[test]
fn distinct_ids_usually_produce_distinct_slugs() {
    let gen = SequentialIdGen::new("sess");
    let a = generate_slug(&gen);
    let b = generate_slug(&gen);
    assert_ne!(a, b);
}
