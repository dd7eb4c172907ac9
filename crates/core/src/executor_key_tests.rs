use super::*;

#[test]
fn generated_token_has_expected_shape() {
    let token = generate_token();
    assert!(token.starts_with(TOKEN_PREFIX));
    assert!(looks_like_token(&token));
}

#[test]
fn hash_is_deterministic_and_sensitive() {
    let a = hash_token("chk_aaaa");
    let b = hash_token("chk_aaaa");
    let c = hash_token("chk_bbbb");
    assert_eq!(a, b);
    assert_ne!(a, c);
}

#[test]
fn display_prefix_is_first_8_hex_of_secret() {
    let token = format!("{TOKEN_PREFIX}{}", "0".repeat(64));
    assert_eq!(display_prefix(&token), "00000000");
}

#[test]
fn constant_time_eq_matches_normal_equality() {
    assert!(constant_time_eq("abc", "abc"));
    assert!(!constant_time_eq("abc", "abd"));
    assert!(!constant_time_eq("abc", "abcd"));
}

#[test]
fn all_zero_token_does_not_validate_against_a_real_hash() {
    let zeros = format!("{TOKEN_PREFIX}{}", "0".repeat(64));
    assert!(looks_like_token(&zeros));
    let real = generate_token();
    assert_ne!(hash_token(&zeros), hash_token(&real));
}

#[test]
fn usability_respects_revocation_and_expiry() {
    let mut key = ExecutorKey {
        id: "k1".into(),
        owner_user_id: "u1".into(),
        name: "laptop".into(),
        key_hash: hash_token("chk_whatever"),
        key_prefix: "whatever".into(),
        created_at: 0,
        expires_at: Some(100),
        last_used: None,
        revoked: false,
    };
    assert!(key.is_usable_at(50));
    assert!(!key.is_usable_at(150));
    key.expires_at = None;
    assert!(key.is_usable_at(150));
    key.revoked = true;
    assert!(!key.is_usable_at(50));
}
