use super::*;

#[test]
fn now_secs_is_a_plausible_unix_timestamp() {
    let t = now_secs();
    // 2020-01-01 and well before any plausible overflow.
    assert!(t > 1_577_836_800);
    assert!(t < 4_102_444_800);
}
