use super::*;

#[test]
fn gcd_and_lcm_small_values() {
    assert_eq!(gcd(10, 15), 5);
    assert_eq!(gcd(7, 0), 7);
    assert_eq!(lcm_checked(&[10, 15]), Some(30));
    assert_eq!(lcm_checked(&[8, 8, 8]), Some(8));
    assert_eq!(lcm_checked(&[]), Some(1));
}

#[test]
fn lcm_reports_overflow() {
    assert_eq!(lcm_checked(&[u64::MAX, u64::MAX - 1]), None);
}

#[test]
fn round_to_even_rounds_odd_up() {
    assert_eq!(round_to_even(1), 2);
    assert_eq!(round_to_even(10), 10);
    assert_eq!(round_to_even(15), 16);
    assert_eq!(round_to_even(u32::MAX), u32::MAX);
}

#[test]
fn fnv_is_order_sensitive_and_stable() {
    let mut a = Fnv1a64::new_default();
    a.write_str("ab");
    a.write_str("c");
    let mut b = Fnv1a64::new_default();
    b.write_str("a");
    b.write_str("bc");
    assert_ne!(a.finish(), b.finish());

    let mut c = Fnv1a64::new_default();
    c.write_str("ab");
    c.write_str("c");
    assert_eq!(a.finish(), c.finish());
}
