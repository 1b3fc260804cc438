mod common;

use common::*;
use lms_pay::adapters::{momo, vnpay};
use lms_pay::domain::error::PaymentError;
use lms_pay::signing::canonical::VNPAY_SORTED;
use lms_pay::webhook::{IpPolicy, WebhookAuthenticator};

fn momo_authenticator(allow: Option<&str>) -> WebhookAuthenticator {
    WebhookAuthenticator::new(
        IpPolicy::parse(allow).unwrap(),
        momo_signer(),
        &momo::IPN_RULE,
    )
}

// ── 1. allow_list_accepts_mapped_ipv4 ──────────────────────────────────────

#[test]
fn allow_list_accepts_mapped_ipv4() {
    let auth = momo_authenticator(Some("203.0.113.5"));
    let n = signed_momo_ipn("ORD1", 4_088_878_653, 0);
    let params = n.to_params(MOMO_ACCESS_KEY);

    auth.authenticate("::ffff:203.0.113.5", &params, Some(&n.signature))
        .unwrap();
    auth.authenticate("203.0.113.5", &params, Some(&n.signature))
        .unwrap();
}

// ── 2. allow_list_rejects_neighbor ─────────────────────────────────────────

#[test]
fn allow_list_rejects_neighbor() {
    let auth = momo_authenticator(Some("203.0.113.5"));
    let n = signed_momo_ipn("ORD1", 4_088_878_653, 0);
    let params = n.to_params(MOMO_ACCESS_KEY);

    let err = auth
        .authenticate("203.0.113.6", &params, Some(&n.signature))
        .unwrap_err();
    assert!(matches!(err, PaymentError::UnauthorizedSource(ip) if ip == "203.0.113.6"));
}

// ── 3. ip_check_runs_before_signature ──────────────────────────────────────

#[test]
fn ip_check_runs_before_signature() {
    let auth = momo_authenticator(Some("203.0.113.5"));
    let n = signed_momo_ipn("ORD1", 1, 0);
    let err = auth
        .authenticate("198.51.100.1", &n.to_params(MOMO_ACCESS_KEY), Some("00"))
        .unwrap_err();
    assert!(matches!(err, PaymentError::UnauthorizedSource(_)));
}

// ── 4. unset_allow_list_denies ─────────────────────────────────────────────

#[test]
fn unset_allow_list_denies() {
    let auth = momo_authenticator(None);
    let n = signed_momo_ipn("ORD1", 1, 0);
    let err = auth
        .authenticate("203.0.113.5", &n.to_params(MOMO_ACCESS_KEY), Some(&n.signature))
        .unwrap_err();
    assert!(matches!(err, PaymentError::UnauthorizedSource(_)));
}

// ── 5. tampered_amount_fails_signature ─────────────────────────────────────

#[test]
fn tampered_amount_fails_signature() {
    let auth = momo_authenticator(Some("*"));
    let mut n = signed_momo_ipn("ORD1", 1, 0);
    n.amount += 1;
    let err = auth
        .authenticate("203.0.113.5", &n.to_params(MOMO_ACCESS_KEY), Some(&n.signature))
        .unwrap_err();
    assert!(matches!(err, PaymentError::InvalidSignature));
}

// ── 6. vnpay_ipn_verifies_and_parses ───────────────────────────────────────

#[test]
fn vnpay_ipn_verifies_and_parses() {
    let auth = WebhookAuthenticator::new(IpPolicy::AllowAll, vnpay_signer(), &VNPAY_SORTED);
    let params = signed_vnpay_ipn("ORD6", "14123456", "00");

    auth.authenticate("10.0.0.1", &params, params.get("vnp_SecureHash").map(String::as_str))
        .unwrap();
    let cb = vnpay::parse_callback(&params, Some("10.0.0.1".into())).unwrap();
    assert_eq!(cb.amount.value(), ORDER_AMOUNT);
    assert_eq!(cb.order_id.as_str(), "ORD6");
}

// ── 7. vnpay_missing_hash_is_invalid ───────────────────────────────────────

#[test]
fn vnpay_missing_hash_is_invalid() {
    let auth = WebhookAuthenticator::new(IpPolicy::AllowAll, vnpay_signer(), &VNPAY_SORTED);
    let mut params = signed_vnpay_ipn("ORD7", "1", "00");
    params.remove("vnp_SecureHash");
    let err = auth.authenticate("10.0.0.1", &params, None).unwrap_err();
    assert!(matches!(err, PaymentError::InvalidSignature));
}
