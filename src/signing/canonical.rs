use {super::keys::KeyOrder, std::collections::BTreeMap};

/// Raw provider parameters, string to string.
pub type Params = BTreeMap<String, String>;

/// How a parameter set is turned into the exact bytes that get signed.
#[derive(Debug, PartialEq, Eq)]
pub enum CanonicalRule {
    /// VNPay: keys with `prefix`, minus `exclude` and empty values,
    /// form-urlencoded, sorted by encoded key.
    Sorted {
        prefix: &'static str,
        exclude: &'static [&'static str],
    },
    /// MoMo: fixed field order, raw values, missing values as "".
    Ordered(&'static KeyOrder),
}

pub const VNPAY_SORTED: CanonicalRule = CanonicalRule::Sorted {
    prefix: "vnp_",
    exclude: &["vnp_SecureHash", "vnp_SecureHashType"],
};

impl CanonicalRule {
    pub fn canonicalize(&self, params: &Params) -> String {
        match self {
            Self::Sorted { prefix, exclude } => {
                let mut pairs: Vec<(String, String)> = params
                    .iter()
                    .filter(|(k, v)| {
                        k.starts_with(prefix) && !exclude.contains(&k.as_str()) && !v.is_empty()
                    })
                    .map(|(k, v)| (form_encode(k), form_encode(v)))
                    .collect();
                pairs.sort_by(|a, b| a.0.cmp(&b.0));
                join(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            }
            Self::Ordered(order) => join(order.keys.iter().map(|k| {
                let v = params.get(*k).map(String::as_str).unwrap_or("");
                (*k, v)
            })),
        }
    }
}

/// `application/x-www-form-urlencoded` byte serialization: space becomes `+`,
/// only `A-Za-z0-9*-._` pass through.
pub fn form_encode(s: &str) -> String {
    form_urlencoded::byte_serialize(s.as_bytes()).collect()
}

fn join<'a>(pairs: impl Iterator<Item = (&'a str, &'a str)>) -> String {
    let mut out = String::new();
    for (i, (k, v)) in pairs.enumerate() {
        if i > 0 {
            out.push('&');
        }
        out.push_str(k);
        out.push('=');
        out.push_str(v);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signing::keys::{MOMO_IPN, MOMO_REFUND};

    fn params(pairs: &[(&str, &str)]) -> Params {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn vnpay_sorts_and_encodes() {
        let p = params(&[
            ("vnp_OrderInfo", "Thanh toan"),
            ("vnp_Amount", "10000000"),
            ("vnp_ReturnUrl", "https://lms.example.com/payments/vnpay/return?x=1"),
        ]);
        assert_eq!(
            VNPAY_SORTED.canonicalize(&p),
            "vnp_Amount=10000000&vnp_OrderInfo=Thanh+toan\
             &vnp_ReturnUrl=https%3A%2F%2Flms.example.com%2Fpayments%2Fvnpay%2Freturn%3Fx%3D1"
        );
    }

    #[test]
    fn vnpay_drops_hash_fields_foreign_keys_and_empty_values() {
        let p = params(&[
            ("vnp_Amount", "10000000"),
            ("vnp_SecureHash", "abc"),
            ("vnp_SecureHashType", "HmacSHA512"),
            ("vnp_BankTranNo", ""),
            ("utm_source", "mail"),
        ]);
        assert_eq!(VNPAY_SORTED.canonicalize(&p), "vnp_Amount=10000000");
    }

    #[test]
    fn vnpay_encodes_unicode_and_reserved() {
        let p = params(&[("vnp_OrderInfo", "Khóa học #1 & 2")]);
        assert_eq!(
            VNPAY_SORTED.canonicalize(&p),
            "vnp_OrderInfo=Kh%C3%B3a+h%E1%BB%8Dc+%231+%26+2"
        );
    }

    #[test]
    fn momo_uses_fixed_order_not_map_order() {
        let p = params(&[
            ("transId", "42"),
            ("accessKey", "AK"),
            ("amount", "50000"),
            ("description", "hoan tien"),
            ("orderId", "ORD1"),
            ("partnerCode", "MOMO"),
            ("requestId", "R1"),
        ]);
        assert_eq!(
            CanonicalRule::Ordered(&MOMO_REFUND).canonicalize(&p),
            "accessKey=AK&amount=50000&description=hoan tien&orderId=ORD1\
             &partnerCode=MOMO&requestId=R1&transId=42"
        );
    }

    #[test]
    fn momo_missing_values_are_empty() {
        let p = params(&[("amount", "1")]);
        let out = CanonicalRule::Ordered(&MOMO_IPN).canonicalize(&p);
        assert!(out.starts_with("accessKey=&amount=1&extraData=&message="));
        assert!(out.ends_with("&resultCode=&transId="));
    }

    #[test]
    fn output_is_stable_across_calls() {
        let p = params(&[("vnp_B", "2"), ("vnp_A", "1 1")]);
        assert_eq!(VNPAY_SORTED.canonicalize(&p), VNPAY_SORTED.canonicalize(&p));
    }
}
