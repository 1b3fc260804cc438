use {
    super::error::PaymentError,
    serde::{Deserialize, Serialize},
    std::fmt,
};

/// VNPay transmits amounts multiplied by this factor.
pub const VNPAY_AMOUNT_FACTOR: i64 = 100;

/// Amount in the smallest currency unit (VND has no minor unit).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Amount(i64);

impl Amount {
    pub fn new(value: i64) -> Result<Self, PaymentError> {
        if value < 0 {
            return Err(PaymentError::Validation(format!(
                "Amount cannot be negative, got: {value}"
            )));
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> i64 {
        self.0
    }

    /// Parse a decimal integer string. Rejects signs, decimals and exponents.
    pub fn parse(s: &str) -> Result<Self, PaymentError> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(PaymentError::Validation(format!("invalid amount: {s:?}")));
        }
        let value: i64 = s
            .parse()
            .map_err(|_| PaymentError::Validation(format!("amount out of range: {s}")))?;
        Self::new(value)
    }

    /// `vnp_Amount` representation.
    pub fn to_vnpay(&self) -> Result<i64, PaymentError> {
        self.0
            .checked_mul(VNPAY_AMOUNT_FACTOR)
            .ok_or_else(|| PaymentError::Validation(format!("amount too large: {}", self.0)))
    }

    pub fn from_vnpay(s: &str) -> Result<Self, PaymentError> {
        let raw = Self::parse(s)?;
        if raw.0 % VNPAY_AMOUNT_FACTOR != 0 {
            return Err(PaymentError::Validation(format!(
                "vnp_Amount must be a multiple of {VNPAY_AMOUNT_FACTOR}, got: {s}"
            )));
        }
        Ok(Self(raw.0 / VNPAY_AMOUNT_FACTOR))
    }
}

impl TryFrom<i64> for Amount {
    type Error = PaymentError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for i64 {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_rejected() {
        assert!(Amount::new(-1).is_err());
    }

    #[test]
    fn parse_rejects_non_integers() {
        assert!(Amount::parse("100.5").is_err());
        assert!(Amount::parse("1e5").is_err());
        assert!(Amount::parse("-5").is_err());
        assert!(Amount::parse("").is_err());
        assert_eq!(Amount::parse("0050000").unwrap().value(), 50000);
    }

    #[test]
    fn vnpay_factor_is_exact() {
        let a = Amount::new(100_000).unwrap();
        assert_eq!(a.to_vnpay().unwrap(), 10_000_000);
        assert_eq!(Amount::from_vnpay("10000000").unwrap(), a);
        assert!(Amount::from_vnpay("10000050").is_err());
    }

    #[test]
    fn vnpay_overflow_is_an_error() {
        assert!(Amount::new(i64::MAX).unwrap().to_vnpay().is_err());
    }
}
