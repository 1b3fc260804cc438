//! HMAC signing and verification of provider parameter sets.

pub mod canonical;
pub mod keys;

use {
    crate::domain::error::PaymentError,
    canonical::{CanonicalRule, Params},
    hmac::{Hmac, Mac},
    sha2::{Sha256, Sha512},
    std::fmt,
    subtle::ConstantTimeEq,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    /// VNPay `vnp_SecureHash`.
    HmacSha512,
    /// MoMo `signature`.
    HmacSha256,
}

/// Holds one provider secret. Construction fails on an empty secret, so a
/// `Signer` can never produce a signature with an empty key.
#[derive(Clone)]
pub struct Signer {
    algorithm: HashAlgorithm,
    secret: Box<[u8]>,
}

impl fmt::Debug for Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signer")
            .field("algorithm", &self.algorithm)
            .field("secret", &"[redacted]")
            .finish()
    }
}

impl Signer {
    pub fn new(algorithm: HashAlgorithm, secret: &str) -> Result<Self, PaymentError> {
        if secret.trim().is_empty() {
            return Err(PaymentError::Configuration(format!(
                "{algorithm:?} signer requires a non-empty secret"
            )));
        }
        Ok(Self {
            algorithm,
            secret: secret.as_bytes().into(),
        })
    }

    /// Lowercase hex HMAC of `data`.
    pub fn sign_bytes(&self, data: &[u8]) -> String {
        hex::encode(self.mac(data))
    }

    pub fn sign(&self, params: &Params, rule: &CanonicalRule) -> String {
        self.sign_bytes(rule.canonicalize(params).as_bytes())
    }

    /// Recompute and compare. Absent, empty or malformed signatures are a
    /// plain `false`.
    pub fn verify(&self, params: &Params, provided: Option<&str>, rule: &CanonicalRule) -> bool {
        let Some(provided) = provided.map(str::trim).filter(|s| !s.is_empty()) else {
            return false;
        };
        let Ok(provided) = hex::decode(provided) else {
            return false;
        };
        let expected = self.mac(rule.canonicalize(params).as_bytes());
        constant_time_compare(&expected, &provided)
    }

    fn mac(&self, data: &[u8]) -> Vec<u8> {
        match self.algorithm {
            HashAlgorithm::HmacSha512 => {
                let mut mac = Hmac::<Sha512>::new_from_slice(&self.secret)
                    .expect("HMAC accepts any key length");
                mac.update(data);
                mac.finalize().into_bytes().to_vec()
            }
            HashAlgorithm::HmacSha256 => {
                let mut mac = Hmac::<Sha256>::new_from_slice(&self.secret)
                    .expect("HMAC accepts any key length");
                mac.update(data);
                mac.finalize().into_bytes().to_vec()
            }
        }
    }
}

pub(crate) fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}
