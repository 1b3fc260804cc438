use derive_more::Display;
use serde::{Deserialize, Serialize};

use super::error::PaymentError;

const MAX_ID_LEN: usize = 64;

fn validate(kind: &str, id: &str) -> Result<(), PaymentError> {
    if id.is_empty() || id.len() > MAX_ID_LEN {
        return Err(PaymentError::Validation(format!(
            "{kind} must be 1..={MAX_ID_LEN} characters, got {} characters",
            id.len()
        )));
    }
    if !id
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
    {
        return Err(PaymentError::Validation(format!(
            "{kind} contains invalid characters: {id}"
        )));
    }
    Ok(())
}

/// Local order identifier, sent to providers as `vnp_TxnRef` / `orderId`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OrderId(String);

impl OrderId {
    pub fn new(id: impl Into<String>) -> Result<Self, PaymentError> {
        let id = id.into();
        validate("OrderId", &id)?;
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for OrderId {
    type Error = PaymentError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<OrderId> for String {
    fn from(id: OrderId) -> Self {
        id.0
    }
}

/// Provider-side transaction identifier (`vnp_TransactionNo`, MoMo `transId`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TransId(String);

impl TransId {
    pub fn new(id: impl Into<String>) -> Result<Self, PaymentError> {
        let id = id.into();
        validate("TransId", &id)?;
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for TransId {
    type Error = PaymentError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<TransId> for String {
    fn from(id: TransId) -> Self {
        id.0
    }
}
