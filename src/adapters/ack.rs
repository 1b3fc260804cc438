//! IPN acknowledgments. Providers retry until they get a body of the shape
//! they expect, so every outcome, including internal errors, maps to one.

use {
    crate::domain::{error::PaymentError, payment::ReconcileOutcome},
    serde::Serialize,
};

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct VnpayAck {
    #[serde(rename = "RspCode")]
    pub rsp_code: &'static str,
    #[serde(rename = "Message")]
    pub message: &'static str,
}

impl VnpayAck {
    pub const fn new(rsp_code: &'static str, message: &'static str) -> Self {
        Self { rsp_code, message }
    }

    pub fn from_result(result: &Result<ReconcileOutcome, PaymentError>) -> Self {
        match result {
            Ok(ReconcileOutcome::Duplicate(_)) => Self::new("02", "Order already confirmed"),
            Ok(_) => Self::new("00", "Confirm Success"),
            Err(PaymentError::OrderNotFound(_)) => Self::new("01", "Order not found"),
            Err(PaymentError::OrderStateConflict { .. }) => {
                Self::new("02", "Order already confirmed")
            }
            Err(PaymentError::AmountMismatch { .. }) => Self::new("04", "Invalid amount"),
            Err(PaymentError::InvalidSignature) => Self::new("97", "Invalid signature"),
            Err(_) => Self::new("99", "Unknown error"),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MomoAck {
    #[serde(rename = "resultCode")]
    pub result_code: i32,
    pub message: &'static str,
}

impl MomoAck {
    pub const fn new(result_code: i32, message: &'static str) -> Self {
        Self {
            result_code,
            message,
        }
    }

    pub fn from_result(result: &Result<ReconcileOutcome, PaymentError>) -> Self {
        match result {
            Ok(_) => Self::new(0, "Success"),
            Err(PaymentError::OrderNotFound(_)) => Self::new(1, "Order not found"),
            Err(PaymentError::OrderStateConflict { .. }) => Self::new(2, "Order already confirmed"),
            Err(PaymentError::AmountMismatch { .. }) => Self::new(4, "Invalid amount"),
            Err(PaymentError::InvalidSignature | PaymentError::UnauthorizedSource(_)) => {
                Self::new(97, "Unauthorized")
            }
            Err(_) => Self::new(99, "Unknown error"),
        }
    }
}
