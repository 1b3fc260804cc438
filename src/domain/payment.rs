use {
    super::error::PaymentError,
    super::id::{OrderId, TransId},
    super::money::Amount,
    super::order::OrderStatus,
    serde::{Deserialize, Serialize},
    std::fmt,
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Vnpay,
    Momo,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vnpay => "vnpay",
            Self::Momo => "momo",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for Provider {
    type Error = PaymentError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "vnpay" => Ok(Self::Vnpay),
            "momo" => Ok(Self::Momo),
            other => Err(PaymentError::Validation(format!(
                "unknown provider: {other}"
            ))),
        }
    }
}

/// Provider result code, normalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentOutcome {
    Success,
    Failure,
    /// Provider has not settled yet (MoMo 1000/7000/7002/9000).
    Pending,
}

impl PaymentOutcome {
    pub fn from_vnpay(response_code: &str, transaction_status: Option<&str>) -> Self {
        match (response_code, transaction_status) {
            ("00", None | Some("00")) => Self::Success,
            _ => Self::Failure,
        }
    }

    pub fn from_momo(result_code: i64) -> Self {
        match result_code {
            0 => Self::Success,
            1000 | 7000 | 7002 | 9000 => Self::Pending,
            _ => Self::Failure,
        }
    }

    pub fn target_status(&self) -> Option<OrderStatus> {
        match self {
            Self::Success => Some(OrderStatus::Paid),
            Self::Failure => Some(OrderStatus::Failed),
            Self::Pending => None,
        }
    }
}

/// Checkout parameters. Built once, then signed by reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentRequest {
    pub provider: Provider,
    pub order_id: OrderId,
    pub amount: Amount,
    pub order_info: String,
    pub return_url: String,
    pub notify_url: String,
    pub request_id: String,
    pub extra_data: String,
}

/// A verified provider notification (redirect or IPN). Never persisted as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentCallback {
    pub provider: Provider,
    pub order_id: OrderId,
    pub trans_id: TransId,
    pub result_code: String,
    pub outcome: PaymentOutcome,
    pub amount: Amount,
    pub message: String,
    pub response_time: String,
    pub signature: String,
    pub source_ip: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// This delivery moved the order.
    Applied(OrderStatus),
    /// Order already reflects this transaction. No side effects.
    Duplicate(OrderStatus),
    /// Provider reports an unsettled payment; order untouched.
    StillPending,
    /// Nothing to do (e.g. a failure notice for an order that already expired).
    Ignored(OrderStatus),
}
