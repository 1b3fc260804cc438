use {
    super::error::PaymentError,
    super::id::{OrderId, TransId},
    super::money::Amount,
    super::payment::Provider,
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
    std::fmt,
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Paid,
    Expired,
    Refunded,
    Failed,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Paid => "PAID",
            Self::Expired => "EXPIRED",
            Self::Refunded => "REFUNDED",
            Self::Failed => "FAILED",
        }
    }

    /// Terminal for payment callbacks. PAID can still move to REFUNDED, but
    /// never through a callback.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    pub fn can_transition_to(&self, next: &OrderStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Paid)
                | (Self::Pending, Self::Failed)
                | (Self::Pending, Self::Expired)
                | (Self::Paid, Self::Refunded)
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for OrderStatus {
    type Error = PaymentError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "PAID" => Ok(Self::Paid),
            "EXPIRED" => Ok(Self::Expired),
            "REFUNDED" => Ok(Self::Refunded),
            "FAILED" => Ok(Self::Failed),
            other => Err(PaymentError::Validation(format!(
                "unknown order status: {other}"
            ))),
        }
    }
}

/// Order as seen by the payment core. Owned by order management.
#[derive(Debug, Clone, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub amount: Amount,
    pub status: OrderStatus,
    pub provider: Option<Provider>,
    pub trans_id: Option<TransId>,
    pub paid_amount: Option<Amount>,
    /// Downstream effects (enrollment) have been applied.
    pub fulfilled: bool,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Order {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// What gets written alongside a status change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransitionMeta {
    pub provider: Option<Provider>,
    pub trans_id: Option<TransId>,
    pub paid_amount: Option<Amount>,
    pub result_code: Option<String>,
    /// Provider reference for this transition itself, e.g. a refund id.
    pub reference: Option<String>,
    pub actor: String,
}

impl TransitionMeta {
    pub fn expiry(actor: &str) -> Self {
        Self {
            actor: actor.to_string(),
            ..Self::default()
        }
    }

    pub fn audit_detail(&self, from: OrderStatus, to: OrderStatus) -> serde_json::Value {
        serde_json::json!({
            "old_status": from.as_str(),
            "new_status": to.as_str(),
            "provider": self.provider.map(|p| p.as_str()),
            "trans_id": self.trans_id.as_ref().map(|t| t.as_str()),
            "paid_amount": self.paid_amount.map(|a| a.value()),
            "result_code": self.result_code,
            "reference": self.reference,
            "actor": self.actor,
        })
    }
}
