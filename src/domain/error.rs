use {super::order::OrderStatus, thiserror::Error};

#[derive(Debug, Error)]
pub enum PaymentError {
    /// Missing or unusable provider configuration. Fatal at startup.
    #[error("configuration: {0}")]
    Configuration(String),

    #[error("invalid signature")]
    InvalidSignature,

    #[error("unauthorized source: {0}")]
    UnauthorizedSource(String),

    /// Operator route called without a valid admin credential.
    #[error("missing or invalid admin credential")]
    Unauthorized,

    #[error("order not found: {0}")]
    OrderNotFound(String),

    /// The order is terminal and the incoming event does not match it.
    /// Needs manual review (possible double charge or double grant).
    #[error("order {order_id} is {current}, refusing to overwrite")]
    OrderStateConflict {
        order_id: String,
        current: OrderStatus,
    },

    #[error("amount mismatch: expected {expected}, got {actual}")]
    AmountMismatch { expected: i64, actual: i64 },

    #[error("provider timeout: {0}")]
    ProviderTimeout(String),

    #[error("provider: {0}")]
    Provider(String),

    #[error("validation: {0}")]
    Validation(String),

    #[error("database: {0}")]
    Database(#[from] sqlx::Error),

    #[error("serialization: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<reqwest::Error> for PaymentError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return Self::ProviderTimeout(err.to_string());
        }
        if err.is_decode() {
            return Self::Provider(format!("failed to decode provider response: {err}"));
        }
        Self::Provider(err.to_string())
    }
}
