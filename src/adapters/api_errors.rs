use crate::domain::error::PaymentError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// HTTP rendering of `PaymentError` for the non-webhook routes. IPN handlers
/// answer with provider acknowledgments instead.
pub struct ApiError(pub PaymentError);

impl From<PaymentError> for ApiError {
    fn from(err: PaymentError) -> Self {
        Self(err)
    }
}

fn internal() -> (StatusCode, &'static str, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "internal_error",
        "internal error".to_string(),
    )
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match &self.0 {
            PaymentError::Validation(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "validation_error",
                msg.clone(),
            ),
            PaymentError::InvalidSignature => (
                StatusCode::BAD_REQUEST,
                "invalid_signature",
                "invalid signature".to_string(),
            ),
            PaymentError::UnauthorizedSource(_) => (
                StatusCode::FORBIDDEN,
                "unauthorized_source",
                "source not allowed".to_string(),
            ),
            PaymentError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "admin credential required".to_string(),
            ),
            PaymentError::OrderNotFound(id) => (
                StatusCode::NOT_FOUND,
                "order_not_found",
                format!("order {id} not found"),
            ),
            PaymentError::OrderStateConflict { order_id, current } => (
                StatusCode::CONFLICT,
                "order_state_conflict",
                format!("order {order_id} is {current}"),
            ),
            PaymentError::AmountMismatch { .. } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "amount_mismatch",
                "amount does not match order".to_string(),
            ),
            PaymentError::ProviderTimeout(err) => {
                tracing::error!("provider timeout: {err}");
                (
                    StatusCode::GATEWAY_TIMEOUT,
                    "provider_timeout",
                    "payment provider did not respond".to_string(),
                )
            }
            PaymentError::Provider(err) => {
                tracing::error!("provider error: {err}");
                (
                    StatusCode::BAD_GATEWAY,
                    "provider_error",
                    "payment provider rejected the request".to_string(),
                )
            }
            PaymentError::Configuration(err) => {
                tracing::error!("configuration error: {err}");
                internal()
            }
            PaymentError::Database(err) => {
                tracing::error!("database error: {err}");
                internal()
            }
            PaymentError::Serialization(err) => {
                tracing::error!("serialization error: {err}");
                internal()
            }
        };

        let body = serde_json::json!({
            "error_code": error_code,
            "message": message,
        });

        (status, Json(body)).into_response()
    }
}
