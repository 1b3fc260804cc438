use {
    crate::domain::{
        error::PaymentError,
        id::OrderId,
        order::{OrderStatus, TransitionMeta},
        payment::ReconcileOutcome,
        ports::{OrderStore, RefundGateway},
    },
    std::sync::Arc,
};

/// Refunds a PAID order through its provider, then applies PAID→REFUNDED with
/// the same conditional transition the callbacks use.
#[derive(Clone)]
pub struct Refunder {
    store: Arc<dyn OrderStore>,
    gateway: Arc<dyn RefundGateway>,
}

impl Refunder {
    pub fn new(store: Arc<dyn OrderStore>, gateway: Arc<dyn RefundGateway>) -> Self {
        Self { store, gateway }
    }

    /// Request id sent to the provider. Stable per order so a retried refund
    /// is recognized provider-side instead of paying out twice.
    pub fn request_id(order_id: &OrderId) -> String {
        format!("refund-{order_id}")
    }

    #[tracing::instrument(name = "refund", skip_all, fields(order_id = %order_id))]
    pub async fn refund(&self, order_id: &OrderId) -> Result<ReconcileOutcome, PaymentError> {
        let order = self
            .store
            .find_by_id(order_id)
            .await?
            .ok_or_else(|| PaymentError::OrderNotFound(order_id.to_string()))?;

        match order.status {
            OrderStatus::Refunded => {
                tracing::info!("order already refunded");
                return Ok(ReconcileOutcome::Duplicate(OrderStatus::Refunded));
            }
            OrderStatus::Paid => {}
            current => {
                return Err(PaymentError::OrderStateConflict {
                    order_id: order_id.to_string(),
                    current,
                });
            }
        }

        if order.trans_id.is_none() {
            return Err(PaymentError::Validation(format!(
                "order {order_id} is PAID without a provider transaction id"
            )));
        }

        let request_id = Self::request_id(order_id);
        let receipt = self.gateway.refund(&order, &request_id).await?;

        let meta = TransitionMeta {
            provider: order.provider,
            result_code: Some(receipt.result_code.clone()),
            reference: Some(receipt.refund_trans_id.to_string()),
            actor: "refund".to_string(),
            ..TransitionMeta::default()
        };
        let won = self
            .store
            .try_transition(order_id, OrderStatus::Paid, OrderStatus::Refunded, &meta)
            .await?;

        if won {
            tracing::info!(refund_trans_id = %receipt.refund_trans_id, "order refunded");
            return Ok(ReconcileOutcome::Applied(OrderStatus::Refunded));
        }

        let current = self
            .store
            .find_by_id(order_id)
            .await?
            .map(|o| o.status)
            .ok_or_else(|| PaymentError::OrderNotFound(order_id.to_string()))?;
        if current == OrderStatus::Refunded {
            return Ok(ReconcileOutcome::Duplicate(current));
        }
        tracing::error!(%current, "refund settled provider-side but order moved, manual review required");
        Err(PaymentError::OrderStateConflict {
            order_id: order_id.to_string(),
            current,
        })
    }
}
