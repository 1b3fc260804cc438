use {
    crate::domain::{
        error::PaymentError,
        id::OrderId,
        order::{Order, OrderStatus, TransitionMeta},
        payment::{PaymentCallback, PaymentOutcome, ReconcileOutcome},
        ports::{Clock, EnrollmentService, OrderStore},
    },
    std::sync::Arc,
};

const EXPIRY_ACTOR: &str = "reconciler:expiry";

/// Applies verified payment events to orders exactly once.
///
/// Every status change goes through `OrderStore::try_transition`, a
/// conditional update on the current status, so callbacks, retries and the
/// expiration sweep can race on the same order and only one of them wins.
#[derive(Clone)]
pub struct Reconciler {
    store: Arc<dyn OrderStore>,
    enrollment: Arc<dyn EnrollmentService>,
    clock: Arc<dyn Clock>,
}

impl Reconciler {
    pub fn new(
        store: Arc<dyn OrderStore>,
        enrollment: Arc<dyn EnrollmentService>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            enrollment,
            clock,
        }
    }

    pub fn store(&self) -> &Arc<dyn OrderStore> {
        &self.store
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Callers must have verified the callback signature already.
    #[tracing::instrument(
        name = "reconcile",
        skip_all,
        fields(provider = %callback.provider, order_id = %callback.order_id, trans_id = %callback.trans_id)
    )]
    pub async fn reconcile(
        &self,
        callback: &PaymentCallback,
    ) -> Result<ReconcileOutcome, PaymentError> {
        let order = self
            .store
            .find_by_id(&callback.order_id)
            .await?
            .ok_or_else(|| {
                tracing::warn!("callback for unknown order");
                PaymentError::OrderNotFound(callback.order_id.to_string())
            })?;

        if order.status.is_terminal() {
            return self.settle_terminal(&order, callback).await;
        }

        if order.amount != callback.amount {
            tracing::warn!(
                expected = order.amount.value(),
                actual = callback.amount.value(),
                "callback amount does not match order"
            );
            return Err(PaymentError::AmountMismatch {
                expected: order.amount.value(),
                actual: callback.amount.value(),
            });
        }

        let Some(target) = callback.outcome.target_status() else {
            tracing::info!(result_code = %callback.result_code, "provider reports payment still processing");
            return Ok(ReconcileOutcome::StillPending);
        };

        if order.is_expired_at(self.clock.now()) {
            return self.settle_late(&order, callback).await;
        }

        let meta = TransitionMeta {
            provider: Some(callback.provider),
            trans_id: Some(callback.trans_id.clone()),
            paid_amount: Some(callback.amount),
            result_code: Some(callback.result_code.clone()),
            reference: None,
            actor: format!("callback:{}", callback.provider),
        };

        let won = self
            .store
            .try_transition(&order.id, OrderStatus::Pending, target, &meta)
            .await?;

        if !won {
            // Another delivery or the sweep moved the order first.
            let current = self.reload(&order.id).await?;
            return self.settle_terminal(&current, callback).await;
        }

        tracing::info!(status = %target, "order transitioned");
        if target == OrderStatus::Paid {
            self.fulfill(&order.id).await?;
        }
        Ok(ReconcileOutcome::Applied(target))
    }

    /// The order is no longer PENDING. Same transaction means a repeated
    /// delivery; anything else is a conflict left for manual review.
    async fn settle_terminal(
        &self,
        order: &Order,
        callback: &PaymentCallback,
    ) -> Result<ReconcileOutcome, PaymentError> {
        if order.trans_id.as_ref() == Some(&callback.trans_id) {
            tracing::info!(status = %order.status, "duplicate delivery, already applied");
            if order.status == OrderStatus::Paid && !order.fulfilled {
                // An earlier delivery transitioned but its grant failed.
                self.fulfill(&order.id).await?;
            }
            return Ok(ReconcileOutcome::Duplicate(order.status));
        }

        if order.status == OrderStatus::Expired && callback.outcome == PaymentOutcome::Failure {
            tracing::info!("failure notice for expired order, nothing to do");
            return Ok(ReconcileOutcome::Ignored(order.status));
        }

        tracing::error!(
            current = %order.status,
            stored_trans_id = order.trans_id.as_ref().map(|t| t.as_str()).unwrap_or(""),
            outcome = ?callback.outcome,
            "callback conflicts with terminal order, manual review required"
        );
        Err(PaymentError::OrderStateConflict {
            order_id: order.id.to_string(),
            current: order.status,
        })
    }

    /// PENDING but past its window: expire it the same way the sweep would,
    /// then judge the callback against the result.
    async fn settle_late(
        &self,
        order: &Order,
        callback: &PaymentCallback,
    ) -> Result<ReconcileOutcome, PaymentError> {
        let meta = TransitionMeta::expiry(EXPIRY_ACTOR);
        let won = self
            .store
            .try_transition(&order.id, OrderStatus::Pending, OrderStatus::Expired, &meta)
            .await?;
        if won {
            tracing::info!("order expired on late callback");
        }
        let current = self.reload(&order.id).await?;
        self.settle_terminal(&current, callback).await
    }

    async fn fulfill(&self, order_id: &OrderId) -> Result<(), PaymentError> {
        if !self.store.claim_fulfillment(order_id).await? {
            tracing::debug!("fulfillment already claimed");
            return Ok(());
        }
        if let Err(e) = self.enrollment.grant_access(order_id).await {
            tracing::error!(error = %e, "grant_access failed, releasing claim for retry");
            self.store.release_fulfillment(order_id).await?;
            return Err(e);
        }
        tracing::info!("access granted");
        Ok(())
    }

    async fn reload(&self, id: &OrderId) -> Result<Order, PaymentError> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| PaymentError::OrderNotFound(id.to_string()))
    }

    /// One sweep pass: expire PENDING orders past their deadline. Returns how
    /// many this pass actually moved.
    pub async fn expire_overdue(&self, batch: i64) -> Result<u64, PaymentError> {
        let now = self.clock.now();
        let ids = self.store.find_expired_pending(now, batch).await?;
        let meta = TransitionMeta::expiry("sweep:expiry");
        let mut expired = 0;
        for id in ids {
            match self
                .store
                .try_transition(&id, OrderStatus::Pending, OrderStatus::Expired, &meta)
                .await
            {
                Ok(true) => expired += 1,
                Ok(false) => tracing::debug!(order_id = %id, "order left PENDING before sweep"),
                Err(e) => tracing::error!(order_id = %id, error = %e, "failed to expire order"),
            }
        }
        Ok(expired)
    }
}
