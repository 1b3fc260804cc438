use {
    super::audit_repo::insert_audit_entry,
    crate::domain::{
        audit::NewAuditEntry,
        error::PaymentError,
        id::{OrderId, TransId},
        money::Amount,
        order::{Order, OrderStatus, TransitionMeta},
        payment::Provider,
        ports::{OrderStore, PortFuture},
    },
    chrono::{DateTime, Utc},
    sqlx::PgPool,
};

/// Reads and conditionally updates the `orders` table owned by order
/// management. Never writes an order outside `try_transition` and the
/// fulfillment flag.
#[derive(Clone)]
pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: String,
    amount: i64,
    status: String,
    provider: Option<String>,
    trans_id: Option<String>,
    paid_amount: Option<i64>,
    fulfilled_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = PaymentError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        Ok(Order {
            id: OrderId::new(row.id)?,
            amount: Amount::new(row.amount)?,
            status: OrderStatus::try_from(row.status.as_str())?,
            provider: row
                .provider
                .as_deref()
                .map(Provider::try_from)
                .transpose()?,
            trans_id: row.trans_id.map(TransId::new).transpose()?,
            paid_amount: row.paid_amount.map(Amount::new).transpose()?,
            fulfilled: row.fulfilled_at.is_some(),
            created_at: row.created_at,
            expires_at: row.expires_at,
        })
    }
}

impl PgOrderStore {
    async fn find(&self, id: &OrderId) -> Result<Option<Order>, PaymentError> {
        let row = sqlx::query_as::<_, OrderRow>(
            r#"
            SELECT id, amount, status, provider, trans_id, paid_amount,
                   fulfilled_at, created_at, expires_at
            FROM orders
            WHERE id = $1
            "#,
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Order::try_from).transpose()
    }

    async fn transition(
        &self,
        id: &OrderId,
        from: OrderStatus,
        to: OrderStatus,
        meta: &TransitionMeta,
    ) -> Result<bool, PaymentError> {
        if !from.can_transition_to(&to) {
            return Err(PaymentError::Validation(format!(
                "invalid status transition: {from} → {to}"
            )));
        }

        let mut tx = self.pool.begin().await?;

        sqlx::query("SET LOCAL lock_timeout = '5s'")
            .execute(&mut *tx)
            .await?;

        // The status predicate is the whole concurrency story: whoever
        // updates the row first wins, everyone else sees 0 rows.
        let result = sqlx::query(
            r#"
            UPDATE orders
            SET status = $3,
                provider = COALESCE($4, provider),
                trans_id = COALESCE($5, trans_id),
                paid_amount = COALESCE($6, paid_amount),
                updated_at = now()
            WHERE id = $1 AND status = $2
            "#,
        )
        .bind(id.as_str())
        .bind(from.as_str())
        .bind(to.as_str())
        .bind(meta.provider.map(|p| p.as_str()))
        .bind(meta.trans_id.as_ref().map(|t| t.as_str()))
        .bind(meta.paid_amount.map(|a| a.value()))
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        let audit = NewAuditEntry::order(
            id.as_str(),
            "status_changed",
            &meta.actor,
            meta.audit_detail(from, to),
        );
        insert_audit_entry(&mut tx, &audit).await?;
        tx.commit().await?;
        Ok(true)
    }

    async fn claim(&self, id: &OrderId) -> Result<bool, PaymentError> {
        let result = sqlx::query(
            r#"
            UPDATE orders
            SET fulfilled_at = now(), updated_at = now()
            WHERE id = $1 AND status = 'PAID' AND fulfilled_at IS NULL
            "#,
        )
        .bind(id.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn release(&self, id: &OrderId) -> Result<(), PaymentError> {
        sqlx::query("UPDATE orders SET fulfilled_at = NULL, updated_at = now() WHERE id = $1")
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn overdue(&self, now: DateTime<Utc>, limit: i64) -> Result<Vec<OrderId>, PaymentError> {
        let ids: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT id FROM orders
            WHERE status = 'PENDING' AND expires_at <= $1
            ORDER BY expires_at
            LIMIT $2
            "#,
        )
        .bind(now)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        ids.into_iter().map(OrderId::new).collect()
    }
}

impl OrderStore for PgOrderStore {
    fn find_by_id<'a>(&'a self, id: &'a OrderId) -> PortFuture<'a, Option<Order>> {
        Box::pin(self.find(id))
    }

    fn try_transition<'a>(
        &'a self,
        id: &'a OrderId,
        from: OrderStatus,
        to: OrderStatus,
        meta: &'a TransitionMeta,
    ) -> PortFuture<'a, bool> {
        Box::pin(self.transition(id, from, to, meta))
    }

    fn claim_fulfillment<'a>(&'a self, id: &'a OrderId) -> PortFuture<'a, bool> {
        Box::pin(self.claim(id))
    }

    fn release_fulfillment<'a>(&'a self, id: &'a OrderId) -> PortFuture<'a, ()> {
        Box::pin(self.release(id))
    }

    fn find_expired_pending<'a>(
        &'a self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> PortFuture<'a, Vec<OrderId>> {
        Box::pin(self.overdue(now, limit))
    }
}
