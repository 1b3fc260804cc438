use {
    crate::domain::{
        error::PaymentError,
        id::OrderId,
        ports::{EnrollmentService, PortFuture},
    },
    sqlx::PgPool,
    uuid::Uuid,
};

/// Grants course access for a paid order. The unique `order_id` makes a
/// repeated call a no-op at the database level too.
#[derive(Clone)]
pub struct PgEnrollmentService {
    pool: PgPool,
}

impl PgEnrollmentService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn grant(&self, order_id: &OrderId) -> Result<(), PaymentError> {
        let result = sqlx::query(
            r#"
            INSERT INTO enrollments (id, order_id, user_id, course_id)
            SELECT $1, o.id, o.user_id, o.course_id
            FROM orders o
            WHERE o.id = $2 AND o.status = 'PAID'
            ON CONFLICT (order_id) DO NOTHING
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(order_id.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            tracing::warn!(order_id = %order_id, "enrollment already present or order not PAID");
        }
        Ok(())
    }
}

impl EnrollmentService for PgEnrollmentService {
    fn grant_access<'a>(&'a self, order_id: &'a OrderId) -> PortFuture<'a, ()> {
        Box::pin(self.grant(order_id))
    }
}
