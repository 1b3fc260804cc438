use {
    super::error::PaymentError,
    super::id::OrderId,
    super::id::TransId,
    super::order::{Order, OrderStatus, TransitionMeta},
    chrono::{DateTime, Utc},
    std::{future::Future, pin::Pin},
};

pub type PortFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, PaymentError>> + Send + 'a>>;

/// Narrow view of the order-management subsystem. Implementations must make
/// `try_transition` and `claim_fulfillment` atomic conditional updates.
pub trait OrderStore: Send + Sync {
    fn find_by_id<'a>(&'a self, id: &'a OrderId) -> PortFuture<'a, Option<Order>>;

    /// Move `id` from `from` to `to` only if it is currently in `from`.
    /// Returns `false` when another writer got there first.
    fn try_transition<'a>(
        &'a self,
        id: &'a OrderId,
        from: OrderStatus,
        to: OrderStatus,
        meta: &'a TransitionMeta,
    ) -> PortFuture<'a, bool>;

    /// Set the fulfilled flag on a PAID order if it is not already set.
    fn claim_fulfillment<'a>(&'a self, id: &'a OrderId) -> PortFuture<'a, bool>;

    /// Undo a claim after the downstream effect failed, so a retry can run it.
    fn release_fulfillment<'a>(&'a self, id: &'a OrderId) -> PortFuture<'a, ()>;

    fn find_expired_pending<'a>(
        &'a self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> PortFuture<'a, Vec<OrderId>>;
}

pub trait EnrollmentService: Send + Sync {
    fn grant_access<'a>(&'a self, order_id: &'a OrderId) -> PortFuture<'a, ()>;
}

/// Provider-side refund of a settled payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefundReceipt {
    pub refund_trans_id: TransId,
    pub result_code: String,
}

/// Implementations must bound every call with a timeout and must not retry
/// internally; `ProviderTimeout` goes back to the caller.
pub trait RefundGateway: Send + Sync {
    fn refund<'a>(
        &'a self,
        order: &'a Order,
        request_id: &'a str,
    ) -> PortFuture<'a, RefundReceipt>;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
