//! Process-local `OrderStore`. Each operation holds the map lock for its whole
//! read-check-write, which gives the same atomicity as the conditional
//! UPDATE in Postgres.

use {
    crate::domain::{
        error::PaymentError,
        id::OrderId,
        order::{Order, OrderStatus, TransitionMeta},
        ports::{OrderStore, PortFuture},
    },
    chrono::{DateTime, Utc},
    std::{
        collections::HashMap,
        sync::{Mutex, MutexGuard},
    },
};

#[derive(Debug, Clone)]
pub struct TransitionRecord {
    pub order_id: OrderId,
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub meta: TransitionMeta,
}

#[derive(Default)]
pub struct InMemoryOrderStore {
    orders: Mutex<HashMap<OrderId, Order>>,
    history: Mutex<Vec<TransitionRecord>>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, order: Order) {
        self.orders().insert(order.id.clone(), order);
    }

    pub fn get(&self, id: &OrderId) -> Option<Order> {
        self.orders().get(id).cloned()
    }

    /// Every transition that won, in order.
    pub fn history(&self) -> Vec<TransitionRecord> {
        self.history
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn orders(&self) -> MutexGuard<'_, HashMap<OrderId, Order>> {
        self.orders
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn transition(
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
        let mut orders = self.orders();
        let Some(order) = orders.get_mut(id) else {
            return Ok(false);
        };
        if order.status != from {
            return Ok(false);
        }
        order.status = to;
        if let Some(provider) = meta.provider {
            order.provider = Some(provider);
        }
        if let Some(trans_id) = &meta.trans_id {
            order.trans_id = Some(trans_id.clone());
        }
        if let Some(paid) = meta.paid_amount {
            order.paid_amount = Some(paid);
        }
        self.history
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(TransitionRecord {
                order_id: id.clone(),
                from,
                to,
                meta: meta.clone(),
            });
        Ok(true)
    }
}

impl OrderStore for InMemoryOrderStore {
    fn find_by_id<'a>(&'a self, id: &'a OrderId) -> PortFuture<'a, Option<Order>> {
        Box::pin(async move { Ok(self.get(id)) })
    }

    fn try_transition<'a>(
        &'a self,
        id: &'a OrderId,
        from: OrderStatus,
        to: OrderStatus,
        meta: &'a TransitionMeta,
    ) -> PortFuture<'a, bool> {
        Box::pin(async move { self.transition(id, from, to, meta) })
    }

    fn claim_fulfillment<'a>(&'a self, id: &'a OrderId) -> PortFuture<'a, bool> {
        Box::pin(async move {
            let mut orders = self.orders();
            Ok(match orders.get_mut(id) {
                Some(order) if order.status == OrderStatus::Paid && !order.fulfilled => {
                    order.fulfilled = true;
                    true
                }
                _ => false,
            })
        })
    }

    fn release_fulfillment<'a>(&'a self, id: &'a OrderId) -> PortFuture<'a, ()> {
        Box::pin(async move {
            if let Some(order) = self.orders().get_mut(id) {
                order.fulfilled = false;
            }
            Ok(())
        })
    }

    fn find_expired_pending<'a>(
        &'a self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> PortFuture<'a, Vec<OrderId>> {
        Box::pin(async move {
            let orders = self.orders();
            let mut overdue: Vec<&Order> = orders
                .values()
                .filter(|o| o.status == OrderStatus::Pending && o.is_expired_at(now))
                .collect();
            overdue.sort_by_key(|o| o.expires_at);
            Ok(overdue
                .into_iter()
                .take(usize::try_from(limit).unwrap_or(0))
                .map(|o| o.id.clone())
                .collect())
        })
    }
}
