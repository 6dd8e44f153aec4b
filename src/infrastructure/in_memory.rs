use crate::domain::order::{OrderAggregate, OrderState, Transition};
use crate::domain::payment::PaymentRecord;
use crate::domain::ports::{OrderStore, PaymentStore};
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A thread-safe in-memory store for payment records.
///
/// Payments are keyed by id with a secondary index on the remote
/// transaction id. `Clone` shares the underlying maps.
#[derive(Default, Clone)]
pub struct InMemoryPaymentStore {
    inner: Arc<RwLock<PaymentTables>>,
}

#[derive(Default)]
struct PaymentTables {
    payments: HashMap<u64, PaymentRecord>,
    by_remote_id: HashMap<String, u64>,
}

impl InMemoryPaymentStore {
    /// Creates a new, empty in-memory payment store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a payment, for fixtures and tests.
    pub async fn insert(&self, payment: PaymentRecord) {
        let mut tables = self.inner.write().await;
        tables
            .by_remote_id
            .insert(payment.remote_id.clone(), payment.id);
        tables.payments.insert(payment.id, payment);
    }
}

#[async_trait]
impl PaymentStore for InMemoryPaymentStore {
    async fn store(&self, payment: PaymentRecord) -> Result<()> {
        let mut tables = self.inner.write().await;
        if let Some(existing) = tables.payments.get(&payment.id)
            && !existing.remote_id.is_empty()
            && existing.remote_id != payment.remote_id
        {
            return Err(PaymentError::ValidationError(format!(
                "Remote id of payment {} cannot change",
                payment.id
            )));
        }
        tables
            .by_remote_id
            .insert(payment.remote_id.clone(), payment.id);
        tables.payments.insert(payment.id, payment);
        Ok(())
    }

    async fn get(&self, payment_id: u64) -> Result<Option<PaymentRecord>> {
        let tables = self.inner.read().await;
        Ok(tables.payments.get(&payment_id).cloned())
    }

    async fn get_by_remote_id(&self, remote_id: &str) -> Result<Option<PaymentRecord>> {
        let tables = self.inner.read().await;
        Ok(tables
            .by_remote_id
            .get(remote_id)
            .and_then(|id| tables.payments.get(id))
            .cloned())
    }

    async fn get_all(&self) -> Result<Vec<PaymentRecord>> {
        let tables = self.inner.read().await;
        let mut payments: Vec<PaymentRecord> = tables.payments.values().cloned().collect();
        payments.sort_by_key(|p| p.id);
        Ok(payments)
    }
}

/// A thread-safe in-memory store for orders.
///
/// Transitions are checked and applied under the write lock, which makes the
/// version comparison atomic.
#[derive(Default, Clone)]
pub struct InMemoryOrderStore {
    orders: Arc<RwLock<HashMap<u64, OrderAggregate>>>,
}

impl InMemoryOrderStore {
    /// Creates a new, empty in-memory order store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds an order, for fixtures and tests.
    pub async fn insert(&self, order: OrderAggregate) {
        self.orders.write().await.insert(order.id, order);
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn store(&self, order: OrderAggregate) -> Result<()> {
        let mut orders = self.orders.write().await;
        orders.insert(order.id, order);
        Ok(())
    }

    async fn get(&self, order_id: u64) -> Result<Option<OrderAggregate>> {
        let orders = self.orders.read().await;
        Ok(orders.get(&order_id).cloned())
    }

    async fn apply_transition(
        &self,
        order_id: u64,
        transition: Transition,
        expected_version: u64,
    ) -> Result<OrderState> {
        let mut orders = self.orders.write().await;
        let order = orders
            .get_mut(&order_id)
            .ok_or(PaymentError::UnknownOrder(order_id))?;
        if order.version != expected_version {
            return Err(PaymentError::VersionConflict {
                order_id,
                expected: expected_version,
            });
        }
        Ok(order.apply(transition)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::status::{LocalStatus, Money};
    use crate::error::WorkflowError;
    use rust_decimal_macros::dec;

    fn payment(id: u64, remote_id: &str) -> PaymentRecord {
        PaymentRecord::new(id, 1, remote_id, Money::new(dec!(10.00), "EUR"))
    }

    #[tokio::test]
    async fn test_in_memory_payment_store() {
        let store = InMemoryPaymentStore::new();
        let mut record = payment(1, "tx-1");

        store.store(record.clone()).await.unwrap();
        assert_eq!(store.get(1).await.unwrap().unwrap(), record);
        assert_eq!(store.get_by_remote_id("tx-1").await.unwrap().unwrap(), record);
        assert!(store.get_by_remote_id("tx-2").await.unwrap().is_none());

        record.status = LocalStatus::Complete;
        store.store(record.clone()).await.unwrap();
        let all = store.get_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].status, LocalStatus::Complete);
    }

    #[tokio::test]
    async fn test_remote_id_is_immutable() {
        let store = InMemoryPaymentStore::new();
        store.store(payment(1, "tx-1")).await.unwrap();

        let result = store.store(payment(1, "tx-other")).await;
        assert!(matches!(result, Err(PaymentError::ValidationError(_))));
        assert!(store.get_by_remote_id("tx-other").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_order_transition_compare_and_swap() {
        let store = InMemoryOrderStore::new();
        store.insert(OrderAggregate::new(1)).await;

        let state = store.apply_transition(1, Transition::Place, 0).await.unwrap();
        assert_eq!(state, OrderState::Placed);

        let stale = store.apply_transition(1, Transition::Cancel, 0).await;
        assert!(matches!(
            stale,
            Err(PaymentError::VersionConflict {
                order_id: 1,
                expected: 0
            })
        ));

        let illegal = store.apply_transition(1, Transition::Place, 1).await;
        assert!(matches!(
            illegal,
            Err(PaymentError::Workflow(WorkflowError::TransitionUnavailable { .. }))
        ));

        let order = store.get(1).await.unwrap().unwrap();
        assert_eq!(order.state, OrderState::Placed);
        assert_eq!(order.version, 1);
    }

    #[tokio::test]
    async fn test_unknown_order() {
        let store = InMemoryOrderStore::new();
        let result = store.apply_transition(5, Transition::Place, 0).await;
        assert!(matches!(result, Err(PaymentError::UnknownOrder(5))));
    }
}
