use super::checkout::{StartRequest, StartedTransaction};
use super::order::{OrderAggregate, OrderState, Transition};
use super::payment::PaymentRecord;
use super::status::TransactionSnapshot;
use crate::error::{ProviderError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A payment method enabled on the merchant's provider account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMethod {
    pub id: String,
    pub name: String,
}

/// Authenticated access to the payment provider.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    async fn start_transaction(
        &self,
        request: StartRequest,
    ) -> std::result::Result<StartedTransaction, ProviderError>;

    async fn fetch_transaction(
        &self,
        remote_id: &str,
    ) -> std::result::Result<TransactionSnapshot, ProviderError>;

    async fn list_payment_methods(&self) -> std::result::Result<Vec<PaymentMethod>, ProviderError>;
}

#[async_trait]
pub trait PaymentStore: Send + Sync {
    async fn store(&self, payment: PaymentRecord) -> Result<()>;
    async fn get(&self, payment_id: u64) -> Result<Option<PaymentRecord>>;
    async fn get_by_remote_id(&self, remote_id: &str) -> Result<Option<PaymentRecord>>;
    async fn get_all(&self) -> Result<Vec<PaymentRecord>>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn store(&self, order: OrderAggregate) -> Result<()>;
    async fn get(&self, order_id: u64) -> Result<Option<OrderAggregate>>;

    /// Applies `transition` if the stored order still has `expected_version`.
    ///
    /// Fails with `VersionConflict` when the order changed since it was read
    /// and with `TransitionUnavailable` when the transition is not legal from
    /// the stored state.
    async fn apply_transition(
        &self,
        order_id: u64,
        transition: Transition,
        expected_version: u64,
    ) -> Result<OrderState>;
}

pub type ProviderClientBox = Box<dyn ProviderClient>;
pub type PaymentStoreBox = Box<dyn PaymentStore>;
pub type OrderStoreBox = Box<dyn OrderStore>;
