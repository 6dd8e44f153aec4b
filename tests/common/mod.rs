#![allow(dead_code)]

use async_trait::async_trait;
use payrecon::domain::checkout::{StartRequest, StartedTransaction};
use payrecon::domain::order::OrderAggregate;
use payrecon::domain::payment::PaymentRecord;
use payrecon::domain::ports::{PaymentMethod, ProviderClient};
use payrecon::domain::status::{Money, TransactionSnapshot};
use payrecon::error::ProviderError;
use payrecon::infrastructure::in_memory::{InMemoryOrderStore, InMemoryPaymentStore};
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Scripted provider: returns whatever snapshot was last set for a remote id.
#[derive(Clone, Default)]
pub struct FakeProvider {
    snapshots: Arc<Mutex<HashMap<String, TransactionSnapshot>>>,
    failure: Arc<Mutex<Option<ProviderError>>>,
    methods: Arc<Mutex<Option<Result<Vec<PaymentMethod>, ProviderError>>>>,
    started: Arc<Mutex<Vec<StartRequest>>>,
    fetches: Arc<AtomicUsize>,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, snapshot: TransactionSnapshot) {
        self.snapshots
            .lock()
            .unwrap()
            .insert(snapshot.remote_id.clone(), snapshot);
    }

    pub fn fail_with(&self, error: ProviderError) {
        *self.failure.lock().unwrap() = Some(error);
    }

    pub fn set_methods(&self, methods: Result<Vec<PaymentMethod>, ProviderError>) {
        *self.methods.lock().unwrap() = Some(methods);
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn started(&self) -> Vec<StartRequest> {
        self.started.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProviderClient for FakeProvider {
    async fn start_transaction(
        &self,
        request: StartRequest,
    ) -> Result<StartedTransaction, ProviderError> {
        if let Some(err) = self.failure.lock().unwrap().clone() {
            return Err(err);
        }
        let mut started = self.started.lock().unwrap();
        started.push(request);
        let remote_id = format!("{}X{}", 1_000_000_000 + started.len(), started.len());
        Ok(StartedTransaction {
            redirect_url: format!("https://pay.example/{}", remote_id),
            remote_id,
        })
    }

    async fn fetch_transaction(&self, remote_id: &str) -> Result<TransactionSnapshot, ProviderError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.failure.lock().unwrap().clone() {
            return Err(err);
        }
        self.snapshots
            .lock()
            .unwrap()
            .get(remote_id)
            .cloned()
            .ok_or_else(|| ProviderError::NotFound(remote_id.to_string()))
    }

    async fn list_payment_methods(&self) -> Result<Vec<PaymentMethod>, ProviderError> {
        self.methods
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

pub fn snapshot(remote_id: &str) -> TransactionSnapshot {
    TransactionSnapshot {
        remote_id: remote_id.to_string(),
        is_paid: false,
        is_authorized: false,
        is_canceled: false,
        is_partially_refunded: false,
        is_refunded: false,
        state_label: "PENDING".to_string(),
        amount: Money::new(dec!(25.00), "EUR"),
    }
}

pub fn paid(remote_id: &str) -> TransactionSnapshot {
    TransactionSnapshot {
        is_paid: true,
        state_label: "PAID".to_string(),
        ..snapshot(remote_id)
    }
}

pub fn canceled(remote_id: &str) -> TransactionSnapshot {
    TransactionSnapshot {
        is_canceled: true,
        state_label: "CANCEL".to_string(),
        ..snapshot(remote_id)
    }
}

pub fn refunded(remote_id: &str) -> TransactionSnapshot {
    TransactionSnapshot {
        is_refunded: true,
        state_label: "REFUND".to_string(),
        ..snapshot(remote_id)
    }
}

/// Stores seeded with one draft order (id 1) and one payment for it.
pub async fn seeded_stores(remote_id: &str) -> (InMemoryPaymentStore, InMemoryOrderStore) {
    let payments = InMemoryPaymentStore::new();
    let orders = InMemoryOrderStore::new();
    orders.insert(OrderAggregate::new(1)).await;
    payments
        .insert(PaymentRecord::new(
            1,
            1,
            remote_id,
            Money::new(dec!(25.00), "EUR"),
        ))
        .await;
    (payments, orders)
}
