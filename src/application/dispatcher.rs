use super::engine::{ReconciliationEngine, RedirectIntent};
use crate::domain::payment::PaymentRecord;
use crate::domain::ports::ProviderClientBox;
use crate::domain::status::TransactionSnapshot;
use crate::error::{PaymentError, Result};
use tracing::{info, instrument};

/// Entry point for the two provider callbacks.
///
/// Both paths require a payment that was registered when the transaction
/// started, and both fetch a fresh snapshot from the provider before
/// touching local state.
pub struct CallbackDispatcher {
    provider: ProviderClientBox,
    engine: ReconciliationEngine,
}

impl CallbackDispatcher {
    pub fn new(provider: ProviderClientBox, engine: ReconciliationEngine) -> Self {
        Self { provider, engine }
    }

    pub fn engine(&self) -> &ReconciliationEngine {
        &self.engine
    }

    /// Customer came back from the provider's payment page.
    #[instrument(skip(self))]
    pub async fn handle_return(&self, remote_id: &str) -> Result<RedirectIntent> {
        let remote_id = normalize(remote_id)?;
        let lock = self.engine.lock_transaction(remote_id).await;
        let (payment, snapshot) = self.load(remote_id).await?;
        let intent = self.engine.on_return_held(&lock, payment, &snapshot).await?;
        info!(order_id = intent.order_id, status = %intent.status, "return processed");
        Ok(intent)
    }

    /// Provider reports a status change. Returns the plain-text
    /// acknowledgment for the provider's retry logic.
    #[instrument(skip(self))]
    pub async fn handle_notify(&self, remote_id: &str) -> Result<String> {
        let remote_id = normalize(remote_id)?;
        let lock = self.engine.lock_transaction(remote_id).await;
        let (payment, snapshot) = self.load(remote_id).await?;
        let ack = self.engine.on_notify_held(&lock, payment, &snapshot).await?;
        info!(%ack, "notification processed");
        Ok(ack)
    }

    /// Must run under the transaction lock: the snapshot is only current
    /// until another caller fetches.
    async fn load(&self, remote_id: &str) -> Result<(PaymentRecord, TransactionSnapshot)> {
        let payment = self
            .engine
            .find_payment(remote_id)
            .await?
            .ok_or_else(|| PaymentError::UnknownTransaction(remote_id.to_string()))?;

        let snapshot = self.provider.fetch_transaction(remote_id).await?;
        Ok((payment, snapshot))
    }
}

fn normalize(remote_id: &str) -> Result<&str> {
    let remote_id = remote_id.trim();
    if remote_id.is_empty() {
        return Err(PaymentError::UnknownTransaction(String::new()));
    }
    Ok(remote_id)
}
