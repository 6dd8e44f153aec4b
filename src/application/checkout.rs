use crate::config::GatewayConfig;
use crate::domain::checkout::{
    OrderSummary, StartRequest, StartedTransaction, build_end_user, build_line_items,
};
use crate::domain::order::OrderAggregate;
use crate::domain::payment::PaymentRecord;
use crate::domain::ports::{OrderStoreBox, PaymentStoreBox, ProviderClientBox};
use crate::domain::status::Money;
use crate::error::{PaymentError, Result};
use rust_decimal::Decimal;
use tracing::info;

/// Starts offsite transactions and registers the local payment record.
pub struct CheckoutService {
    provider: ProviderClientBox,
    payment_store: PaymentStoreBox,
    order_store: OrderStoreBox,
    notify_url: String,
    test_mode: bool,
    payment_method: Option<String>,
}

impl CheckoutService {
    pub fn new(
        provider: ProviderClientBox,
        payment_store: PaymentStoreBox,
        order_store: OrderStoreBox,
        config: &GatewayConfig,
    ) -> Self {
        Self {
            provider,
            payment_store,
            order_store,
            notify_url: config.notify_url.clone(),
            test_mode: config.test_mode(),
            payment_method: config.default_payment_method().map(str::to_string),
        }
    }

    pub fn build_request(
        &self,
        amount: Money,
        summary: &OrderSummary,
        return_url: &str,
    ) -> StartRequest {
        StartRequest {
            amount,
            return_url: return_url.to_string(),
            notify_url: self.notify_url.clone(),
            order_number: summary.order_number.clone(),
            description: summary.order_number.clone(),
            ip_address: summary.ip_address.clone(),
            end_user: build_end_user(&summary.customer),
            line_items: build_line_items(summary),
            payment_method: self.payment_method.clone(),
            test_mode: self.test_mode,
        }
    }

    /// Opens the remote transaction and stores a `New` payment for it.
    /// An order seen for the first time is registered as a draft.
    ///
    /// Nothing is stored when the provider call fails.
    pub async fn start(
        &self,
        payment_id: u64,
        order_id: u64,
        amount: Money,
        summary: &OrderSummary,
        return_url: &str,
    ) -> Result<StartedTransaction> {
        if amount.amount <= Decimal::ZERO {
            return Err(PaymentError::ValidationError(
                "Amount must be positive".to_string(),
            ));
        }
        if self.payment_store.get(payment_id).await?.is_some() {
            return Err(PaymentError::ValidationError(format!(
                "Payment {payment_id} already has a remote transaction"
            )));
        }

        let request = self.build_request(amount.clone(), summary, return_url);
        let started = self.provider.start_transaction(request).await?;

        if self.order_store.get(order_id).await?.is_none() {
            self.order_store.store(OrderAggregate::new(order_id)).await?;
        }
        let payment = PaymentRecord::new(payment_id, order_id, started.remote_id.clone(), amount);
        self.payment_store.store(payment).await?;

        info!(
            payment_id,
            order_id,
            remote_id = %started.remote_id,
            "remote transaction started"
        );
        Ok(started)
    }
}
