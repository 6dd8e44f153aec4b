//! HTTP client for the Pay.nl REST API.
//!
//! One client instance is bound to one set of credentials; there is no
//! process-wide SDK configuration.

use crate::config::{Credentials, GatewayConfig};
use crate::domain::checkout::{LineItemKind, StartRequest, StartedTransaction, StreetAddress};
use crate::domain::ports::{PaymentMethod, ProviderClient};
use crate::domain::status::{Money, TransactionSnapshot};
use crate::error::ProviderError;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value as JsonValue, json};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, warn};

type ProviderResult<T> = std::result::Result<T, ProviderError>;

pub const API_VERSION: &str = "v13";

/// Provider state codes that carry a meaning for reconciliation.
pub mod state_code {
    pub const PAID: i64 = 100;
    pub const AUTHORIZED: i64 = 95;
    pub const REFUNDED: i64 = -81;
    pub const PARTIALLY_REFUNDED: i64 = -82;
}

#[derive(Clone)]
pub struct PaynlClient {
    client: Client,
    base_url: String,
    credentials: Credentials,
}

#[derive(Debug, Deserialize)]
struct RequestStatus {
    result: String,
    #[serde(default, rename = "errorId")]
    error_id: String,
    #[serde(default, rename = "errorMessage")]
    error_message: String,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    request: RequestStatus,
}

#[derive(Debug, Deserialize)]
struct StartResponse {
    transaction: StartTransactionData,
}

#[derive(Debug, Deserialize)]
struct StartTransactionData {
    #[serde(rename = "transactionId")]
    transaction_id: String,
    #[serde(rename = "paymentURL")]
    payment_url: String,
}

#[derive(Debug, Deserialize)]
struct InfoResponse {
    #[serde(rename = "paymentDetails")]
    payment_details: PaymentDetails,
}

#[derive(Debug, Deserialize)]
struct PaymentDetails {
    state: i64,
    #[serde(rename = "stateName")]
    state_name: String,
    amount: WireAmount,
}

#[derive(Debug, Deserialize)]
struct WireAmount {
    /// Minor units.
    value: i64,
    currency: String,
}

#[derive(Debug, Deserialize)]
struct ServiceResponse {
    #[serde(default, rename = "paymentOptions")]
    payment_options: BTreeMap<String, PaymentOption>,
}

#[derive(Debug, Deserialize)]
struct PaymentOption {
    id: JsonValue,
    name: String,
}

/// Builds a snapshot from a provider state code.
///
/// Refund codes are negative like every cancellation code, so they are
/// excluded from `is_canceled`.
pub fn snapshot_from_state(
    remote_id: &str,
    state: i64,
    state_name: &str,
    amount: Money,
) -> TransactionSnapshot {
    let is_refunded = state == state_code::REFUNDED;
    let is_partially_refunded = state == state_code::PARTIALLY_REFUNDED;
    TransactionSnapshot {
        remote_id: remote_id.to_string(),
        is_paid: state == state_code::PAID,
        is_authorized: state == state_code::AUTHORIZED,
        is_canceled: state < 0 && !is_refunded && !is_partially_refunded,
        is_partially_refunded,
        is_refunded,
        state_label: state_name.to_string(),
        amount,
    }
}

fn to_minor_units(amount: Decimal) -> ProviderResult<i64> {
    (amount * Decimal::ONE_HUNDRED)
        .round()
        .to_i64()
        .ok_or_else(|| ProviderError::Rejected(format!("amount {} out of range", amount)))
}

fn from_minor_units(value: i64) -> Decimal {
    Decimal::new(value, 2)
}

fn classify_rejection(status: &RequestStatus) -> ProviderError {
    let message = if status.error_message.is_empty() {
        format!("request rejected ({})", status.error_id)
    } else {
        status.error_message.clone()
    };
    let lower = message.to_lowercase();
    if lower.contains("token") || lower.contains("unauthorized") || lower.contains("not allowed")
    {
        ProviderError::Authentication(message)
    } else if lower.contains("not found") {
        ProviderError::NotFound(message)
    } else {
        ProviderError::Rejected(message)
    }
}

fn address_json(address: &StreetAddress) -> JsonValue {
    json!({
        "streetName": address.street_name,
        "streetNumber": address.house_number,
        "zipCode": address.zip_code,
        "city": address.city,
        "countryCode": address.country,
    })
}

impl PaynlClient {
    pub fn new(credentials: Credentials, base_url: &str, timeout: Duration) -> ProviderResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::Transient(format!("failed to initialize HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
        })
    }

    /// Builds a client from the configuration, or `None` when credentials
    /// are incomplete.
    pub fn from_config(config: &GatewayConfig) -> ProviderResult<Option<Self>> {
        config
            .credentials()
            .map(|creds| Self::new(creds, &config.base_url, config.timeout()))
            .transpose()
    }

    fn endpoint(&self, action: &str) -> String {
        format!("{}/{}/Transaction/{}/json", self.base_url, API_VERSION, action)
    }

    async fn call<T: DeserializeOwned>(&self, action: &str, body: JsonValue) -> ProviderResult<T> {
        let url = self.endpoint(action);
        debug!(%url, "calling provider");

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.credentials.token_code, Some(&self.credentials.api_token))
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Transient(format!("provider request failed: {}", e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ProviderError::Transient(format!("failed to read provider response: {}", e)))?;

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(ProviderError::Authentication(format!("HTTP {}", status)));
            }
            StatusCode::NOT_FOUND => return Err(ProviderError::NotFound(format!("HTTP {}", status))),
            s if s.is_server_error() || s == StatusCode::TOO_MANY_REQUESTS => {
                warn!(%status, action, "provider unavailable");
                return Err(ProviderError::Transient(format!("HTTP {}", status)));
            }
            s if !s.is_success() => {
                return Err(ProviderError::Rejected(format!("HTTP {}: {}", status, text)));
            }
            _ => {}
        }

        let envelope: Envelope = serde_json::from_str(&text)
            .map_err(|e| ProviderError::Rejected(format!("invalid provider response: {}", e)))?;
        if envelope.request.result != "1" {
            return Err(classify_rejection(&envelope.request));
        }

        serde_json::from_str(&text)
            .map_err(|e| ProviderError::Rejected(format!("invalid provider response: {}", e)))
    }

    fn start_body(&self, request: &StartRequest) -> ProviderResult<JsonValue> {
        let order_data = request
            .line_items
            .iter()
            .map(|line| -> ProviderResult<JsonValue> {
                Ok(json!({
                    "productId": line.id,
                    "description": line.name,
                    "price": to_minor_units(line.price)?,
                    "quantity": line.quantity,
                    "vatPercentage": line.vat_percentage,
                    "productType": match line.kind {
                        LineItemKind::Article => "ARTICLE",
                        LineItemKind::Shipping => "SHIPPING",
                    },
                }))
            })
            .collect::<ProviderResult<Vec<_>>>()?;

        let end_user = &request.end_user;
        let mut body = json!({
            "serviceId": self.credentials.service_id,
            "amount": to_minor_units(request.amount.amount)?,
            "finishUrl": request.return_url,
            "ipAddress": request.ip_address,
            "testMode": u8::from(request.test_mode),
            "transaction": {
                "currency": request.amount.currency,
                "description": request.description,
                "orderExchangeUrl": request.notify_url,
            },
            "enduser": {
                "initials": end_user.initials,
                "lastName": end_user.last_name,
                "emailAddress": end_user.email,
                "company": {
                    "name": end_user.company,
                    "countryCode": end_user.invoice_address.country,
                },
                "invoiceAddress": address_json(&end_user.invoice_address),
                "address": end_user.shipping_address.as_ref().map(address_json),
            },
            "saleData": {
                "orderNumber": request.order_number,
                "orderData": order_data,
            },
        });
        if let Some(method) = &request.payment_method {
            body["paymentOptionId"] = json!(method);
        }
        Ok(body)
    }
}

#[async_trait]
impl ProviderClient for PaynlClient {
    async fn start_transaction(&self, request: StartRequest) -> ProviderResult<StartedTransaction> {
        let body = self.start_body(&request)?;
        let response: StartResponse = self.call("start", body).await?;
        Ok(StartedTransaction {
            remote_id: response.transaction.transaction_id,
            redirect_url: response.transaction.payment_url,
        })
    }

    async fn fetch_transaction(&self, remote_id: &str) -> ProviderResult<TransactionSnapshot> {
        let response: InfoResponse = self
            .call("info", json!({ "transactionId": remote_id }))
            .await?;
        let details = response.payment_details;
        Ok(snapshot_from_state(
            remote_id,
            details.state,
            &details.state_name,
            Money::new(from_minor_units(details.amount.value), details.amount.currency),
        ))
    }

    async fn list_payment_methods(&self) -> ProviderResult<Vec<PaymentMethod>> {
        let response: ServiceResponse = self
            .call(
                "getService",
                json!({ "serviceId": self.credentials.service_id }),
            )
            .await?;
        Ok(response
            .payment_options
            .into_values()
            .map(|option| PaymentMethod {
                id: match option.id {
                    JsonValue::String(s) => s,
                    other => other.to_string(),
                },
                name: option.name,
            })
            .collect())
    }
}
