//! HTTP adapter for starting payments and for the provider callbacks.
//!
//! `POST /payment/start` opens a remote transaction and answers with the
//! provider's payment page URL.
//! `GET /payment/return?orderId=..` handles the customer's browser return.
//! `GET|POST /payment/notify` handles the provider's server notification;
//! `order_id` may come in the query string or a urlencoded form body.

use crate::application::checkout::CheckoutService;
use crate::application::dispatcher::CallbackDispatcher;
use crate::domain::checkout::OrderSummary;
use crate::domain::status::Money;
use crate::error::PaymentError;
use axum::extract::rejection::FormRejection;
use axum::extract::{Form, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, warn};

#[derive(Clone)]
pub struct CallbackState {
    pub dispatcher: Arc<CallbackDispatcher>,
    pub checkout: Arc<CheckoutService>,
}

#[derive(Debug, Deserialize)]
pub struct StartPaymentRequest {
    pub payment_id: u64,
    pub order_id: u64,
    pub amount: Decimal,
    pub currency: String,
    pub return_url: String,
    pub summary: OrderSummary,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StartPaymentResponse {
    pub remote_id: String,
    pub redirect_url: String,
}

#[derive(Debug, Deserialize)]
pub struct ReturnParams {
    #[serde(rename = "orderId", alias = "order_id")]
    pub order_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct NotifyParams {
    #[serde(alias = "orderId")]
    pub order_id: Option<String>,
}

pub fn router(dispatcher: Arc<CallbackDispatcher>, checkout: Arc<CheckoutService>) -> Router {
    Router::new()
        .route("/payment/start", post(handle_start))
        .route("/payment/return", get(handle_return))
        .route("/payment/notify", get(handle_notify).post(handle_notify))
        .with_state(CallbackState {
            dispatcher,
            checkout,
        })
}

fn status_for(err: &PaymentError) -> StatusCode {
    match err {
        PaymentError::UnknownTransaction(_) => StatusCode::NOT_FOUND,
        PaymentError::PaymentFailed(_) => StatusCode::PAYMENT_REQUIRED,
        PaymentError::ValidationError(_) => StatusCode::BAD_REQUEST,
        e if e.is_retryable() => StatusCode::SERVICE_UNAVAILABLE,
        PaymentError::Provider(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Client-facing text for an error; internal details stay in the logs.
fn public_message(err: &PaymentError) -> String {
    match err {
        PaymentError::UnknownTransaction(id) => format!("Unknown transaction '{}'", id),
        PaymentError::PaymentFailed(_) => "Payment failed".to_string(),
        PaymentError::ValidationError(message) => message.clone(),
        e if e.is_retryable() => "Temporarily unavailable, retry later".to_string(),
        PaymentError::Provider(_) => "Payment provider refused the request".to_string(),
        _ => "Internal error".to_string(),
    }
}

fn log_failure(callback: &str, err: &PaymentError) {
    match err {
        PaymentError::UnknownTransaction(_)
        | PaymentError::PaymentFailed(_)
        | PaymentError::ValidationError(_) => {
            warn!(callback, error = %err, "callback rejected")
        }
        e if e.is_retryable() => warn!(callback, error = %err, "callback deferred"),
        _ => error!(callback, error = %err, "callback failed"),
    }
}

async fn handle_start(
    State(state): State<CallbackState>,
    Json(request): Json<StartPaymentRequest>,
) -> Response {
    let amount = Money::new(request.amount, request.currency);
    let started = state
        .checkout
        .start(
            request.payment_id,
            request.order_id,
            amount,
            &request.summary,
            &request.return_url,
        )
        .await;
    match started {
        Ok(started) => (
            StatusCode::CREATED,
            Json(StartPaymentResponse {
                remote_id: started.remote_id,
                redirect_url: started.redirect_url,
            }),
        )
            .into_response(),
        Err(err) => {
            log_failure("start", &err);
            (status_for(&err), public_message(&err)).into_response()
        }
    }
}

async fn handle_return(
    State(state): State<CallbackState>,
    Query(params): Query<ReturnParams>,
) -> Response {
    let remote_id = params.order_id.unwrap_or_default();
    match state.dispatcher.handle_return(&remote_id).await {
        Ok(intent) => {
            Redirect::to(&format!("/checkout/{}/complete", intent.order_id)).into_response()
        }
        Err(err) => {
            log_failure("return", &err);
            (status_for(&err), public_message(&err)).into_response()
        }
    }
}

async fn handle_notify(
    State(state): State<CallbackState>,
    Query(query): Query<NotifyParams>,
    form: Result<Form<NotifyParams>, FormRejection>,
) -> Response {
    let remote_id = query
        .order_id
        .or_else(|| form.ok().and_then(|Form(body)| body.order_id))
        .unwrap_or_default();

    match state.dispatcher.handle_notify(&remote_id).await {
        Ok(ack) => (StatusCode::OK, ack).into_response(),
        Err(err) => {
            log_failure("notify", &err);
            (status_for(&err), format!("FALSE| {}", public_message(&err))).into_response()
        }
    }
}
