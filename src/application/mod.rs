//! Application layer containing the payment reconciliation orchestration.
//!
//! `ReconciliationEngine` decides the local payment and order state for a
//! provider snapshot, `CallbackDispatcher` feeds it from the provider's
//! callbacks, and `CheckoutService` opens the remote transactions those
//! callbacks refer to.

pub mod checkout;
pub mod dispatcher;
pub mod engine;
pub mod settings;
