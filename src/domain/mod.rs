//! Domain model: payment records, order workflow, provider snapshots and the
//! ports through which the application layer reaches storage and the
//! payment provider.

pub mod checkout;
pub mod order;
pub mod payment;
pub mod ports;
pub mod status;
