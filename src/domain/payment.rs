use super::status::{LocalStatus, Money};
use serde::{Deserialize, Serialize};

/// Local record of one offsite payment attempt.
///
/// Created when the remote transaction is started. Only the reconciliation
/// engine changes `status` and `remote_status_label` afterwards.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct PaymentRecord {
    pub id: u64,
    pub order_id: u64,
    /// Set once at transaction start.
    pub remote_id: String,
    pub amount: Money,
    pub status: LocalStatus,
    pub remote_status_label: String,
}

impl PaymentRecord {
    pub fn new(id: u64, order_id: u64, remote_id: impl Into<String>, amount: Money) -> Self {
        Self {
            id,
            order_id,
            remote_id: remote_id.into(),
            amount,
            status: LocalStatus::New,
            remote_status_label: String::new(),
        }
    }
}
