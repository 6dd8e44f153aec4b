use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A monetary amount in major units together with its ISO currency code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Money {
    pub amount: Decimal,
    pub currency: String,
}

impl Money {
    pub fn new(amount: Decimal, currency: impl Into<String>) -> Self {
        Self {
            amount,
            currency: currency.into(),
        }
    }
}

/// The provider's view of a transaction, fetched fresh for every
/// reconciliation attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionSnapshot {
    pub remote_id: String,
    pub is_paid: bool,
    pub is_authorized: bool,
    pub is_canceled: bool,
    pub is_partially_refunded: bool,
    pub is_refunded: bool,
    /// Free-form provider state name, mirrored on the payment record.
    pub state_label: String,
    pub amount: Money,
}

/// Local payment status.
///
/// No status is terminal at the payment level: a `Complete` payment may
/// still be refunded by a later notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocalStatus {
    #[default]
    New,
    #[serde(rename = "authorization")]
    Authorized,
    Complete,
    PartiallyRefunded,
    Refunded,
    AuthorizationVoided,
}

impl LocalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LocalStatus::New => "new",
            LocalStatus::Authorized => "authorization",
            LocalStatus::Complete => "complete",
            LocalStatus::PartiallyRefunded => "partially_refunded",
            LocalStatus::Refunded => "refunded",
            LocalStatus::AuthorizationVoided => "authorization_voided",
        }
    }
}

impl fmt::Display for LocalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps a provider snapshot to a local status.
///
/// Flags are checked in a fixed order and the first match wins, so a
/// snapshot with overlapping flags (a refunded transaction also reading as
/// paid, for instance) always resolves to the same status. The provider has
/// no dedicated "canceled" payment state, so cancellation maps to
/// `AuthorizationVoided`.
///
/// The provider adapter never sets `is_canceled` for a refunded transaction,
/// so refunds reach the refund branches below.
pub fn map_status(snapshot: &TransactionSnapshot) -> LocalStatus {
    if snapshot.is_canceled {
        LocalStatus::AuthorizationVoided
    } else if snapshot.is_authorized {
        LocalStatus::Authorized
    } else if snapshot.is_paid {
        LocalStatus::Complete
    } else if snapshot.is_partially_refunded {
        LocalStatus::PartiallyRefunded
    } else if snapshot.is_refunded {
        LocalStatus::Refunded
    } else {
        LocalStatus::New
    }
}
