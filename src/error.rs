use crate::domain::order::OrderState;
use thiserror::Error;

/// Failures reported by a payment provider call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("Provider rejected credentials: {0}")]
    Authentication(String),
    #[error("Unknown remote transaction: {0}")]
    NotFound(String),
    #[error("Provider temporarily unavailable: {0}")]
    Transient(String),
    #[error("Provider rejected request: {0}")]
    Rejected(String),
}

/// Raised by the order workflow when a transition is not legal from the
/// current state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("Transition '{transition}' is not available from state '{from}'")]
    TransitionUnavailable {
        transition: &'static str,
        from: OrderState,
    },
}

#[derive(Error, Debug)]
pub enum PaymentError {
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    Workflow(#[from] WorkflowError),
    #[error("No payment is registered for remote transaction '{0}'")]
    UnknownTransaction(String),
    #[error("Order {0} not found")]
    UnknownOrder(u64),
    #[error("Payment failed: {0}")]
    PaymentFailed(String),
    #[error("Order {order_id} was modified concurrently (expected version {expected})")]
    VersionConflict { order_id: u64, expected: u64 },
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Internal error: {0}")]
    InternalError(Box<dyn std::error::Error + Send + Sync>),
}

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for PaymentError {
    fn from(err: rocksdb::Error) -> Self {
        PaymentError::InternalError(Box::new(err))
    }
}

impl PaymentError {
    /// Whether resubmitting the same callback later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PaymentError::Provider(ProviderError::Transient(_))
                | PaymentError::VersionConflict { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, PaymentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(PaymentError::from(ProviderError::Transient("timeout".into())).is_retryable());
        assert!(
            PaymentError::VersionConflict {
                order_id: 1,
                expected: 3
            }
            .is_retryable()
        );
        assert!(!PaymentError::from(ProviderError::Authentication("bad".into())).is_retryable());
        assert!(!PaymentError::UnknownTransaction("tx".into()).is_retryable());
        assert!(!PaymentError::PaymentFailed("canceled".into()).is_retryable());
    }

    #[test]
    fn test_provider_error_is_transparent() {
        let err = PaymentError::from(ProviderError::NotFound("123X".into()));
        assert_eq!(err.to_string(), "Unknown remote transaction: 123X");
    }
}
