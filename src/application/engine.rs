use crate::domain::order::{OrderState, Transition};
use crate::domain::payment::PaymentRecord;
use crate::domain::ports::{OrderStoreBox, PaymentStoreBox};
use crate::domain::status::{LocalStatus, TransactionSnapshot, map_status};
use crate::error::{PaymentError, Result, WorkflowError};
use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

/// Prefix the provider's retry logic expects on a successful notification.
pub const ACK_PREFIX: &str = "TRUE|";

const MAX_TRANSITION_ATTEMPTS: usize = 3;

/// Order transition requested by a payment status, if any.
pub fn requested_transition(status: LocalStatus) -> Option<Transition> {
    match status {
        LocalStatus::Complete | LocalStatus::Authorized => Some(Transition::Place),
        LocalStatus::AuthorizationVoided | LocalStatus::Refunded => Some(Transition::Cancel),
        LocalStatus::New | LocalStatus::PartiallyRefunded => None,
    }
}

pub fn acknowledgment(status: LocalStatus) -> String {
    format!("{} Status updated to {}", ACK_PREFIX, status)
}

/// What happened to the order during one reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// The payment status does not call for an order transition.
    NotRequested,
    Applied {
        transition: Transition,
        state: OrderState,
    },
    /// The transition is not legal from the order's current state, usually
    /// because an earlier notification already applied it.
    Unavailable {
        transition: Transition,
        state: OrderState,
    },
}

impl TransitionOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, TransitionOutcome::Applied { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    pub payment: PaymentRecord,
    pub outcome: TransitionOutcome,
}

/// Where the customer goes after a successful browser return.
#[derive(Debug, Clone, PartialEq)]
pub struct RedirectIntent {
    pub order_id: u64,
    pub payment_id: u64,
    pub status: LocalStatus,
}

type LockMap = StdMutex<HashMap<String, Arc<Mutex<()>>>>;

/// Exclusive hold on one remote transaction.
///
/// Callers that fetch a snapshot must take this before the fetch and keep it
/// until the snapshot is reconciled, so writes happen in fetch order. The map
/// entry is dropped with the last holder.
pub struct TransactionLock<'a> {
    locks: &'a LockMap,
    remote_id: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl TransactionLock<'_> {
    pub fn remote_id(&self) -> &str {
        &self.remote_id
    }
}

impl Drop for TransactionLock<'_> {
    fn drop(&mut self) {
        self.guard.take();
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        if locks
            .get(&self.remote_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.remote_id);
        }
    }
}

/// Turns provider snapshots into local payment and order state.
///
/// All work for one remote transaction runs under a [`TransactionLock`],
/// and order transitions go through the store's compare-and-swap, so
/// near-simultaneous notifications cannot apply the same transition twice.
pub struct ReconciliationEngine {
    payment_store: PaymentStoreBox,
    order_store: OrderStoreBox,
    locks: LockMap,
}

impl ReconciliationEngine {
    pub fn new(payment_store: PaymentStoreBox, order_store: OrderStoreBox) -> Self {
        Self {
            payment_store,
            order_store,
            locks: StdMutex::new(HashMap::new()),
        }
    }

    pub async fn find_payment(&self, remote_id: &str) -> Result<Option<PaymentRecord>> {
        self.payment_store.get_by_remote_id(remote_id).await
    }

    pub async fn all_payments(&self) -> Result<Vec<PaymentRecord>> {
        self.payment_store.get_all().await
    }

    /// Waits for exclusive access to `remote_id`.
    pub async fn lock_transaction(&self, remote_id: &str) -> TransactionLock<'_> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            locks.entry(remote_id.to_string()).or_default().clone()
        };
        TransactionLock {
            locks: &self.locks,
            remote_id: remote_id.to_string(),
            guard: Some(lock.lock_owned().await),
        }
    }

    /// Records the snapshot's status on the payment and applies the derived
    /// order transition when it is currently legal.
    pub async fn reconcile(
        &self,
        payment: PaymentRecord,
        snapshot: &TransactionSnapshot,
    ) -> Result<Reconciliation> {
        let lock = self.lock_transaction(&payment.remote_id).await;
        self.reconcile_held(&lock, payment, snapshot).await
    }

    /// Browser return path. A canceled transaction is reported to the
    /// customer as `PaymentFailed`; its status is still recorded but the
    /// order is left untouched.
    pub async fn on_return(
        &self,
        payment: PaymentRecord,
        snapshot: &TransactionSnapshot,
    ) -> Result<RedirectIntent> {
        let lock = self.lock_transaction(&payment.remote_id).await;
        self.on_return_held(&lock, payment, snapshot).await
    }

    /// Server notification path. Always acknowledges with the resulting
    /// status once the snapshot has been reconciled.
    pub async fn on_notify(
        &self,
        payment: PaymentRecord,
        snapshot: &TransactionSnapshot,
    ) -> Result<String> {
        let lock = self.lock_transaction(&payment.remote_id).await;
        self.on_notify_held(&lock, payment, snapshot).await
    }

    pub(crate) async fn reconcile_held(
        &self,
        lock: &TransactionLock<'_>,
        payment: PaymentRecord,
        snapshot: &TransactionSnapshot,
    ) -> Result<Reconciliation> {
        debug_assert_eq!(lock.remote_id(), payment.remote_id);
        self.reconcile_locked(payment, snapshot, true).await
    }

    pub(crate) async fn on_return_held(
        &self,
        lock: &TransactionLock<'_>,
        payment: PaymentRecord,
        snapshot: &TransactionSnapshot,
    ) -> Result<RedirectIntent> {
        if snapshot.is_canceled {
            self.reconcile_locked(payment, snapshot, false).await?;
            warn!(remote_id = %snapshot.remote_id, state = %snapshot.state_label, "payment canceled on return");
            return Err(PaymentError::PaymentFailed(format!(
                "transaction {} was canceled",
                snapshot.remote_id
            )));
        }

        let reconciliation = self.reconcile_held(lock, payment, snapshot).await?;
        Ok(RedirectIntent {
            order_id: reconciliation.payment.order_id,
            payment_id: reconciliation.payment.id,
            status: reconciliation.payment.status,
        })
    }

    pub(crate) async fn on_notify_held(
        &self,
        lock: &TransactionLock<'_>,
        payment: PaymentRecord,
        snapshot: &TransactionSnapshot,
    ) -> Result<String> {
        let reconciliation = self.reconcile_held(lock, payment, snapshot).await?;
        Ok(acknowledgment(reconciliation.payment.status))
    }

    async fn reconcile_locked(
        &self,
        mut payment: PaymentRecord,
        snapshot: &TransactionSnapshot,
        transition_order: bool,
    ) -> Result<Reconciliation> {
        let status = map_status(snapshot);
        let previous = payment.status;
        payment.status = status;
        payment.remote_status_label = snapshot.state_label.clone();
        self.payment_store.store(payment.clone()).await?;

        debug!(
            remote_id = %payment.remote_id,
            from = %previous,
            to = %status,
            label = %payment.remote_status_label,
            "payment status recorded"
        );

        let outcome = match requested_transition(status) {
            Some(transition) if transition_order => {
                self.apply_transition(payment.order_id, transition).await?
            }
            _ => TransitionOutcome::NotRequested,
        };

        Ok(Reconciliation { payment, outcome })
    }

    async fn apply_transition(
        &self,
        order_id: u64,
        transition: Transition,
    ) -> Result<TransitionOutcome> {
        let mut expected = 0;
        for _ in 0..MAX_TRANSITION_ATTEMPTS {
            let order = self
                .order_store
                .get(order_id)
                .await?
                .ok_or(PaymentError::UnknownOrder(order_id))?;
            expected = order.version;

            if !order.can_apply(transition) {
                debug!(order_id, %transition, state = %order.state, "transition not available, skipping");
                return Ok(TransitionOutcome::Unavailable {
                    transition,
                    state: order.state,
                });
            }

            match self
                .order_store
                .apply_transition(order_id, transition, order.version)
                .await
            {
                Ok(state) => {
                    info!(order_id, %transition, %state, "order transition applied");
                    return Ok(TransitionOutcome::Applied { transition, state });
                }
                Err(PaymentError::VersionConflict { .. }) => {
                    debug!(order_id, %transition, "order changed concurrently, reloading");
                    continue;
                }
                Err(PaymentError::Workflow(WorkflowError::TransitionUnavailable {
                    from, ..
                })) => {
                    return Ok(TransitionOutcome::Unavailable {
                        transition,
                        state: from,
                    });
                }
                Err(e) => return Err(e),
            }
        }

        Err(PaymentError::VersionConflict { order_id, expected })
    }
}
