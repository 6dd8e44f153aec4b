use crate::domain::order::{OrderAggregate, OrderState, Transition};
use crate::domain::payment::PaymentRecord;
use crate::domain::ports::{OrderStore, PaymentStore};
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamilyDescriptor, DB, Options, WriteBatch};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Column Family for payment records, keyed by payment id.
pub const CF_PAYMENTS: &str = "payments";
/// Column Family mapping remote transaction ids to payment ids.
pub const CF_REMOTE_IDS: &str = "remote_ids";
/// Column Family for order aggregates, keyed by order id.
pub const CF_ORDERS: &str = "orders";

/// A persistent store implementation using RocksDB.
///
/// Payments, the remote id index and orders live in separate Column
/// Families. Writes that read before they write (payment upserts and order
/// transitions) are serialized through `write_lock`.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    write_lock: Arc<Mutex<()>>,
}

fn internal(message: String) -> PaymentError {
    PaymentError::InternalError(Box::new(std::io::Error::other(message)))
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| internal(format!("Serialization error: {}", e)))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes).map_err(|e| internal(format!("Deserialization error: {}", e)))
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// Ensures that the required column families exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let descriptors = [CF_PAYMENTS, CF_REMOTE_IDS, CF_ORDERS]
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect::<Vec<_>>();

        let db = DB::open_cf_descriptors(&opts, path, descriptors)?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    fn cf(&self, name: &str) -> Result<&rocksdb::ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| internal(format!("Column family '{}' not found", name)))
    }

    fn read_payment(&self, payment_id: u64) -> Result<Option<PaymentRecord>> {
        let cf = self.cf(CF_PAYMENTS)?;
        match self.db.get_cf(cf, payment_id.to_be_bytes())? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    fn read_order(&self, order_id: u64) -> Result<Option<OrderAggregate>> {
        let cf = self.cf(CF_ORDERS)?;
        match self.db.get_cf(cf, order_id.to_be_bytes())? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    fn write_order(&self, order: &OrderAggregate) -> Result<()> {
        let cf = self.cf(CF_ORDERS)?;
        self.db.put_cf(cf, order.id.to_be_bytes(), encode(order)?)?;
        Ok(())
    }
}

#[async_trait]
impl PaymentStore for RocksDBStore {
    async fn store(&self, payment: PaymentRecord) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        if let Some(existing) = self.read_payment(payment.id)?
            && !existing.remote_id.is_empty()
            && existing.remote_id != payment.remote_id
        {
            return Err(PaymentError::ValidationError(format!(
                "Remote id of payment {} cannot change",
                payment.id
            )));
        }

        let mut batch = WriteBatch::default();
        batch.put_cf(
            self.cf(CF_PAYMENTS)?,
            payment.id.to_be_bytes(),
            encode(&payment)?,
        );
        batch.put_cf(
            self.cf(CF_REMOTE_IDS)?,
            payment.remote_id.as_bytes(),
            payment.id.to_be_bytes(),
        );
        self.db.write(batch)?;

        Ok(())
    }

    async fn get(&self, payment_id: u64) -> Result<Option<PaymentRecord>> {
        self.read_payment(payment_id)
    }

    async fn get_by_remote_id(&self, remote_id: &str) -> Result<Option<PaymentRecord>> {
        let cf = self.cf(CF_REMOTE_IDS)?;
        let Some(bytes) = self.db.get_cf(cf, remote_id.as_bytes())? else {
            return Ok(None);
        };
        let id_bytes: [u8; 8] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| internal(format!("Corrupt remote id index entry for '{}'", remote_id)))?;
        self.read_payment(u64::from_be_bytes(id_bytes))
    }

    async fn get_all(&self) -> Result<Vec<PaymentRecord>> {
        let cf = self.cf(CF_PAYMENTS)?;

        let mut payments = Vec::new();
        for item in self.db.iterator_cf(cf, rocksdb::IteratorMode::Start) {
            let (_key, value) = item?;
            payments.push(decode(&value)?);
        }

        Ok(payments)
    }
}

#[async_trait]
impl OrderStore for RocksDBStore {
    async fn store(&self, order: OrderAggregate) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.write_order(&order)
    }

    async fn get(&self, order_id: u64) -> Result<Option<OrderAggregate>> {
        self.read_order(order_id)
    }

    async fn apply_transition(
        &self,
        order_id: u64,
        transition: Transition,
        expected_version: u64,
    ) -> Result<OrderState> {
        let _guard = self.write_lock.lock().await;

        let mut order = self
            .read_order(order_id)?
            .ok_or(PaymentError::UnknownOrder(order_id))?;
        if order.version != expected_version {
            return Err(PaymentError::VersionConflict {
                order_id,
                expected: expected_version,
            });
        }

        let state = order.apply(transition)?;
        self.write_order(&order)?;
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::status::{LocalStatus, Money};
    use rust_decimal_macros::dec;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_rocksdb_open_cf() {
        let dir = tempdir().unwrap();
        let store = RocksDBStore::open(dir.path()).expect("Failed to open RocksDB");

        assert!(store.db.cf_handle(CF_PAYMENTS).is_some());
        assert!(store.db.cf_handle(CF_REMOTE_IDS).is_some());
        assert!(store.db.cf_handle(CF_ORDERS).is_some());
    }

    #[tokio::test]
    async fn test_rocksdb_payment_store() {
        let dir = tempdir().unwrap();
        let store = RocksDBStore::open(dir.path()).unwrap();

        let mut payment = PaymentRecord::new(1, 7, "tx-1", Money::new(dec!(12.50), "EUR"));
        PaymentStore::store(&store, payment.clone()).await.unwrap();

        let retrieved = PaymentStore::get_by_remote_id(&store, "tx-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(retrieved, payment);

        payment.status = LocalStatus::Refunded;
        PaymentStore::store(&store, payment.clone()).await.unwrap();
        let all = PaymentStore::get_all(&store).await.unwrap();
        assert_eq!(all, vec![payment]);

        assert!(
            PaymentStore::get_by_remote_id(&store, "tx-2")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_rocksdb_order_transitions() {
        let dir = tempdir().unwrap();
        let store = RocksDBStore::open(dir.path()).unwrap();

        OrderStore::store(&store, OrderAggregate::new(3)).await.unwrap();
        let state = store.apply_transition(3, Transition::Place, 0).await.unwrap();
        assert_eq!(state, OrderState::Placed);

        let stale = store.apply_transition(3, Transition::Cancel, 0).await;
        assert!(matches!(stale, Err(PaymentError::VersionConflict { .. })));

        let order = OrderStore::get(&store, 3).await.unwrap().unwrap();
        assert_eq!(order.state, OrderState::Placed);
        assert_eq!(order.version, 1);
    }
}
