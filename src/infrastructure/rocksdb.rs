use crate::domain::caller::UserId;
use crate::domain::notification::{Notification, NotificationId};
use crate::domain::order::{Order, OrderId, OrderLine};
use crate::domain::ports::{OrderStore, Sequence};
use crate::domain::status::OrderStatus;
use crate::domain::unit_of_work::{StoreView, UnitOfWork, Write};
use crate::error::{StoreError, StoreResult};
use async_trait::async_trait;
use rocksdb::{
    ColumnFamily, ColumnFamilyDescriptor, DB, Direction, IteratorMode, Options, WriteBatch,
};
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Column Family for order headers, keyed by order id.
pub const CF_ORDERS: &str = "orders";
/// Column Family for order lines, keyed by order id then position.
pub const CF_ORDER_LINES: &str = "order_lines";
/// Column Family for notifications, keyed by user id then notification id.
pub const CF_NOTIFICATIONS: &str = "notifications";
/// Column Family for identifier sequences.
pub const CF_SEQUENCES: &str = "sequences";

/// A persistent order store implementation using RocksDB.
///
/// Every unit of work becomes one `WriteBatch`, so orders, lines and
/// notifications land together or not at all. Keys are big-endian so range
/// scans return rows in id order.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>` and
/// locks).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    // Serialises precondition checks with the batch write.
    commit_lock: Arc<Mutex<()>>,
    sequence_lock: Arc<Mutex<()>>,
}

fn order_key(id: OrderId) -> [u8; 8] {
    id.to_be_bytes()
}

fn line_key(order_id: OrderId, position: u32) -> Vec<u8> {
    let mut key = order_id.to_be_bytes().to_vec();
    key.extend_from_slice(&position.to_be_bytes());
    key
}

fn notification_key(user_id: UserId, id: NotificationId) -> Vec<u8> {
    let mut key = user_id.to_be_bytes().to_vec();
    key.extend_from_slice(&id.to_be_bytes());
    key
}

fn sequence_key(sequence: Sequence) -> &'static [u8] {
    match sequence {
        Sequence::Order => b"orders",
        Sequence::Notification => b"notifications",
    }
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// Ensures that all required column families exist.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let descriptors = [CF_ORDERS, CF_ORDER_LINES, CF_NOTIFICATIONS, CF_SEQUENCES]
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect::<Vec<_>>();

        let db = DB::open_cf_descriptors(&opts, path, descriptors)?;

        Ok(Self {
            db: Arc::new(db),
            commit_lock: Arc::new(Mutex::new(())),
            sequence_lock: Arc::new(Mutex::new(())),
        })
    }

    fn cf(&self, name: &'static str) -> StoreResult<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or(StoreError::MissingColumnFamily(name))
    }

    fn get<T: DeserializeOwned>(
        &self,
        cf_name: &'static str,
        key: &[u8],
    ) -> StoreResult<Option<T>> {
        let cf = self.cf(cf_name)?;
        match self.db.get_pinned_cf(cf, key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// All values whose key starts with `prefix`, in key order.
    fn scan<T: DeserializeOwned>(
        &self,
        cf_name: &'static str,
        prefix: &[u8],
    ) -> StoreResult<Vec<T>> {
        let cf = self.cf(cf_name)?;
        let mut values = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::From(prefix, Direction::Forward)) {
            let (key, value) = item?;
            if !key.starts_with(prefix) {
                break;
            }
            values.push(serde_json::from_slice(&value)?);
        }
        Ok(values)
    }
}

impl StoreView for RocksDBStore {
    fn status(&self, order_id: OrderId) -> StoreResult<Option<OrderStatus>> {
        let order: Option<Order> = self.get(CF_ORDERS, &order_key(order_id))?;
        Ok(order.map(|o| o.status))
    }

    fn has_notification(&self, user_id: UserId, id: NotificationId) -> StoreResult<bool> {
        let cf = self.cf(CF_NOTIFICATIONS)?;
        let result = self.db.get_pinned_cf(cf, notification_key(user_id, id))?;
        Ok(result.is_some())
    }
}

#[async_trait]
impl OrderStore for RocksDBStore {
    async fn next_id(&self, sequence: Sequence) -> StoreResult<u64> {
        let _guard = self.sequence_lock.lock().await;
        let cf = self.cf(CF_SEQUENCES)?;
        let key = sequence_key(sequence);

        let current = match self.db.get_pinned_cf(cf, key)? {
            Some(bytes) => {
                let raw: [u8; 8] = bytes.as_ref().try_into().map_err(|_| {
                    StoreError::Integrity(format!(
                        "sequence {:?} has a malformed value",
                        sequence
                    ))
                })?;
                u64::from_be_bytes(raw)
            }
            None => 0,
        };
        let next = current + 1;
        self.db.put_cf(cf, key, next.to_be_bytes())?;
        Ok(next)
    }

    async fn commit(&self, unit: UnitOfWork) -> StoreResult<()> {
        let _guard = self.commit_lock.lock().await;
        unit.check(self)?;

        // Rows touched more than once in the unit are folded here first.
        let mut orders: BTreeMap<OrderId, Order> = BTreeMap::new();
        let mut notifications: BTreeMap<(UserId, NotificationId), Notification> = BTreeMap::new();
        let mut batch = WriteBatch::default();
        let lines_cf = self.cf(CF_ORDER_LINES)?;

        for write in unit.into_writes() {
            match write {
                Write::InsertOrder(order) => {
                    orders.insert(order.id, order);
                }
                Write::InsertLine(line) => {
                    batch.put_cf(
                        lines_cf,
                        line_key(line.order_id, line.position),
                        serde_json::to_vec(&line)?,
                    );
                }
                Write::InsertNotification(notification) => {
                    notifications.insert((notification.user_id, notification.id), notification);
                }
                Write::UpdateStatus {
                    order_id, new, at, ..
                } => {
                    let mut order = match orders.remove(&order_id) {
                        Some(order) => order,
                        None => self
                            .get(CF_ORDERS, &order_key(order_id))?
                            .ok_or(StoreError::OrderMissing(order_id))?,
                    };
                    order.status = new;
                    order.updated_at = at;
                    orders.insert(order_id, order);
                }
                Write::MarkNotificationRead {
                    user_id,
                    notification_id,
                } => {
                    let key = (user_id, notification_id);
                    let mut notification = match notifications.remove(&key) {
                        Some(n) => n,
                        None => self
                            .get(CF_NOTIFICATIONS, &notification_key(user_id, notification_id))?
                            .ok_or(StoreError::NotificationMissing(notification_id))?,
                    };
                    notification.read = true;
                    notifications.insert(key, notification);
                }
            }
        }

        let orders_cf = self.cf(CF_ORDERS)?;
        for (id, order) in &orders {
            batch.put_cf(orders_cf, order_key(*id), serde_json::to_vec(order)?);
        }
        let notifications_cf = self.cf(CF_NOTIFICATIONS)?;
        for ((user_id, id), notification) in &notifications {
            batch.put_cf(
                notifications_cf,
                notification_key(*user_id, *id),
                serde_json::to_vec(notification)?,
            );
        }

        self.db.write(batch)?;
        Ok(())
    }

    async fn order(&self, id: OrderId) -> StoreResult<Option<Order>> {
        self.get(CF_ORDERS, &order_key(id))
    }

    async fn lines(&self, order_id: OrderId) -> StoreResult<Vec<OrderLine>> {
        self.scan(CF_ORDER_LINES, &order_key(order_id))
    }

    async fn orders(&self, user_id: Option<UserId>) -> StoreResult<Vec<Order>> {
        let orders: Vec<Order> = self.scan(CF_ORDERS, &[])?;
        Ok(orders
            .into_iter()
            .filter(|o| user_id.is_none_or(|user| o.user_id == user))
            .collect())
    }

    async fn notifications(&self, user_id: UserId) -> StoreResult<Vec<Notification>> {
        self.scan(CF_NOTIFICATIONS, &user_id.to_be_bytes())
    }
}
