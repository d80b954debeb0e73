use crate::domain::caller::UserId;
use crate::domain::catalog::{Product, ProductId};
use crate::domain::notification::{Notification, NotificationId};
use crate::domain::order::{Order, OrderId, OrderLine};
use crate::domain::ports::{Catalog, OrderStore, Sequence};
use crate::domain::status::OrderStatus;
use crate::domain::unit_of_work::{StoreView, UnitOfWork, Write};
use crate::error::StoreResult;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

/// A thread-safe in-memory product catalog.
///
/// The ordering core only reads from it; `upsert` exists for loading and for
/// simulating catalog changes.
#[derive(Default, Clone)]
pub struct InMemoryCatalog {
    products: Arc<RwLock<HashMap<ProductId, Product>>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_products(products: impl IntoIterator<Item = Product>) -> Self {
        let products = products.into_iter().map(|p| (p.id, p)).collect();
        Self {
            products: Arc::new(RwLock::new(products)),
        }
    }

    pub async fn upsert(&self, product: Product) {
        let mut products = self.products.write().await;
        products.insert(product.id, product);
    }

    pub async fn remove(&self, id: ProductId) -> Option<Product> {
        let mut products = self.products.write().await;
        products.remove(&id)
    }
}

#[async_trait]
impl Catalog for InMemoryCatalog {
    async fn product(&self, id: ProductId) -> StoreResult<Option<Product>> {
        let products = self.products.read().await;
        Ok(products.get(&id).cloned())
    }
}

#[derive(Default)]
struct State {
    orders: HashMap<OrderId, Order>,
    lines: HashMap<OrderId, Vec<OrderLine>>,
    notifications: HashMap<UserId, Vec<Notification>>,
}

impl StoreView for State {
    fn status(&self, order_id: OrderId) -> StoreResult<Option<OrderStatus>> {
        Ok(self.orders.get(&order_id).map(|o| o.status))
    }

    fn has_notification(&self, user_id: UserId, id: NotificationId) -> StoreResult<bool> {
        Ok(self
            .notifications
            .get(&user_id)
            .is_some_and(|inbox| inbox.iter().any(|n| n.id == id)))
    }
}

impl State {
    // Only called after `UnitOfWork::check` passed under the same write lock.
    fn apply(&mut self, write: Write) {
        match write {
            Write::InsertOrder(order) => {
                self.orders.insert(order.id, order);
            }
            Write::InsertLine(line) => {
                let lines = self.lines.entry(line.order_id).or_default();
                lines.push(line);
                lines.sort_by_key(|l| l.position);
            }
            Write::InsertNotification(notification) => {
                self.notifications
                    .entry(notification.user_id)
                    .or_default()
                    .push(notification);
            }
            Write::UpdateStatus {
                order_id, new, at, ..
            } => {
                if let Some(order) = self.orders.get_mut(&order_id) {
                    order.status = new;
                    order.updated_at = at;
                }
            }
            Write::MarkNotificationRead {
                user_id,
                notification_id,
            } => {
                if let Some(n) = self
                    .notifications
                    .get_mut(&user_id)
                    .and_then(|inbox| inbox.iter_mut().find(|n| n.id == notification_id))
                {
                    n.read = true;
                }
            }
        }
    }
}

/// A thread-safe in-memory order store.
///
/// Uses a single `Arc<RwLock<..>>` over all tables so a commit checks and
/// applies a unit of work under one write lock. Ideal for testing or
/// deployments where persistence is not required.
#[derive(Default, Clone)]
pub struct InMemoryOrderStore {
    state: Arc<RwLock<State>>,
    order_seq: Arc<AtomicU64>,
    notification_seq: Arc<AtomicU64>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn next_id(&self, sequence: Sequence) -> StoreResult<u64> {
        let counter = match sequence {
            Sequence::Order => &self.order_seq,
            Sequence::Notification => &self.notification_seq,
        };
        Ok(counter.fetch_add(1, Ordering::SeqCst) + 1)
    }

    async fn commit(&self, unit: UnitOfWork) -> StoreResult<()> {
        let mut state = self.state.write().await;
        unit.check(&*state)?;
        for write in unit.into_writes() {
            state.apply(write);
        }
        Ok(())
    }

    async fn order(&self, id: OrderId) -> StoreResult<Option<Order>> {
        let state = self.state.read().await;
        Ok(state.orders.get(&id).cloned())
    }

    async fn lines(&self, order_id: OrderId) -> StoreResult<Vec<OrderLine>> {
        let state = self.state.read().await;
        Ok(state.lines.get(&order_id).cloned().unwrap_or_default())
    }

    async fn orders(&self, user_id: Option<UserId>) -> StoreResult<Vec<Order>> {
        let state = self.state.read().await;
        let mut orders: Vec<Order> = state
            .orders
            .values()
            .filter(|o| user_id.is_none_or(|user| o.user_id == user))
            .cloned()
            .collect();
        orders.sort_by_key(|o| o.id);
        Ok(orders)
    }

    async fn notifications(&self, user_id: UserId) -> StoreResult<Vec<Notification>> {
        let state = self.state.read().await;
        Ok(state.notifications.get(&user_id).cloned().unwrap_or_default())
    }
}
