use super::caller::UserId;
use super::catalog::{Product, ProductId};
use super::notification::Notification;
use super::order::{Order, OrderId, OrderLine};
use super::unit_of_work::UnitOfWork;
use crate::error::StoreResult;
use async_trait::async_trait;

/// Read-only view of the product catalog.
#[async_trait]
pub trait Catalog: Send + Sync {
    async fn product(&self, id: ProductId) -> StoreResult<Option<Product>>;
}

/// Identifier sequences owned by the order store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sequence {
    Order,
    Notification,
}

/// Durable home of orders, order lines and notifications.
///
/// All mutations go through [`OrderStore::commit`], which applies a
/// [`UnitOfWork`] entirely or not at all.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Allocates the next identifier. Identifiers are never handed out twice,
    /// even when the unit of work they were allocated for is abandoned.
    async fn next_id(&self, sequence: Sequence) -> StoreResult<u64>;

    async fn commit(&self, unit: UnitOfWork) -> StoreResult<()>;

    async fn order(&self, id: OrderId) -> StoreResult<Option<Order>>;

    /// Lines of an order, in their original position order.
    async fn lines(&self, order_id: OrderId) -> StoreResult<Vec<OrderLine>>;

    /// Orders of one user, or every order when `user_id` is `None`.
    async fn orders(&self, user_id: Option<UserId>) -> StoreResult<Vec<Order>>;

    async fn notifications(&self, user_id: UserId) -> StoreResult<Vec<Notification>>;
}

pub type CatalogBox = Box<dyn Catalog>;
pub type OrderStoreBox = Box<dyn OrderStore>;
