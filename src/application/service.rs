use crate::domain::caller::Caller;
use crate::domain::notification::{Notification, NotificationId};
use crate::domain::order::{Order, OrderDetails, OrderFilter, OrderId, OrderLine, OrderLineView};
use crate::domain::ports::{CatalogBox, OrderStoreBox, Sequence};
use crate::domain::pricing::PricingEngine;
use crate::domain::request::CreateOrderRequest;
use crate::domain::status::OrderStatus;
use crate::domain::unit_of_work::{NewOrder, UnitOfWork, Write};
use crate::error::{OrderError, Result, StoreError};
use chrono::Utc;
use tracing::{debug, info, warn};

/// The entry point for the ordering workflow.
///
/// `OrderService` composes the pricing engine, the order store and the
/// status state machine. It holds no mutable state of its own: every
/// request is independent, and each write path is a single unit of work
/// committed once against the store.
pub struct OrderService {
    catalog: CatalogBox,
    store: OrderStoreBox,
    pricing: PricingEngine,
}

impl OrderService {
    /// Creates a new `OrderService`.
    ///
    /// # Arguments
    ///
    /// * `catalog` - Read-only product lookup used for pricing and hydration.
    /// * `store` - Durable home of orders, lines and notifications.
    /// * `pricing` - Engine carrying the fee schedule.
    pub fn new(catalog: CatalogBox, store: OrderStoreBox, pricing: PricingEngine) -> Self {
        Self {
            catalog,
            store,
            pricing,
        }
    }

    /// Validates, prices and persists a new order for `caller`.
    ///
    /// Every business rule is checked before anything is written. The order,
    /// its lines and the confirmation notification are committed together.
    pub async fn create_order(
        &self,
        caller: &Caller,
        request: CreateOrderRequest,
    ) -> Result<OrderDetails> {
        let request = request.validate()?;
        let priced = self.pricing.price(self.catalog.as_ref(), &request.items).await?;

        let order_id = self.next_id(Sequence::Order).await?;
        let notification_id = self.next_id(Sequence::Notification).await?;
        let new_order = NewOrder {
            id: order_id,
            notification_id,
            user_id: caller.user_id,
            delivery_location: request.delivery_location,
            payment_method: request.payment_method,
            notes: request.notes,
            priced,
            at: Utc::now(),
        };

        let (order, lines) = self
            .atomically(|unit| Ok(unit.create_order(new_order)))
            .await?;

        info!(
            order_id = order.id,
            user_id = order.user_id,
            total = %order.total,
            lines = lines.len(),
            "order created"
        );
        Ok(self.hydrate(order, lines).await)
    }

    /// Orders visible to `caller`, newest first. Administrators see everyone's.
    pub async fn list_orders(
        &self,
        caller: &Caller,
        filter: &OrderFilter,
    ) -> Result<Vec<OrderDetails>> {
        let owner = if caller.is_admin() {
            None
        } else {
            Some(caller.user_id)
        };

        let mut orders: Vec<Order> = self
            .store
            .orders(owner)
            .await
            .map_err(OrderError::internal)?
            .into_iter()
            .filter(|order| filter.matches(order))
            .collect();
        orders.sort_by(|a, b| b.id.cmp(&a.id));

        let mut details = Vec::with_capacity(orders.len());
        for order in orders {
            let lines = self.lines(order.id).await?;
            details.push(self.hydrate(order, lines).await);
        }
        Ok(details)
    }

    pub async fn get_order(&self, caller: &Caller, order_id: OrderId) -> Result<OrderDetails> {
        let order = self.load(order_id).await?;
        if !caller.can_see(order.user_id) {
            return Err(OrderError::OrderAccessDenied(order_id));
        }
        let lines = self.lines(order_id).await?;
        Ok(self.hydrate(order, lines).await)
    }

    /// Administrative status change following the transition table.
    pub async fn transition_status(
        &self,
        caller: &Caller,
        order_id: OrderId,
        new_status: OrderStatus,
    ) -> Result<OrderDetails> {
        if !caller.is_admin() {
            return Err(OrderError::OrderAccessDenied(order_id));
        }

        let order = self.load(order_id).await?;
        if !order.status.can_transition_to(new_status) {
            return Err(OrderError::InvalidStatusTransition {
                from: order.status,
                to: new_status,
            });
        }

        self.apply_transition(order, new_status).await
    }

    /// Cancellation by the order's owner, allowed only while PENDING.
    pub async fn cancel_own_order(
        &self,
        caller: &Caller,
        order_id: OrderId,
    ) -> Result<OrderDetails> {
        let order = self.load(order_id).await?;
        if order.user_id != caller.user_id {
            return Err(OrderError::OrderAccessDenied(order_id));
        }
        if order.status != OrderStatus::Pending {
            return Err(OrderError::OrderCannotBeCancelled {
                order_id,
                status: order.status,
            });
        }

        self.apply_transition(order, OrderStatus::Cancelled)
            .await
            .map_err(|err| match err {
                // Lost a race against another transition.
                OrderError::InvalidStatusTransition { from, .. } => {
                    OrderError::OrderCannotBeCancelled {
                        order_id,
                        status: from,
                    }
                }
                other => other,
            })
    }

    /// The caller's notifications, newest first.
    pub async fn list_notifications(
        &self,
        caller: &Caller,
        unread_only: bool,
    ) -> Result<Vec<Notification>> {
        let mut notifications = self
            .store
            .notifications(caller.user_id)
            .await
            .map_err(OrderError::internal)?;
        notifications.retain(|n| !unread_only || !n.read);
        notifications.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(notifications)
    }

    pub async fn mark_notification_read(
        &self,
        caller: &Caller,
        notification_id: NotificationId,
    ) -> Result<Notification> {
        let user_id = caller.user_id;
        self.atomically(|unit| {
            unit.push(Write::MarkNotificationRead {
                user_id,
                notification_id,
            });
            Ok(())
        })
        .await?;

        self.list_notifications(caller, false)
            .await?
            .into_iter()
            .find(|n| n.id == notification_id)
            .ok_or(OrderError::NotificationNotFound(notification_id))
    }

    async fn apply_transition(
        &self,
        order: Order,
        new_status: OrderStatus,
    ) -> Result<OrderDetails> {
        let notification_id = self.next_id(Sequence::Notification).await?;
        let from = order.status;

        let updated = self
            .atomically(|unit| {
                Ok(unit.update_status(&order, new_status, notification_id, Utc::now()))
            })
            .await?;

        info!(
            order_id = updated.id,
            from = %from,
            to = %new_status,
            "order status changed"
        );
        let lines = self.lines(updated.id).await?;
        Ok(self.hydrate(updated, lines).await)
    }

    /// Runs `build` against a fresh unit of work and commits it exactly once.
    ///
    /// If `build` fails the unit is dropped and nothing is written.
    async fn atomically<T, F>(&self, build: F) -> Result<T>
    where
        F: FnOnce(&mut UnitOfWork) -> Result<T>,
    {
        let mut unit = UnitOfWork::new();
        let value = build(&mut unit)?;
        debug!(writes = unit.writes().len(), "committing unit of work");
        self.store.commit(unit).await.map_err(commit_error)?;
        Ok(value)
    }

    async fn next_id(&self, sequence: Sequence) -> Result<u64> {
        self.store
            .next_id(sequence)
            .await
            .map_err(OrderError::internal)
    }

    async fn load(&self, order_id: OrderId) -> Result<Order> {
        self.store
            .order(order_id)
            .await
            .map_err(OrderError::internal)?
            .ok_or(OrderError::OrderNotFound(order_id))
    }

    async fn lines(&self, order_id: OrderId) -> Result<Vec<OrderLine>> {
        self.store
            .lines(order_id)
            .await
            .map_err(OrderError::internal)
    }

    /// Attaches live product summaries to each line. A catalog failure only
    /// drops the summary; the order itself is already authoritative.
    async fn hydrate(&self, order: Order, lines: Vec<OrderLine>) -> OrderDetails {
        let mut views = Vec::with_capacity(lines.len());
        for line in lines {
            let product = match self.catalog.product(line.product_id).await {
                Ok(product) => product.map(Into::into),
                Err(err) => {
                    warn!(product_id = line.product_id, error = %err, "product lookup failed");
                    None
                }
            };
            views.push(OrderLineView { line, product });
        }
        OrderDetails { order, lines: views }
    }
}

fn commit_error(err: StoreError) -> OrderError {
    match err {
        StoreError::OrderMissing(id) => OrderError::OrderNotFound(id),
        StoreError::NotificationMissing(id) => OrderError::NotificationNotFound(id),
        StoreError::StaleStatus {
            order_id,
            actual,
            attempted,
            ..
        } => {
            warn!(order_id, %actual, %attempted, "status changed concurrently");
            OrderError::InvalidStatusTransition {
                from: actual,
                to: attempted,
            }
        }
        other => OrderError::internal(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::Product;
    use crate::domain::money::Money;
    use crate::domain::request::OrderItemRequest;
    use crate::infrastructure::in_memory::{InMemoryCatalog, InMemoryOrderStore};
    use rust_decimal_macros::dec;

    fn service() -> OrderService {
        let catalog = InMemoryCatalog::from_products(vec![Product {
            id: 1,
            name: "Flat White".to_string(),
            price: Money::new(dec!(3.50)),
            available: true,
        }]);
        OrderService::new(
            Box::new(catalog),
            Box::new(InMemoryOrderStore::new()),
            PricingEngine::default(),
        )
    }

    fn request() -> CreateOrderRequest {
        CreateOrderRequest {
            items: vec![OrderItemRequest::new(1, 2)],
            delivery_location: "Student Center".to_string(),
            payment_method: "CASH".to_string(),
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_create_order_scenario() {
        let service = service();
        let details = service
            .create_order(&Caller::customer(7), request())
            .await
            .unwrap();

        assert_eq!(details.order.status, OrderStatus::Pending);
        assert_eq!(details.order.subtotal, Money::new(dec!(7.00)));
        assert_eq!(details.order.delivery_fee, Money::new(dec!(1.00)));
        assert_eq!(details.order.total, Money::new(dec!(8.00)));
        assert_eq!(details.lines.len(), 1);
        assert_eq!(
            details.lines[0].product.as_ref().map(|p| p.name.as_str()),
            Some("Flat White")
        );
    }

    #[tokio::test]
    async fn test_validation_runs_before_pricing() {
        let service = service();
        let mut req = request();
        req.items.clear();
        req.payment_method = "IOU".to_string();

        let err = service
            .create_order(&Caller::customer(7), req)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_transition_requires_admin() {
        let service = service();
        let order = service
            .create_order(&Caller::customer(7), request())
            .await
            .unwrap();

        let err = service
            .transition_status(&Caller::customer(7), order.order.id, OrderStatus::Preparing)
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::OrderAccessDenied(_)));
    }

    #[test]
    fn test_stale_commit_maps_to_invalid_transition() {
        let err = commit_error(StoreError::StaleStatus {
            order_id: 1,
            expected: OrderStatus::Pending,
            actual: OrderStatus::Cancelled,
            attempted: OrderStatus::Preparing,
        });
        assert!(matches!(
            err,
            OrderError::InvalidStatusTransition {
                from: OrderStatus::Cancelled,
                to: OrderStatus::Preparing
            }
        ));
    }

    #[tokio::test]
    async fn test_mark_notification_read() {
        let service = service();
        let caller = Caller::customer(7);
        service.create_order(&caller, request()).await.unwrap();

        let unread = service.list_notifications(&caller, true).await.unwrap();
        assert_eq!(unread.len(), 1);

        let read = service
            .mark_notification_read(&caller, unread[0].id)
            .await
            .unwrap();
        assert!(read.read);
        assert!(service.list_notifications(&caller, true).await.unwrap().is_empty());

        let err = service
            .mark_notification_read(&Caller::customer(8), unread[0].id)
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::NotificationNotFound(_)));
    }
}
