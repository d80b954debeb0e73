//! Staged, all-or-nothing writes against the order store.
//!
//! A [`UnitOfWork`] only records intent. Nothing becomes visible until it is
//! handed to [`OrderStore::commit`](super::ports::OrderStore::commit); dropping
//! it instead discards every staged write.

use super::caller::UserId;
use super::notification::{Notification, NotificationId};
use super::order::{Order, OrderId, OrderLine, PaymentMethod};
use super::pricing::PricedOrder;
use super::status::OrderStatus;
use crate::error::{StoreError, StoreResult};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub enum Write {
    InsertOrder(Order),
    InsertLine(OrderLine),
    InsertNotification(Notification),
    /// Compare-and-swap: only applies if the order is still in `expected`.
    UpdateStatus {
        order_id: OrderId,
        expected: OrderStatus,
        new: OrderStatus,
        at: DateTime<Utc>,
    },
    MarkNotificationRead {
        user_id: UserId,
        notification_id: NotificationId,
    },
}

/// Point reads a store exposes to [`UnitOfWork::check`] while it holds its
/// commit lock.
pub trait StoreView {
    fn status(&self, order_id: OrderId) -> StoreResult<Option<OrderStatus>>;
    fn has_notification(&self, user_id: UserId, id: NotificationId) -> StoreResult<bool>;
}

/// Everything needed to stage a new order.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub id: OrderId,
    pub notification_id: NotificationId,
    pub user_id: UserId,
    pub delivery_location: String,
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
    pub priced: PricedOrder,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct UnitOfWork {
    writes: Vec<Write>,
}

impl UnitOfWork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn writes(&self) -> &[Write] {
        &self.writes
    }

    pub fn into_writes(self) -> Vec<Write> {
        self.writes
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    pub fn push(&mut self, write: Write) {
        self.writes.push(write);
    }

    /// Verifies every precondition of the staged writes against `view`,
    /// taking earlier writes of the same unit into account.
    ///
    /// Stores call this under their commit lock and apply the writes only if
    /// it succeeds.
    pub fn check(&self, view: &impl StoreView) -> StoreResult<()> {
        let mut staged: HashMap<OrderId, OrderStatus> = HashMap::new();
        let status_of = |staged: &HashMap<OrderId, OrderStatus>, id: OrderId| {
            match staged.get(&id) {
                Some(status) => Ok(Some(*status)),
                None => view.status(id),
            }
        };

        for write in &self.writes {
            match write {
                Write::InsertOrder(order) => {
                    if status_of(&staged, order.id)?.is_some() {
                        return Err(StoreError::Integrity(format!(
                            "order {} already exists",
                            order.id
                        )));
                    }
                    staged.insert(order.id, order.status);
                }
                Write::InsertLine(line) => {
                    if status_of(&staged, line.order_id)?.is_none() {
                        return Err(StoreError::Integrity(format!(
                            "line {} references missing order {}",
                            line.position, line.order_id
                        )));
                    }
                }
                Write::InsertNotification(notification) => {
                    if let Some(order_id) = notification.order_id
                        && status_of(&staged, order_id)?.is_none()
                    {
                        return Err(StoreError::OrderMissing(order_id));
                    }
                }
                Write::UpdateStatus {
                    order_id,
                    expected,
                    new,
                    ..
                } => {
                    let actual =
                        status_of(&staged, *order_id)?.ok_or(StoreError::OrderMissing(*order_id))?;
                    if actual != *expected {
                        return Err(StoreError::StaleStatus {
                            order_id: *order_id,
                            expected: *expected,
                            actual,
                            attempted: *new,
                        });
                    }
                    staged.insert(*order_id, *new);
                }
                Write::MarkNotificationRead {
                    user_id,
                    notification_id,
                } => {
                    if !view.has_notification(*user_id, *notification_id)? {
                        return Err(StoreError::NotificationMissing(*notification_id));
                    }
                }
            }
        }
        Ok(())
    }

    /// Stages a PENDING order, one line per priced line and the
    /// confirmation notification. Returns the order as it will be stored.
    pub fn create_order(&mut self, new: NewOrder) -> (Order, Vec<OrderLine>) {
        let order = Order {
            id: new.id,
            user_id: new.user_id,
            status: OrderStatus::Pending,
            delivery_location: new.delivery_location,
            payment_method: new.payment_method,
            subtotal: new.priced.subtotal,
            delivery_fee: new.priced.delivery_fee,
            total: new.priced.total,
            notes: new.notes,
            created_at: new.at,
            updated_at: new.at,
        };
        self.push(Write::InsertOrder(order.clone()));

        let mut lines = Vec::with_capacity(new.priced.lines.len());
        for (position, priced) in new.priced.lines.into_iter().enumerate() {
            let line = OrderLine {
                order_id: new.id,
                position: position as u32,
                product_id: priced.product_id,
                quantity: priced.quantity,
                unit_price: priced.unit_price,
                subtotal: priced.subtotal,
                customizations: priced.customizations,
                special_notes: priced.special_notes,
            };
            self.push(Write::InsertLine(line.clone()));
            lines.push(line);
        }

        self.push(Write::InsertNotification(Notification::order_status(
            new.notification_id,
            new.user_id,
            new.id,
            OrderStatus::Pending,
            new.at,
        )));

        (order, lines)
    }

    /// Stages a status change conditioned on `order`'s current status, plus
    /// the owner's notification. Returns the order as it will be stored.
    pub fn update_status(
        &mut self,
        order: &Order,
        new: OrderStatus,
        notification_id: NotificationId,
        at: DateTime<Utc>,
    ) -> Order {
        self.push(Write::UpdateStatus {
            order_id: order.id,
            expected: order.status,
            new,
            at,
        });
        self.push(Write::InsertNotification(Notification::order_status(
            notification_id,
            order.user_id,
            order.id,
            new,
            at,
        )));

        Order {
            status: new,
            updated_at: at,
            ..order.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::money::Money;
    use crate::domain::pricing::PricedLine;
    use rust_decimal_macros::dec;
    use std::collections::HashSet;

    #[derive(Default)]
    struct FakeView {
        orders: HashMap<OrderId, OrderStatus>,
        notifications: HashSet<(UserId, NotificationId)>,
    }

    impl StoreView for FakeView {
        fn status(&self, order_id: OrderId) -> StoreResult<Option<OrderStatus>> {
            Ok(self.orders.get(&order_id).copied())
        }

        fn has_notification(&self, user_id: UserId, id: NotificationId) -> StoreResult<bool> {
            Ok(self.notifications.contains(&(user_id, id)))
        }
    }

    fn new_order() -> NewOrder {
        let line = |product_id, price| PricedLine {
            product_id,
            quantity: 2,
            unit_price: Money::new(price),
            subtotal: Money::new(price * dec!(2)),
            customizations: None,
            special_notes: None,
        };
        NewOrder {
            id: 5,
            notification_id: 11,
            user_id: 7,
            delivery_location: "Hall 3".to_string(),
            payment_method: PaymentMethod::Card,
            notes: None,
            priced: PricedOrder {
                lines: vec![line(1, dec!(3.50)), line(2, dec!(1.25))],
                subtotal: Money::new(dec!(9.50)),
                delivery_fee: Money::new(dec!(1.00)),
                total: Money::new(dec!(10.50)),
            },
            at: Utc::now(),
        }
    }

    #[test]
    fn test_create_order_stages_header_lines_and_notification() {
        let mut unit = UnitOfWork::new();
        let (order, lines) = unit.create_order(new_order());

        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.total, order.subtotal + order.delivery_fee);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].position, 1);

        let writes = unit.writes();
        assert_eq!(writes.len(), 4);
        assert!(matches!(writes[0], Write::InsertOrder(_)));
        assert!(matches!(writes[1], Write::InsertLine(_)));
        assert!(matches!(writes[2], Write::InsertLine(_)));
        match &writes[3] {
            Write::InsertNotification(n) => {
                assert_eq!(n.order_id, Some(5));
                assert_eq!(n.user_id, 7);
            }
            other => panic!("unexpected write: {:?}", other),
        }
    }

    #[test]
    fn test_update_status_is_conditioned_on_current_status() {
        let mut unit = UnitOfWork::new();
        let (order, _) = unit.create_order(new_order());

        let mut unit = UnitOfWork::new();
        let updated = unit.update_status(&order, OrderStatus::Preparing, 12, Utc::now());

        assert_eq!(updated.status, OrderStatus::Preparing);
        assert_eq!(updated.total, order.total);
        assert!(matches!(
            unit.writes()[0],
            Write::UpdateStatus {
                expected: OrderStatus::Pending,
                new: OrderStatus::Preparing,
                ..
            }
        ));
    }

    #[test]
    fn test_check_accepts_new_order_with_lines() {
        let mut unit = UnitOfWork::new();
        unit.create_order(new_order());
        assert!(unit.check(&FakeView::default()).is_ok());
    }

    #[test]
    fn test_check_rejects_duplicate_order() {
        let mut unit = UnitOfWork::new();
        unit.create_order(new_order());
        let mut view = FakeView::default();
        view.orders.insert(5, OrderStatus::Pending);
        assert!(matches!(unit.check(&view), Err(StoreError::Integrity(_))));
    }

    #[test]
    fn test_check_rejects_orphan_line() {
        let mut unit = UnitOfWork::new();
        let (_, lines) = UnitOfWork::new().create_order(new_order());
        unit.push(Write::InsertLine(lines[0].clone()));
        assert!(matches!(
            unit.check(&FakeView::default()),
            Err(StoreError::Integrity(_))
        ));
    }

    #[test]
    fn test_check_detects_stale_status() {
        let (order, _) = UnitOfWork::new().create_order(new_order());
        let mut unit = UnitOfWork::new();
        unit.update_status(&order, OrderStatus::Preparing, 12, Utc::now());

        let mut view = FakeView::default();
        view.orders.insert(order.id, OrderStatus::Cancelled);
        assert!(matches!(
            unit.check(&view),
            Err(StoreError::StaleStatus {
                actual: OrderStatus::Cancelled,
                ..
            })
        ));

        view.orders.insert(order.id, OrderStatus::Pending);
        assert!(unit.check(&view).is_ok());
    }

    #[test]
    fn test_check_follows_chained_updates() {
        let (order, _) = UnitOfWork::new().create_order(new_order());
        let mut unit = UnitOfWork::new();
        let preparing = unit.update_status(&order, OrderStatus::Preparing, 12, Utc::now());
        unit.update_status(&preparing, OrderStatus::Ready, 13, Utc::now());

        let mut view = FakeView::default();
        view.orders.insert(order.id, OrderStatus::Pending);
        assert!(unit.check(&view).is_ok());
    }

    #[test]
    fn test_check_mark_read_requires_own_notification() {
        let mut unit = UnitOfWork::new();
        unit.push(Write::MarkNotificationRead {
            user_id: 7,
            notification_id: 3,
        });

        let mut view = FakeView::default();
        view.notifications.insert((8, 3));
        assert!(matches!(
            unit.check(&view),
            Err(StoreError::NotificationMissing(3))
        ));

        view.notifications.insert((7, 3));
        assert!(unit.check(&view).is_ok());
    }
}
