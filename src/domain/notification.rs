use super::caller::UserId;
use super::order::OrderId;
use super::status::OrderStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type NotificationId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationType {
    Order,
    Promo,
    System,
}

/// A user-facing message in a user's inbox.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub user_id: UserId,
    pub order_id: Option<OrderId>,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: NotificationType,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// Builds the unread notification for an order that just entered `status`.
    pub fn order_status(
        id: NotificationId,
        user_id: UserId,
        order_id: OrderId,
        status: OrderStatus,
        created_at: DateTime<Utc>,
    ) -> Self {
        let (title, message) = status.notification_text(order_id);
        Self {
            id,
            user_id,
            order_id: Some(order_id),
            title,
            message,
            kind: NotificationType::Order,
            read: false,
            created_at,
        }
    }
}
