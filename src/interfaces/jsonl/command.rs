use crate::application::service::OrderService;
use crate::domain::caller::Caller;
use crate::domain::notification::{Notification, NotificationId};
use crate::domain::order::{OrderDetails, OrderFilter, OrderId};
use crate::domain::request::CreateOrderRequest;
use crate::domain::status::OrderStatus;
use crate::error::OrderError;
use serde::{Deserialize, Serialize};

/// One operation in a command stream, tagged by `op`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Command {
    CreateOrder {
        caller: Caller,
        request: CreateOrderRequest,
    },
    GetOrder {
        caller: Caller,
        order_id: OrderId,
    },
    ListOrders {
        caller: Caller,
        #[serde(default)]
        filter: OrderFilter,
    },
    TransitionStatus {
        caller: Caller,
        order_id: OrderId,
        status: OrderStatus,
    },
    CancelOrder {
        caller: Caller,
        order_id: OrderId,
    },
    ListNotifications {
        caller: Caller,
        #[serde(default)]
        unread_only: bool,
    },
    MarkNotificationRead {
        caller: Caller,
        notification_id: NotificationId,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Payload {
    Order(OrderDetails),
    Orders(Vec<OrderDetails>),
    Notification(Notification),
    Notifications(Vec<Notification>),
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub kind: &'static str,
    pub message: String,
}

impl From<&OrderError> for ErrorBody {
    fn from(err: &OrderError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Exactly one response is produced per command.
#[derive(Debug, Serialize)]
pub struct Response {
    pub op: &'static str,
    pub ok: bool,
    #[serde(flatten)]
    pub payload: Option<Payload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl Response {
    pub fn failure(op: &'static str, err: &OrderError) -> Self {
        Self {
            op,
            ok: false,
            payload: None,
            error: Some(ErrorBody::from(err)),
        }
    }
}

impl Command {
    /// Every `op` tag accepted on the wire.
    pub const OPS: [&'static str; 7] = [
        "create_order",
        "get_order",
        "list_orders",
        "transition_status",
        "cancel_order",
        "list_notifications",
        "mark_notification_read",
    ];

    /// The static name of a known `op` tag.
    pub fn op(tag: &str) -> Option<&'static str> {
        Self::OPS.into_iter().find(|op| *op == tag)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::CreateOrder { .. } => "create_order",
            Command::GetOrder { .. } => "get_order",
            Command::ListOrders { .. } => "list_orders",
            Command::TransitionStatus { .. } => "transition_status",
            Command::CancelOrder { .. } => "cancel_order",
            Command::ListNotifications { .. } => "list_notifications",
            Command::MarkNotificationRead { .. } => "mark_notification_read",
        }
    }

    pub async fn execute(self, service: &OrderService) -> Response {
        let op = self.name();
        let result = match self {
            Command::CreateOrder { caller, request } => service
                .create_order(&caller, request)
                .await
                .map(Payload::Order),
            Command::GetOrder { caller, order_id } => service
                .get_order(&caller, order_id)
                .await
                .map(Payload::Order),
            Command::ListOrders { caller, filter } => service
                .list_orders(&caller, &filter)
                .await
                .map(Payload::Orders),
            Command::TransitionStatus {
                caller,
                order_id,
                status,
            } => service
                .transition_status(&caller, order_id, status)
                .await
                .map(Payload::Order),
            Command::CancelOrder { caller, order_id } => service
                .cancel_own_order(&caller, order_id)
                .await
                .map(Payload::Order),
            Command::ListNotifications {
                caller,
                unread_only,
            } => service
                .list_notifications(&caller, unread_only)
                .await
                .map(Payload::Notifications),
            Command::MarkNotificationRead {
                caller,
                notification_id,
            } => service
                .mark_notification_read(&caller, notification_id)
                .await
                .map(Payload::Notification),
        };

        match result {
            Ok(payload) => Response {
                op,
                ok: true,
                payload: Some(payload),
                error: None,
            },
            Err(err) => {
                tracing::warn!(op, kind = err.kind(), "{}", err);
                Response::failure(op, &err)
            }
        }
    }
}
