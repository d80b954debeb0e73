//! Order status state machine.
//!
//! Legal transitions and the notification sent on entering each state are
//! static tables indexed by status, so the whole machine can be checked
//! exhaustively rather than read out of scattered branches.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Preparing,
    Ready,
    Delivered,
    Cancelled,
}

const STATE_COUNT: usize = 5;

/// `TRANSITIONS[from][to]` is true iff `from -> to` is allowed.
const TRANSITIONS: [[bool; STATE_COUNT]; STATE_COUNT] = [
    // to: Pending, Preparing, Ready, Delivered, Cancelled
    [false, true, false, false, true],  // from Pending
    [false, false, true, false, true],  // from Preparing
    [false, false, false, true, true],  // from Ready
    [false, false, false, false, false], // from Delivered
    [false, false, false, false, false], // from Cancelled
];

/// Title and message shown to the owner when an order enters a state.
/// `{order}` is replaced with the order id.
const TEMPLATES: [(&str, &str); STATE_COUNT] = [
    ("Order confirmed", "Your order #{order} has been placed and is awaiting preparation."),
    ("Order being prepared", "Your order #{order} is being prepared."),
    ("Order ready", "Your order #{order} is ready for pickup."),
    ("Order delivered", "Your order #{order} has been delivered. Enjoy!"),
    ("Order cancelled", "Your order #{order} has been cancelled."),
];

impl OrderStatus {
    pub const ALL: [OrderStatus; STATE_COUNT] = [
        OrderStatus::Pending,
        OrderStatus::Preparing,
        OrderStatus::Ready,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    fn index(self) -> usize {
        self as usize
    }

    pub fn can_transition_to(self, to: OrderStatus) -> bool {
        TRANSITIONS[self.index()][to.index()]
    }

    pub fn is_terminal(self) -> bool {
        OrderStatus::ALL
            .iter()
            .all(|to| !self.can_transition_to(*to))
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Preparing => "PREPARING",
            OrderStatus::Ready => "READY",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }

    /// Notification text for an order that has just entered this status.
    pub fn notification_text(self, order_id: u64) -> (String, String) {
        let (title, message) = TEMPLATES[self.index()];
        (
            title.to_string(),
            message.replace("{order}", &order_id.to_string()),
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown order status '{}'", s))
    }
}
