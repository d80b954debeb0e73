use crate::domain::catalog::ProductId;
use crate::domain::money::Money;
use crate::domain::notification::NotificationId;
use crate::domain::order::OrderId;
use crate::domain::status::OrderStatus;
use miette::Diagnostic;
use thiserror::Error;

/// Failures raised by the persistence adapters.
///
/// These never reach a caller as-is: the service logs them and converts them
/// into [`OrderError::InternalFailure`], except for the variants that carry
/// business meaning (`OrderMissing`, `NotificationMissing`, `StaleStatus`).
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[cfg(feature = "storage-rocksdb")]
    #[error("RocksDB error: {0}")]
    RocksDb(#[from] rocksdb::Error),
    #[error("Column family not found: {0}")]
    MissingColumnFamily(&'static str),
    #[error("Order {0} does not exist")]
    OrderMissing(OrderId),
    #[error("Order {order_id} is {actual}, expected {expected} before moving to {attempted}")]
    StaleStatus {
        order_id: OrderId,
        expected: OrderStatus,
        actual: OrderStatus,
        attempted: OrderStatus,
    },
    #[error("Notification {0} does not exist")]
    NotificationMissing(NotificationId),
    #[error("Integrity violation: {0}")]
    Integrity(String),
}

/// Failures reading the CLI's input files.
#[derive(Error, Debug)]
pub enum InputError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid price '{value}': {source}")]
    InvalidPrice {
        value: String,
        #[source]
        source: rust_decimal::Error,
    },
    #[error("Product {product_id} has a negative price '{value}'")]
    NegativePrice { product_id: ProductId, value: String },
    #[error("JSON error on line {line}: {source}")]
    Json {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    /// A line naming a known operation whose payload does not fit it.
    #[error("Malformed '{op}' command on line {line}: {source}")]
    MalformedCommand {
        line: usize,
        op: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Caller-facing error taxonomy of the ordering core.
#[derive(Error, Diagnostic, Debug)]
pub enum OrderError {
    #[error("Invalid request: {0}")]
    #[diagnostic(code(orders::validation_error))]
    ValidationError(String),

    #[error("An order must contain at least one item")]
    #[diagnostic(code(orders::empty_order))]
    EmptyOrder,

    #[error("Product {0} not found")]
    #[diagnostic(code(orders::product_not_found))]
    ProductNotFound(ProductId),

    #[error("Product {name} ({product_id}) is currently unavailable")]
    #[diagnostic(code(orders::product_unavailable))]
    ProductUnavailable { product_id: ProductId, name: String },

    #[error("Minimum order amount is {minimum}, order subtotal is {subtotal}")]
    #[diagnostic(
        code(orders::minimum_order_not_met),
        help("add more items to reach the minimum order amount")
    )]
    MinimumOrderNotMet { minimum: Money, subtotal: Money },

    #[error("Order {0} not found")]
    #[diagnostic(code(orders::order_not_found))]
    OrderNotFound(OrderId),

    #[error("Access to order {0} denied")]
    #[diagnostic(code(orders::order_access_denied))]
    OrderAccessDenied(OrderId),

    #[error("Order {order_id} cannot be cancelled while {status}")]
    #[diagnostic(
        code(orders::order_cannot_be_cancelled),
        help("only pending orders can be cancelled")
    )]
    OrderCannotBeCancelled {
        order_id: OrderId,
        status: OrderStatus,
    },

    #[error("Cannot move order from {from} to {to}")]
    #[diagnostic(code(orders::invalid_status_transition))]
    InvalidStatusTransition { from: OrderStatus, to: OrderStatus },

    #[error("Notification {0} not found")]
    #[diagnostic(code(orders::notification_not_found))]
    NotificationNotFound(NotificationId),

    #[error("Internal failure, please try again later")]
    #[diagnostic(code(orders::internal_failure))]
    InternalFailure,
}

impl OrderError {
    /// Stable machine-readable kind, independent of the message text.
    pub fn kind(&self) -> &'static str {
        match self {
            OrderError::ValidationError(_) => "VALIDATION_ERROR",
            OrderError::EmptyOrder => "EMPTY_ORDER",
            OrderError::ProductNotFound(_) => "PRODUCT_NOT_FOUND",
            OrderError::ProductUnavailable { .. } => "PRODUCT_UNAVAILABLE",
            OrderError::MinimumOrderNotMet { .. } => "MINIMUM_ORDER_NOT_MET",
            OrderError::OrderNotFound(_) => "ORDER_NOT_FOUND",
            OrderError::OrderAccessDenied(_) => "ORDER_ACCESS_DENIED",
            OrderError::OrderCannotBeCancelled { .. } => "ORDER_CANNOT_BE_CANCELLED",
            OrderError::InvalidStatusTransition { .. } => "INVALID_STATUS_TRANSITION",
            OrderError::NotificationNotFound(_) => "NOTIFICATION_NOT_FOUND",
            OrderError::InternalFailure => "INTERNAL_FAILURE",
        }
    }

    /// Converts an adapter failure into a caller-safe error, logging the cause.
    pub fn internal(err: StoreError) -> Self {
        tracing::error!(error = %err, "persistence failure");
        OrderError::InternalFailure
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
pub type Result<T> = std::result::Result<T, OrderError>;
