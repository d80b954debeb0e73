//! Domain layer: order and notification entities, money, the status state
//! machine, the pricing engine and the ports implemented by infrastructure.

pub mod caller;
pub mod catalog;
pub mod money;
pub mod notification;
pub mod order;
pub mod ports;
pub mod pricing;
pub mod request;
pub mod status;
pub mod unit_of_work;
