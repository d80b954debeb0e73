#![allow(dead_code)]

use async_trait::async_trait;
use campus_orders::application::service::OrderService;
use campus_orders::domain::caller::UserId;
use campus_orders::domain::catalog::Product;
use campus_orders::domain::money::Money;
use campus_orders::domain::notification::Notification;
use campus_orders::domain::order::{Order, OrderId, OrderLine};
use campus_orders::domain::ports::{OrderStore, Sequence};
use campus_orders::domain::pricing::PricingEngine;
use campus_orders::domain::request::{CreateOrderRequest, OrderItemRequest};
use campus_orders::domain::unit_of_work::UnitOfWork;
use campus_orders::error::{StoreError, StoreResult};
use campus_orders::infrastructure::in_memory::{InMemoryCatalog, InMemoryOrderStore};
use rust_decimal_macros::dec;
use std::io::Write;
use std::path::Path;

pub const LATTE: u32 = 1;
pub const COOKIE: u32 = 2;
pub const SOLD_OUT: u32 = 3;

pub fn catalog() -> InMemoryCatalog {
    InMemoryCatalog::from_products(vec![
        Product {
            id: LATTE,
            name: "Latte".to_string(),
            price: Money::new(dec!(3.50)),
            available: true,
        },
        Product {
            id: COOKIE,
            name: "Cookie".to_string(),
            price: Money::new(dec!(1.00)),
            available: true,
        },
        Product {
            id: SOLD_OUT,
            name: "Pumpkin Muffin".to_string(),
            price: Money::new(dec!(2.75)),
            available: false,
        },
    ])
}

/// A service over clones of the given adapters, so tests can inspect them.
pub fn service(catalog: &InMemoryCatalog, store: &InMemoryOrderStore) -> OrderService {
    OrderService::new(
        Box::new(catalog.clone()),
        Box::new(store.clone()),
        PricingEngine::default(),
    )
}

pub fn request(items: Vec<OrderItemRequest>) -> CreateOrderRequest {
    CreateOrderRequest {
        items,
        delivery_location: "Science Library, 2nd floor".to_string(),
        payment_method: "CASH".to_string(),
        notes: None,
    }
}

/// An order store whose commits always fail, as a broken disk would.
#[derive(Default, Clone)]
pub struct FailingStore {
    pub inner: InMemoryOrderStore,
}

#[async_trait]
impl OrderStore for FailingStore {
    async fn next_id(&self, sequence: Sequence) -> StoreResult<u64> {
        self.inner.next_id(sequence).await
    }

    async fn commit(&self, _unit: UnitOfWork) -> StoreResult<()> {
        Err(StoreError::Io(std::io::Error::other(
            "disk quota exceeded on /var/lib/orders",
        )))
    }

    async fn order(&self, id: OrderId) -> StoreResult<Option<Order>> {
        self.inner.order(id).await
    }

    async fn lines(&self, order_id: OrderId) -> StoreResult<Vec<OrderLine>> {
        self.inner.lines(order_id).await
    }

    async fn orders(&self, user_id: Option<UserId>) -> StoreResult<Vec<Order>> {
        self.inner.orders(user_id).await
    }

    async fn notifications(&self, user_id: UserId) -> StoreResult<Vec<Notification>> {
        self.inner.notifications(user_id).await
    }
}

pub fn write_catalog_csv(path: &Path) -> Result<(), std::io::Error> {
    let mut wtr = csv::WriterBuilder::new().from_path(path)?;
    wtr.write_record(["id", "name", "price", "available"])?;
    wtr.write_record(["1", "Latte", "3.50", "true"])?;
    wtr.write_record(["2", "Cookie", "1.00", "true"])?;
    wtr.write_record(["3", "Pumpkin Muffin", "2.75", "false"])?;
    wtr.flush()?;
    Ok(())
}

pub fn write_commands(path: &Path, lines: &[&str]) -> Result<(), std::io::Error> {
    let mut file = std::fs::File::create(path)?;
    for line in lines {
        writeln!(file, "{}", line)?;
    }
    Ok(())
}
