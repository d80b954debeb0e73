use super::money::Money;
use serde::{Deserialize, Serialize};

pub type ProductId = u32;

/// A catalog entry as seen by the ordering core at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: Money,
    pub available: bool,
}

/// Live product data attached to an order line when the order is read back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSummary {
    pub id: ProductId,
    pub name: String,
    pub price: Money,
    pub available: bool,
}

impl From<Product> for ProductSummary {
    fn from(product: Product) -> Self {
        Self {
            id: product.id,
            name: product.name,
            price: product.price,
            available: product.available,
        }
    }
}
