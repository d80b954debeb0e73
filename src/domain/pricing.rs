use super::catalog::ProductId;
use super::money::Money;
use super::order::Customizations;
use super::ports::Catalog;
use super::request::OrderItemRequest;
use crate::error::{OrderError, Result};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Fee schedule applied by the [`PricingEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricingConfig {
    /// Orders whose subtotal is below this amount are rejected.
    pub minimum_order: Money,
    /// Flat fee added to every order.
    pub delivery_fee: Money,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            minimum_order: Money::new(dec!(2.00)),
            delivery_fee: Money::new(dec!(1.00)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PricedLine {
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: Money,
    pub subtotal: Money,
    pub customizations: Option<Customizations>,
    pub special_notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PricedOrder {
    pub lines: Vec<PricedLine>,
    pub subtotal: Money,
    pub delivery_fee: Money,
    pub total: Money,
}

/// Validates requested lines against the catalog and computes totals.
///
/// Prices always come from the catalog, never from the request. The engine
/// only reads; persisting the result is the caller's business.
#[derive(Debug, Clone, Default)]
pub struct PricingEngine {
    config: PricingConfig,
}

impl PricingEngine {
    pub fn new(config: PricingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PricingConfig {
        &self.config
    }

    pub async fn price(
        &self,
        catalog: &dyn Catalog,
        items: &[OrderItemRequest],
    ) -> Result<PricedOrder> {
        if items.is_empty() {
            return Err(OrderError::EmptyOrder);
        }

        let mut lines = Vec::with_capacity(items.len());
        let mut subtotal = Money::ZERO;

        for item in items {
            let product = catalog
                .product(item.product_id)
                .await
                .map_err(OrderError::internal)?
                .ok_or(OrderError::ProductNotFound(item.product_id))?;

            if !product.available {
                return Err(OrderError::ProductUnavailable {
                    product_id: product.id,
                    name: product.name,
                });
            }

            let quantity = item.quantity();
            let line_subtotal = product
                .price
                .checked_mul(quantity)
                .ok_or_else(|| overflow(item.product_id))?;
            subtotal = subtotal
                .checked_add(line_subtotal)
                .ok_or_else(|| overflow(item.product_id))?;

            lines.push(PricedLine {
                product_id: product.id,
                quantity,
                unit_price: product.price,
                subtotal: line_subtotal,
                customizations: item.customizations.clone(),
                special_notes: item.special_notes.clone(),
            });
        }

        if subtotal < self.config.minimum_order {
            return Err(OrderError::MinimumOrderNotMet {
                minimum: self.config.minimum_order,
                subtotal,
            });
        }

        let delivery_fee = self.config.delivery_fee;
        let total = subtotal
            .checked_add(delivery_fee)
            .ok_or_else(|| OrderError::ValidationError("order total is too large".to_string()))?;

        tracing::debug!(lines = lines.len(), %subtotal, %total, "order priced");

        Ok(PricedOrder {
            lines,
            subtotal,
            delivery_fee,
            total,
        })
    }
}

fn overflow(product_id: ProductId) -> OrderError {
    OrderError::ValidationError(format!("quantity for product {} is too large", product_id))
}
