use super::catalog::ProductId;
use super::order::{Customizations, PaymentMethod};
use crate::error::{OrderError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItemRequest {
    pub product_id: ProductId,
    #[serde(default)]
    pub quantity: Option<u32>,
    #[serde(default)]
    pub customizations: Option<Customizations>,
    #[serde(default)]
    pub special_notes: Option<String>,
}

impl OrderItemRequest {
    pub fn new(product_id: ProductId, quantity: u32) -> Self {
        Self {
            product_id,
            quantity: Some(quantity),
            customizations: None,
            special_notes: None,
        }
    }

    pub fn quantity(&self) -> u32 {
        self.quantity.unwrap_or(1)
    }
}

/// Raw input of the create-order operation, before shape validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    #[serde(default)]
    pub items: Vec<OrderItemRequest>,
    #[serde(default)]
    pub delivery_location: String,
    #[serde(default)]
    pub payment_method: String,
    #[serde(default)]
    pub notes: Option<String>,
}

/// A request whose shape has been checked; items may still fail pricing.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRequest {
    pub items: Vec<OrderItemRequest>,
    pub delivery_location: String,
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
}

impl CreateOrderRequest {
    pub fn validate(self) -> Result<ValidatedRequest> {
        let delivery_location = self.delivery_location.trim();
        if delivery_location.is_empty() {
            return Err(OrderError::ValidationError(
                "delivery location is required".to_string(),
            ));
        }

        if self.payment_method.trim().is_empty() {
            return Err(OrderError::ValidationError(
                "payment method is required".to_string(),
            ));
        }
        let payment_method = self
            .payment_method
            .parse::<PaymentMethod>()
            .map_err(OrderError::ValidationError)?;

        if let Some(item) = self.items.iter().find(|item| item.quantity() == 0) {
            return Err(OrderError::ValidationError(format!(
                "quantity for product {} must be at least 1",
                item.product_id
            )));
        }

        let notes = self
            .notes
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());

        Ok(ValidatedRequest {
            items: self.items,
            delivery_location: delivery_location.to_string(),
            payment_method,
            notes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> CreateOrderRequest {
        CreateOrderRequest {
            items: vec![OrderItemRequest::new(1, 2)],
            delivery_location: "  Engineering Block A ".to_string(),
            payment_method: "cash".to_string(),
            notes: Some("   ".to_string()),
        }
    }

    #[test]
    fn test_validate_normalises_fields() {
        let validated = request().validate().unwrap();
        assert_eq!(validated.delivery_location, "Engineering Block A");
        assert_eq!(validated.payment_method, PaymentMethod::Cash);
        assert_eq!(validated.notes, None);
    }

    #[test]
    fn test_validate_requires_location_and_payment() {
        let mut req = request();
        req.delivery_location = " ".to_string();
        assert!(matches!(req.validate(), Err(OrderError::ValidationError(_))));

        let mut req = request();
        req.payment_method = String::new();
        assert!(matches!(req.validate(), Err(OrderError::ValidationError(_))));

        let mut req = request();
        req.payment_method = "CHEQUE".to_string();
        assert!(matches!(req.validate(), Err(OrderError::ValidationError(_))));
    }

    #[test]
    fn test_validate_rejects_zero_quantity() {
        let mut req = request();
        req.items.push(OrderItemRequest::new(2, 0));
        assert!(matches!(req.validate(), Err(OrderError::ValidationError(_))));
    }

    #[test]
    fn test_quantity_defaults_to_one() {
        let item: OrderItemRequest = serde_json::from_str(r#"{"product_id": 4}"#).unwrap();
        assert_eq!(item.quantity(), 1);
    }

    #[test]
    fn test_empty_items_pass_shape_validation() {
        let mut req = request();
        req.items.clear();
        assert!(req.validate().is_ok());
    }
}
