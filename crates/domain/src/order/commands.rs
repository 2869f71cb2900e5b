//! Order commands.

use common::{AddressId, ProductId, UserId};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, Result};

/// One requested line of a new order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRequest {
    pub product_id: ProductId,
    pub quantity: u32,
}

impl LineRequest {
    /// Creates a new line request.
    pub fn new(product_id: ProductId, quantity: u32) -> Self {
        Self {
            product_id,
            quantity,
        }
    }
}

/// Command to place a new order.
#[derive(Debug, Clone)]
pub struct PlaceOrder {
    /// The user placing the order.
    pub user_id: UserId,

    /// The address to ship to; must belong to `user_id`.
    pub address_id: AddressId,

    /// The requested lines, in the order the user listed them.
    pub items: Vec<LineRequest>,
}

impl PlaceOrder {
    /// Creates a new PlaceOrder command.
    pub fn new(user_id: UserId, address_id: AddressId, items: Vec<LineRequest>) -> Self {
        Self {
            user_id,
            address_id,
            items,
        }
    }

    /// Adds a requested line.
    pub fn with_item(mut self, product_id: ProductId, quantity: u32) -> Self {
        self.items.push(LineRequest::new(product_id, quantity));
        self
    }

    /// Validates the requested lines and merges repeated products.
    ///
    /// Quantities of a product listed more than once are summed into its
    /// first line, so each product is checked and priced exactly once.
    pub fn merged_lines(&self) -> Result<Vec<LineRequest>> {
        if self.items.is_empty() {
            return Err(DomainError::Validation(
                "an order needs at least one item".to_string(),
            ));
        }

        let mut merged: Vec<LineRequest> = Vec::with_capacity(self.items.len());
        for line in &self.items {
            if line.quantity == 0 {
                return Err(DomainError::Validation(format!(
                    "quantity for product {} must be greater than 0",
                    line.product_id
                )));
            }

            match merged.iter_mut().find(|m| m.product_id == line.product_id) {
                Some(existing) => {
                    existing.quantity =
                        existing.quantity.checked_add(line.quantity).ok_or_else(|| {
                            DomainError::Validation(format!(
                                "quantity for product {} is too large",
                                line.product_id
                            ))
                        })?;
                }
                None => merged.push(*line),
            }
        }

        Ok(merged)
    }
}
