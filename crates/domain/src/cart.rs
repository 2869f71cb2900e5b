//! Shopping cart rules.
//!
//! Stock checks here are advisory: they keep a cart from asking for more
//! than is on the shelf right now, but the authoritative check is the
//! locked one taken when the order is placed.

use common::{CartItem, CartItemId, Money, ProductId, UserId};
use serde::Serialize;
use store::{Store, StoreExt};

use crate::error::{DomainError, Result};

/// A cart row joined with its live product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartLine {
    pub item_id: CartItemId,
    pub product_id: ProductId,
    pub product_name: String,
    pub unit_price: Money,
    pub quantity: u32,
    pub subtotal: Money,
    pub stock: u32,
    pub is_active: bool,
}

/// A user's cart with totals at current prices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartView {
    pub items: Vec<CartLine>,
    pub total_price: Money,
    pub total_count: u32,
}

fn out_of_range() -> DomainError {
    DomainError::Validation("cart total is out of range".to_string())
}

/// Service for managing a user's cart.
#[derive(Debug, Clone)]
pub struct CartService<S: Store> {
    store: S,
}

impl<S: Store> CartService<S> {
    /// Creates a new cart service over the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns the user's cart, oldest row first.
    #[tracing::instrument(skip(self))]
    pub async fn cart(&self, user_id: UserId) -> Result<CartView> {
        let rows = self.store.cart_items(user_id).await?;

        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            // Rows vanish with their product; a miss here is a concurrent delete.
            let Some(product) = self.store.get_product(row.product_id).await? else {
                continue;
            };
            let subtotal = product
                .price
                .checked_mul(row.quantity)
                .ok_or_else(out_of_range)?;
            items.push(CartLine {
                item_id: row.id,
                product_id: product.id,
                subtotal,
                product_name: product.name,
                unit_price: product.price,
                quantity: row.quantity,
                stock: product.stock,
                is_active: product.is_active,
            });
        }

        Ok(CartView {
            total_price: Money::checked_sum(items.iter().map(|line| line.subtotal))
                .ok_or_else(out_of_range)?,
            total_count: items
                .iter()
                .fold(0u32, |acc, line| acc.saturating_add(line.quantity)),
            items,
        })
    }

    /// Adds units of a product to the user's cart.
    ///
    /// Re-adding a product increases the existing row. The combined
    /// quantity may not exceed the product's current stock.
    #[tracing::instrument(skip(self))]
    pub async fn add_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<CartItem> {
        if quantity == 0 {
            return Err(DomainError::Validation(
                "quantity must be greater than 0".to_string(),
            ));
        }

        let product = self
            .store
            .active_product(product_id)
            .await?
            .ok_or(DomainError::ProductNotFound(product_id))?;

        if let Some(item) = self
            .store
            .add_to_cart(user_id, product_id, quantity, product.stock)
            .await?
        {
            return Ok(item);
        }

        let in_cart = self
            .store
            .cart_items(user_id)
            .await?
            .into_iter()
            .find(|item| item.product_id == product_id)
            .map_or(0, |item| item.quantity);

        Err(DomainError::InsufficientStock {
            product_id,
            product_name: product.name,
            requested: in_cart.saturating_add(quantity),
            available: product.stock,
        })
    }

    /// Sets the quantity of a cart row; zero removes it.
    ///
    /// Returns the updated row, or `None` if it was removed.
    #[tracing::instrument(skip(self))]
    pub async fn update_item(
        &self,
        user_id: UserId,
        item_id: CartItemId,
        quantity: u32,
    ) -> Result<Option<CartItem>> {
        let item = self
            .store
            .cart_item(user_id, item_id)
            .await?
            .ok_or(DomainError::CartItemNotFound)?;

        if quantity == 0 {
            self.remove_item(user_id, item_id).await?;
            return Ok(None);
        }

        let product = self
            .store
            .active_product(item.product_id)
            .await?
            .ok_or(DomainError::ProductNotFound(item.product_id))?;

        if !product.has_stock_for(quantity) {
            return Err(DomainError::InsufficientStock {
                product_id: product.id,
                product_name: product.name,
                requested: quantity,
                available: product.stock,
            });
        }

        self.store
            .set_cart_quantity(user_id, item_id, quantity)
            .await?
            .map(Some)
            .ok_or(DomainError::CartItemNotFound)
    }

    /// Removes one row from the user's cart.
    #[tracing::instrument(skip(self))]
    pub async fn remove_item(&self, user_id: UserId, item_id: CartItemId) -> Result<()> {
        if self.store.delete_cart_item(user_id, item_id).await? {
            Ok(())
        } else {
            Err(DomainError::CartItemNotFound)
        }
    }

    /// Empties the user's cart, returning how many rows were removed.
    #[tracing::instrument(skip(self))]
    pub async fn clear(&self, user_id: UserId) -> Result<u64> {
        Ok(self.store.clear_cart(user_id).await?)
    }
}
