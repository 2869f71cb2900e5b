//! Catalog and address book records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{AddressId, CategoryId, Money, ProductId, UserId};

/// A product category. Slugs are unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
}

impl Category {
    pub fn new(name: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            id: CategoryId::new(),
            name: name.into(),
            slug: slug.into(),
        }
    }
}

/// A purchasable product.
///
/// `stock` is only changed through the stock adjustment primitive of a
/// unit of work, never written directly by request handlers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: Money,
    pub stock: u32,
    pub is_active: bool,
    pub category_id: Option<CategoryId>,
}

impl Product {
    /// Creates an active product with a fresh id.
    pub fn new(name: impl Into<String>, price: Money, stock: u32) -> Self {
        Self {
            id: ProductId::new(),
            name: name.into(),
            price,
            stock,
            is_active: true,
            category_id: None,
        }
    }

    /// Files the product under `category`.
    pub fn with_category(mut self, category: CategoryId) -> Self {
        self.category_id = Some(category);
        self
    }

    /// Returns true if `quantity` units can be taken from current stock.
    pub fn has_stock_for(&self, quantity: u32) -> bool {
        quantity <= self.stock
    }
}

/// A user's address book entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub id: AddressId,
    pub user_id: UserId,
    pub recipient_name: String,
    pub phone: String,
    pub province: String,
    pub city: String,
    pub district: String,
    pub street: String,
}

/// A product marked as a favorite by a user. At most one per pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Favorite {
    pub user_id: UserId,
    pub product_id: ProductId,
    pub created_at: DateTime<Utc>,
}
