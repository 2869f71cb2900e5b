use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{CartItemId, ProductId, UserId};

/// A pending purchase intent in a user's cart.
///
/// There is at most one row per (user, product) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: CartItemId,
    pub user_id: UserId,
    pub product_id: ProductId,
    pub quantity: u32,
    pub added_at: DateTime<Utc>,
}

impl CartItem {
    /// Creates a new cart row added now.
    pub fn new(user_id: UserId, product_id: ProductId, quantity: u32) -> Self {
        Self {
            id: CartItemId::new(),
            user_id,
            product_id,
            quantity,
            added_at: Utc::now(),
        }
    }
}
