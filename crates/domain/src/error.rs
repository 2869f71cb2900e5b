//! Domain error types.

use common::{CategoryId, OrderStatus, ProductId};
use store::StoreError;
use thiserror::Error;

/// Errors that can occur during domain operations.
///
/// Every variant except [`DomainError::Store`] is a user-facing outcome;
/// none of them leaves a partial change behind.
#[derive(Debug, Error)]
pub enum DomainError {
    /// The address does not exist or belongs to someone else.
    #[error("Address not found")]
    AddressNotFound,

    /// The product does not exist or is not purchasable.
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    /// The category does not exist.
    #[error("Category not found: {0}")]
    CategoryNotFound(CategoryId),

    /// The product is not among the user's favorites.
    #[error("Favorite not found")]
    FavoriteNotFound,

    /// The order does not exist or belongs to someone else.
    #[error("Order not found")]
    OrderNotFound,

    /// The cart row does not exist or belongs to someone else.
    #[error("Cart item not found")]
    CartItemNotFound,

    /// More units were requested than the product has in stock.
    #[error("Insufficient stock for {product_name}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: ProductId,
        product_name: String,
        requested: u32,
        available: u32,
    },

    /// The order is not in a state the action can start from.
    #[error("Invalid state transition: cannot {action} from {current_state} state")]
    InvalidStateTransition {
        current_state: OrderStatus,
        action: &'static str,
    },

    /// The actor's role may never take this action.
    #[error("{actor} may not {action} orders")]
    NotPermitted {
        action: &'static str,
        actor: &'static str,
    },

    /// Malformed input.
    #[error("Validation error: {0}")]
    Validation(String),

    /// An error occurred in the store.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl DomainError {
    /// Returns true for the "absent or not owned" family of errors.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            DomainError::AddressNotFound
                | DomainError::ProductNotFound(_)
                | DomainError::CategoryNotFound(_)
                | DomainError::FavoriteNotFound
                | DomainError::OrderNotFound
                | DomainError::CartItemNotFound
        )
    }

    /// Returns a short stable label for logs and metrics.
    pub fn code(&self) -> &'static str {
        match self {
            DomainError::AddressNotFound => "address_not_found",
            DomainError::ProductNotFound(_) => "product_not_found",
            DomainError::CategoryNotFound(_) => "category_not_found",
            DomainError::FavoriteNotFound => "favorite_not_found",
            DomainError::OrderNotFound => "order_not_found",
            DomainError::CartItemNotFound => "cart_item_not_found",
            DomainError::InsufficientStock { .. } => "insufficient_stock",
            DomainError::InvalidStateTransition { .. } => "invalid_state_transition",
            DomainError::NotPermitted { .. } => "not_permitted",
            DomainError::Validation(_) => "validation",
            DomainError::Store(_) => "store",
        }
    }
}

/// Result type for domain operations.
pub type Result<T> = std::result::Result<T, DomainError>;
