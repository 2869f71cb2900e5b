//! HTTP handlers, grouped by resource.

pub mod addresses;
pub mod admin;
pub mod cart;
pub mod categories;
pub mod favorites;
pub mod health;
pub mod metrics;
pub mod orders;
pub mod products;

use std::str::FromStr;

use domain::{CartService, CatalogService, OrderService};
use store::Store;

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<S: Store> {
    pub orders: OrderService<S>,
    pub cart: CartService<S>,
    pub catalog: CatalogService<S>,
}

impl<S: Store + Clone> AppState<S> {
    /// Builds every service over one store.
    pub fn new(store: S) -> Self {
        Self {
            orders: OrderService::new(store.clone()),
            cart: CartService::new(store.clone()),
            catalog: CatalogService::new(store),
        }
    }
}

/// Fallback for unknown routes.
pub async fn not_found() -> ApiError {
    ApiError::NotFound("no such route".to_string())
}

/// Parses a path segment into one of the UUID id types.
pub(crate) fn parse_id<T>(kind: &str, id: &str) -> Result<T, ApiError>
where
    T: FromStr<Err = uuid::Error>,
{
    id.parse()
        .map_err(|e| ApiError::BadRequest(format!("Invalid {kind} id: {e}")))
}
